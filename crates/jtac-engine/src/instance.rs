//! Instances of registered classes
//!
//! An instance owns three private bags: `config` (current property values),
//! `internal` (state private to the class implementation) and `cache`
//! (derived values dropped by [`Instance::clear_cache`]). Generated getters
//! and setters read and write the config bag; setters run the property's
//! rule first and store nothing when the rule rejects the value.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::alias::Initializer;
use crate::class::{ClassDef, ClassMembers, Invocation, MethodBody, MethodEntry};
use crate::config::accessor_name;
use crate::context;
use crate::defaults::{CLASS_DISCRIMINATOR, CONSTRUCTOR_METHOD};
use crate::error::{ErrorKind, JtacResult};
use crate::value::{PropertyBag, Value};

/// Shared handle to an instance
pub type ObjectRef = Arc<Instance>;

/// Global counter for generating unique instance IDs
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

fn generate_instance_id() -> u64 {
    NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Method call in progress on an instance
struct Frame {
    owner: Option<Arc<ClassDef>>,
    method: String,
}

/// Method calls in progress on one instance, one stack per thread
type FrameStacks = FxHashMap<ThreadId, Vec<Frame>>;

/// Pops a frame when the call it tracks returns
struct FrameGuard<'a> {
    frames: &'a Mutex<FrameStacks>,
    thread: ThreadId,
    depth: usize,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        let mut frames = self.frames.lock();
        if self.depth == 0 {
            frames.remove(&self.thread);
        } else if let Some(stack) = frames.get_mut(&self.thread) {
            stack.truncate(self.depth);
        }
    }
}

/// Instance of a registered class
pub struct Instance {
    id: u64,
    class: Arc<ClassDef>,
    config: Mutex<PropertyBag>,
    internal: Mutex<PropertyBag>,
    cache: Mutex<PropertyBag>,
    // Back-references only; children are owned elsewhere.
    children: Mutex<Vec<Weak<Instance>>>,
    frames: Mutex<FrameStacks>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("class", &self.class.name())
            .field("config", &*self.config.lock())
            .finish()
    }
}

impl Instance {
    /// Allocate an instance without initializing it: the config bag stays
    /// empty and no constructor runs. Works for abstract classes.
    pub fn new_raw(class: Arc<ClassDef>) -> ObjectRef {
        Arc::new(Self {
            id: generate_instance_id(),
            class,
            config: Mutex::new(PropertyBag::new()),
            internal: Mutex::new(PropertyBag::new()),
            cache: Mutex::new(PropertyBag::new()),
            children: Mutex::new(Vec::new()),
            frames: Mutex::new(FxHashMap::default()),
        })
    }

    /// Unique instance ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Class descriptor
    pub fn class(&self) -> &Arc<ClassDef> {
        &self.class
    }

    /// Fully-qualified class name
    pub fn full_class_name(&self) -> &str {
        self.class.name()
    }

    /// Initialize a raw instance with one set of initial values
    pub fn init(self: &Arc<Self>, initial: &Initializer) -> JtacResult<()> {
        self.init_with(std::slice::from_ref(initial))
    }

    /// Initialize a raw instance: seed config defaults, pass every non-null
    /// default through its setter, run constructors, then apply each
    /// initializer in order.
    pub fn init_with(self: &Arc<Self>, initializers: &[Initializer]) -> JtacResult<()> {
        let _ctx = context::push_context(format!("init {}", self.class.name()));

        let defaults = self.class.config_schema();
        *self.config.lock() = defaults.clone();
        self.review_defaults(&defaults)?;

        let class = self.class.clone();
        self.run_constructor(&class)?;

        for initializer in initializers {
            initializer.apply(self)?;
        }
        Ok(())
    }

    fn review_defaults(self: &Arc<Self>, defaults: &PropertyBag) -> JtacResult<()> {
        for (name, value) in defaults.iter().filter(|(_, v)| !v.is_null()) {
            let setter = accessor_name("set", name);
            if let Some((declaring, entry)) = self.class.find_method(&setter) {
                self.run_method(&declaring, &entry, &setter, std::slice::from_ref(value))?;
            }
        }
        Ok(())
    }

    pub(crate) fn run_constructor(self: &Arc<Self>, class: &Arc<ClassDef>) -> JtacResult<()> {
        match class.constructor() {
            Some(ctor) => {
                let _frame = self.enter_frame(Some(class.clone()), CONSTRUCTOR_METHOD);
                let _ctx =
                    context::push_context(format!("{}.{}", class.name(), CONSTRUCTOR_METHOD));
                ctor(&Invocation::new(self, Some(class), CONSTRUCTOR_METHOD), &[]).map(|_| ())
            }
            None => match class.parent() {
                Some(parent) => self.run_constructor(parent),
                None => Ok(()),
            },
        }
    }

    pub(crate) fn run_method(
        self: &Arc<Self>,
        declaring: &Arc<ClassDef>,
        entry: &MethodEntry,
        name: &str,
        args: &[Value],
    ) -> JtacResult<Value> {
        match &entry.body {
            MethodBody::Getter(property) => Ok(self.read_config(property)),
            MethodBody::Setter(property) => {
                let value = args.first().cloned().unwrap_or_default();
                self.write_config(property, value).map(|_| Value::Null)
            }
            MethodBody::Native(f) => {
                let owner = entry.declared.then_some(declaring);
                let _frame = self.enter_frame(owner.cloned(), name);
                let _ctx = context::push_context(format!("{}.{}", declaring.name(), name));
                f(&Invocation::new(self, owner, name), args)
            }
        }
    }

    fn enter_frame(&self, owner: Option<Arc<ClassDef>>, method: &str) -> FrameGuard<'_> {
        let thread = thread::current().id();
        let mut frames = self.frames.lock();
        let stack = frames.entry(thread).or_default();
        let depth = stack.len();
        stack.push(Frame {
            owner,
            method: method.to_string(),
        });
        FrameGuard {
            frames: &self.frames,
            thread,
            depth,
        }
    }

    /// Call a method by name: declared methods, generated accessors and
    /// patched methods, nearest class first.
    pub fn invoke(self: &Arc<Self>, name: &str, args: &[Value]) -> JtacResult<Value> {
        let (declaring, entry) = self.class.find_method(name).ok_or_else(|| {
            context::error(
                ErrorKind::NoSuchMethod(name.to_string()),
                Some(self.full_class_name()),
            )
        })?;
        self.run_method(&declaring, &entry, name, args)
    }

    /// Delegate from the innermost method running on this instance, on the
    /// calling thread, to the same-named method of its declaring class's
    /// ancestor.
    pub fn call_parent(self: &Arc<Self>, args: &[Value]) -> JtacResult<Value> {
        let frame = self
            .frames
            .lock()
            .get(&thread::current().id())
            .and_then(|stack| stack.last())
            .map(|frame| (frame.owner.clone(), frame.method.clone()));
        let (owner, method) = frame.ok_or_else(|| {
            context::error(ErrorKind::NoCaller, Some(self.full_class_name()))
        })?;
        Invocation::new(self, owner.as_ref(), &method).call_parent(args)
    }

    /// Whether the instance's class is `name` or inherits from it
    pub fn instance_of(&self, name: &str) -> bool {
        self.class.inherits_from(self.class.local_name(name))
    }

    /// Read a property through its getter, or straight from the config bag
    /// when the class has no getter for it.
    pub fn get_property(self: &Arc<Self>, name: &str) -> JtacResult<Value> {
        let getter = accessor_name("get", name);
        if let Some((declaring, entry)) = self.class.find_method(&getter) {
            return self.run_method(&declaring, &entry, &getter, &[]);
        }
        if self.class.has_config(name) {
            return Ok(self.read_config(name));
        }
        Err(context::error(
            ErrorKind::UnknownProperty(name.to_string()),
            Some(self.full_class_name()),
        ))
    }

    /// Write a property through its setter
    pub fn set_property(self: &Arc<Self>, name: &str, value: impl Into<Value>) -> JtacResult<()> {
        let _ctx = context::push_context(format!("setProperty {}", name));
        let setter = accessor_name("set", name);
        if let Some((declaring, entry)) = self.class.find_method(&setter) {
            return self
                .run_method(&declaring, &entry, &setter, &[value.into()])
                .map(|_| ());
        }
        let kind = if self.class.has_config(name) {
            ErrorKind::ReadOnlyProperty(name.to_string())
        } else {
            ErrorKind::UnknownProperty(name.to_string())
        };
        Err(context::error(kind, Some(self.full_class_name())))
    }

    /// Write every property of `values` in order, skipping the class
    /// discriminator key.
    pub fn set_properties(self: &Arc<Self>, values: &PropertyBag) -> JtacResult<()> {
        for (name, value) in values.iter() {
            if name == CLASS_DISCRIMINATOR {
                continue;
            }
            self.set_property(name, value.clone())?;
        }
        Ok(())
    }

    fn read_config(&self, name: &str) -> Value {
        self.config.lock().get(name).cloned().unwrap_or_default()
    }

    fn write_config(&self, name: &str, value: Value) -> JtacResult<()> {
        let rule = self.class.rule(name).unwrap_or_default();
        let value = rule.check_value(self, name, value)?;
        self.config.lock().insert(name, value);
        if rule.clear_cache() {
            self.clear_cache();
        }
        Ok(())
    }

    /// Snapshot of the current config bag
    pub fn config_snapshot(&self) -> PropertyBag {
        self.config.lock().clone()
    }

    /// Patch members onto this instance's class. Methods added this way
    /// are not declared by any class definition, so they cannot use
    /// `call_parent`. New config properties are seeded into this instance
    /// with their defaults; other instances of the class are left as they
    /// are. A method named `constructor` is rejected.
    pub fn implement(self: &Arc<Self>, members: ClassMembers) -> JtacResult<()> {
        let _ctx = context::push_context(format!("implement {}", self.class.name()));
        if members.declares_constructor() {
            return Err(context::input_error(
                ErrorKind::InvalidArgument(format!(
                    "'{}' cannot be patched onto an existing class",
                    CONSTRUCTOR_METHOD
                )),
                Some(self.full_class_name()),
            ));
        }

        let ClassMembers {
            config,
            rules,
            methods,
        } = members;
        self.class.patch_methods(methods);
        if config.is_empty() && rules.is_empty() {
            return Ok(());
        }
        self.class.add_members(ClassMembers {
            config: config.clone(),
            rules,
            methods: Vec::new(),
        });

        let seeded: PropertyBag = {
            let mut own = self.config.lock();
            let fresh: PropertyBag = config
                .iter()
                .filter(|(name, _)| !own.contains(name))
                .map(|(name, value)| (name, value.clone()))
                .collect();
            own.extend_from(&fresh);
            fresh
        };
        self.review_defaults(&seeded)
    }

    /// Register an instance whose cache is cleared together with this one.
    ///
    /// Registering a cycle of children is a caller error: clearing would
    /// not terminate.
    pub fn register_child(&self, child: &ObjectRef) {
        self.children.lock().push(Arc::downgrade(child));
    }

    /// Empty the cache bag of this instance and, depth-first, of every
    /// registered child still alive.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
        let children: Vec<ObjectRef> = {
            let mut children = self.children.lock();
            children.retain(|child| child.strong_count() > 0);
            children.iter().filter_map(Weak::upgrade).collect()
        };
        for child in children {
            child.clear_cache();
        }
    }

    /// Read a cached value
    pub fn cached(&self, key: &str) -> Option<Value> {
        self.cache.lock().get(key).cloned()
    }

    /// Store a cached value
    pub fn set_cached(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.cache.lock().insert(key, value);
    }

    /// Read an internal-state value
    pub fn internal(&self, key: &str) -> Option<Value> {
        self.internal.lock().get(key).cloned()
    }

    /// Store an internal-state value
    pub fn set_internal(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.internal.lock().insert(key, value);
    }
}
