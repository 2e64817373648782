//! Class registry for defining, looking up and creating classes by name
//!
//! The registry is a cheap-to-clone handle to shared tables guarded by
//! read/write locks, so one registry can be shared by every collaborator of
//! a host application. [`registry()`] returns the process-wide default.
//!
//! Registration is all-or-nothing: a class or alias becomes visible to
//! lookups only after every check of its definition has passed.

use std::sync::{Arc, LazyLock, Weak};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::alias::{AliasEntry, AliasOptions, Initializer};
use crate::class::{ClassBuilder, ClassDef, ClassMembers};
use crate::context;
use crate::defaults::{
    RegistryOptions, CLASS_DISCRIMINATOR, CONSTRUCTOR_METHOD, MAX_ALIAS_DEPTH, NAMESPACE_PREFIX,
};
use crate::error::{ErrorKind, JtacResult};
use crate::instance::{Instance, ObjectRef};
use crate::value::{PropertyBag, Value};

static DEFAULT_REGISTRY: LazyLock<ClassRegistry> =
    LazyLock::new(|| ClassRegistry::with_options(RegistryOptions::from_env()));

/// Process-wide default registry
pub fn registry() -> &'static ClassRegistry {
    &DEFAULT_REGISTRY
}

/// Registered class plus an uninitialized sample instance usable for
/// introspection without running any constructor.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    /// Class descriptor
    pub class: Arc<ClassDef>,
    /// Raw, never-initialized instance of the class
    pub sample: ObjectRef,
}

#[derive(Debug)]
struct RegistryState {
    options: RegistryOptions,
    classes: RwLock<FxHashMap<String, ClassDefinition>>,
    aliases: RwLock<FxHashMap<String, AliasEntry>>,
}

/// Weak handle held by rules that create instances through a registry
#[derive(Debug, Clone)]
pub(crate) struct WeakRegistry(Weak<RegistryState>);

impl WeakRegistry {
    pub(crate) fn upgrade(&self) -> Option<ClassRegistry> {
        self.0.upgrade().map(|inner| ClassRegistry { inner })
    }
}

/// Class and alias registry
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    inner: Arc<RegistryState>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// Create an empty registry with default options
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    /// Create an empty registry. `log_errors: false` switches the global
    /// logging choke point off.
    pub fn with_options(options: RegistryOptions) -> Self {
        if !options.log_errors {
            context::set_logging_enabled(false);
        }
        Self {
            inner: Arc::new(RegistryState {
                options,
                classes: RwLock::new(FxHashMap::default()),
                aliases: RwLock::new(FxHashMap::default()),
            }),
        }
    }

    /// Options the registry was created with
    pub fn options(&self) -> RegistryOptions {
        self.inner.options
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry(Arc::downgrade(&self.inner))
    }

    fn normalize<'a>(&self, name: &'a str) -> &'a str {
        if self.inner.options.strip_namespace_prefix {
            name.strip_prefix(NAMESPACE_PREFIX).unwrap_or(name)
        } else {
            name
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a new class. Fails if the name is taken.
    pub fn define(&self, builder: ClassBuilder) -> JtacResult<Arc<ClassDef>> {
        self.define_class(builder, false)
    }

    /// Register a class, replacing any existing class of the same name.
    /// Existing subclasses keep their link to the replaced definition.
    pub fn redefine(&self, builder: ClassBuilder) -> JtacResult<Arc<ClassDef>> {
        self.define_class(builder, true)
    }

    fn define_class(&self, mut builder: ClassBuilder, replace: bool) -> JtacResult<Arc<ClassDef>> {
        let _ctx = context::push_context(format!("define {}", builder.name()));

        if builder.name().trim().is_empty() {
            return Err(context::input_error(
                ErrorKind::InvalidArgument("class name must not be empty".to_string()),
                None,
            ));
        }
        let name = self.normalize(builder.name()).to_string();
        if !replace && self.is_defined(&name) {
            return Err(context::error(ErrorKind::DuplicateClass(name.clone()), Some(&name)));
        }

        self.require(&builder.requires)?;

        let parent = match &builder.extend {
            Some(parent_name) => Some(self.find_class(parent_name).ok_or_else(|| {
                context::error(
                    ErrorKind::UnknownClass {
                        class: name.clone(),
                        referenced: parent_name.clone(),
                    },
                    Some(&name),
                )
            })?),
            None => None,
        };

        builder.name = name.clone();
        builder.strip_namespace_prefix = self.inner.options.strip_namespace_prefix;
        let class = ClassDef::from_builder(builder, parent);
        let sample = Instance::new_raw(class.clone());

        let replaced = {
            let mut classes = self.inner.classes.write();
            if !replace && classes.contains_key(&name) {
                return Err(context::error(ErrorKind::DuplicateClass(name.clone()), Some(&name)));
            }
            classes
                .insert(
                    name.clone(),
                    ClassDefinition {
                        class: class.clone(),
                        sample,
                    },
                )
                .is_some()
        };

        if replaced {
            let message = format!(
                "class '{}' replaced; existing subclasses keep the previous definition",
                name
            );
            context::warn(&message, Some(&name));
        }
        tracing::debug!(target: "jtac", class = %name, replace, "class defined");
        Ok(class)
    }

    /// Add or replace members of a registered class in place
    pub fn add_members(&self, name: &str, members: ClassMembers) -> JtacResult<()> {
        let _ctx = context::push_context(format!("addMembers {}", name));
        let class = self.class(name)?;
        if members.declares_constructor() {
            return Err(context::input_error(
                ErrorKind::InvalidArgument(format!(
                    "'{}' cannot be added to an existing class",
                    CONSTRUCTOR_METHOD
                )),
                Some(class.name()),
            ));
        }
        class.add_members(members);
        Ok(())
    }

    /// Register an alias for a class or another alias
    pub fn define_alias(
        &self,
        alias: &str,
        target: &str,
        initial: impl Into<Initializer>,
    ) -> JtacResult<()> {
        self.define_alias_with(alias, target, initial, AliasOptions::default())
    }

    /// Register an alias with explicit replace/optional flags
    pub fn define_alias_with(
        &self,
        alias: &str,
        target: &str,
        initial: impl Into<Initializer>,
        options: AliasOptions,
    ) -> JtacResult<()> {
        let _ctx = context::push_context(format!("defineAlias {}", alias));

        if alias.trim().is_empty() {
            return Err(context::input_error(
                ErrorKind::InvalidArgument("alias name must not be empty".to_string()),
                None,
            ));
        }
        if !options.replace && self.is_alias_defined(alias) {
            return Err(context::error(ErrorKind::DuplicateAlias(alias.to_string()), None));
        }

        let target = self.normalize(target).to_string();
        let class_name = match self.resolve(&target)? {
            Some((class_name, _)) => class_name,
            None if options.optional => {
                tracing::debug!(target: "jtac", alias, %target, "optional alias skipped");
                return Ok(());
            }
            None => {
                return Err(context::error(ErrorKind::ClassNotFound(target), None));
            }
        };
        let class = self.class(&class_name)?;
        if class.is_abstract() {
            return Err(context::error(
                ErrorKind::AbstractClass(class_name.clone()),
                Some(&class_name),
            ));
        }

        {
            let mut aliases = self.inner.aliases.write();
            if !options.replace && aliases.contains_key(alias) {
                return Err(context::error(ErrorKind::DuplicateAlias(alias.to_string()), None));
            }
            aliases.insert(
                alias.to_string(),
                AliasEntry {
                    target: target.clone(),
                    initial: initial.into(),
                },
            );
        }

        tracing::debug!(target: "jtac", alias, %target, "alias defined");
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Whether a class is registered under `name` (aliases do not count)
    pub fn is_defined(&self, name: &str) -> bool {
        self.inner.classes.read().contains_key(self.normalize(name))
    }

    /// Whether an alias is registered under `name`
    pub fn is_alias_defined(&self, name: &str) -> bool {
        self.inner.aliases.read().contains_key(name)
    }

    /// Look up a class, failing if it is not registered
    pub fn class(&self, name: &str) -> JtacResult<Arc<ClassDef>> {
        self.find_class(name)
            .ok_or_else(|| context::error(ErrorKind::ClassNotFound(name.to_string()), None))
    }

    /// Look up a class
    pub fn find_class(&self, name: &str) -> Option<Arc<ClassDef>> {
        self.inner
            .classes
            .read()
            .get(self.normalize(name))
            .map(|def| def.class.clone())
    }

    /// Look up a class together with its sample instance
    pub fn get_definition(&self, name: &str) -> Option<ClassDefinition> {
        self.inner.classes.read().get(self.normalize(name)).cloned()
    }

    /// Whether class `name` is `ancestor` or inherits from it. False when
    /// `name` is not registered.
    pub fn inherits_from(&self, name: &str, ancestor: &str) -> bool {
        self.find_class(name)
            .is_some_and(|class| class.inherits_from(self.normalize(ancestor)))
    }

    /// Registered class names, sorted
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.classes.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Registered alias names, sorted
    pub fn alias_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.aliases.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Fail unless every named class is registered; the error names the
    /// first missing one.
    pub fn require<I, S>(&self, names: I) -> JtacResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if !self.is_defined(name) {
                return Err(context::error(
                    ErrorKind::MissingDependency(name.to_string()),
                    None,
                ));
            }
        }
        Ok(())
    }

    /// Resolve an alias or class name to a class name plus the alias
    /// initializers to apply, innermost alias first. `None` when the name
    /// is neither.
    fn resolve(&self, name: &str) -> JtacResult<Option<(String, Vec<Initializer>)>> {
        let aliases = self.inner.aliases.read();
        let mut initializers = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = name.to_string();

        while let Some(entry) = aliases.get(&current) {
            if !seen.insert(current.clone()) || seen.len() > MAX_ALIAS_DEPTH {
                return Err(context::error(
                    ErrorKind::InvalidArgument(format!(
                        "alias '{}' does not resolve to a class",
                        name
                    )),
                    None,
                ));
            }
            initializers.push(entry.initial.clone());
            current = self.normalize(&entry.target).to_string();
        }
        drop(aliases);

        let current = self.normalize(&current).to_string();
        if !self.is_defined(&current) {
            return Ok(None);
        }
        initializers.reverse();
        Ok(Some((current, initializers)))
    }

    // ========================================================================
    // Instantiation
    // ========================================================================

    /// Allocate an instance without initializing it (abstract classes
    /// allowed): no config is populated and no constructor runs.
    pub fn instantiate_raw(&self, name: &str) -> JtacResult<ObjectRef> {
        Ok(Instance::new_raw(self.class(name)?))
    }

    /// Create an instance of a class by its name (aliases are not consulted)
    pub fn create_by_class_name(
        &self,
        name: &str,
        initial: impl Into<Initializer>,
    ) -> JtacResult<ObjectRef> {
        let _ctx = context::push_context(format!("create {}", name));
        self.instantiate(name, &[initial.into()])
    }

    /// Like [`ClassRegistry::create_by_class_name`], returning `None` when
    /// the class is not registered.
    pub fn create_by_class_name_optional(
        &self,
        name: &str,
        initial: impl Into<Initializer>,
    ) -> JtacResult<Option<ObjectRef>> {
        if !self.is_defined(name) {
            return Ok(None);
        }
        self.create_by_class_name(name, initial).map(Some)
    }

    /// Create an instance by alias or class name. Alias values are applied
    /// first, then `values`. An empty name falls back to the `jtacClass`
    /// entry of `values`.
    pub fn create(&self, name: &str, values: impl Into<Initializer>) -> JtacResult<ObjectRef> {
        let values = values.into();
        let _ctx = context::push_context(format!("create {}", name));
        match self.create_resolved(name, values)? {
            Some(obj) => Ok(obj),
            None => Err(context::error(ErrorKind::ClassNotFound(name.to_string()), None)),
        }
    }

    /// Like [`ClassRegistry::create`], returning `None` when the name does
    /// not resolve.
    pub fn create_optional(
        &self,
        name: &str,
        values: impl Into<Initializer>,
    ) -> JtacResult<Option<ObjectRef>> {
        let _ctx = context::push_context(format!("create {}", name));
        self.create_resolved(name, values.into())
    }

    /// Create an instance named by the `jtacClass` entry of `values`
    pub fn create_from_values(&self, values: PropertyBag) -> JtacResult<ObjectRef> {
        self.create("", values)
    }

    /// Create an instance from a JSON object carrying `jtacClass`
    pub fn create_from_json(&self, json: serde_json::Value) -> JtacResult<ObjectRef> {
        let values = PropertyBag::from_json(json).ok_or_else(|| {
            context::input_error(
                ErrorKind::InvalidArgument("expected a JSON object".to_string()),
                None,
            )
        })?;
        self.create_from_values(values)
    }

    fn create_resolved(&self, name: &str, values: Initializer) -> JtacResult<Option<ObjectRef>> {
        let name = if name.is_empty() {
            match &values {
                Initializer::Values(bag) => match bag.get(CLASS_DISCRIMINATOR) {
                    Some(Value::Str(class_name)) if !class_name.is_empty() => class_name.clone(),
                    _ => return Err(context::error(ErrorKind::NameRequired, None)),
                },
                _ => return Err(context::error(ErrorKind::NameRequired, None)),
            }
        } else {
            self.normalize(name).to_string()
        };

        let Some((class_name, mut initializers)) = self.resolve(&name)? else {
            return Ok(None);
        };
        initializers.push(values);
        self.instantiate(&class_name, &initializers).map(Some)
    }

    fn instantiate(&self, name: &str, initializers: &[Initializer]) -> JtacResult<ObjectRef> {
        let class = self.class(name)?;
        if class.is_abstract() {
            return Err(context::error(
                ErrorKind::AbstractClass(class.name().to_string()),
                Some(class.name()),
            ));
        }
        let obj = Instance::new_raw(class);
        obj.init_with(initializers)?;
        Ok(obj)
    }
}
