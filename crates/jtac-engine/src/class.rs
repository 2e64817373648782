//! Class descriptors and builders
//!
//! A [`ClassDef`] is produced once by the registry from a [`ClassBuilder`].
//! Its name, parent link, abstract flag, constructor and required classes
//! never change. The member tables (own config defaults, own rules, own
//! methods) change only through `ClassRegistry::add_members` and
//! `Instance::implement`.
//!
//! Lookups walk the parent chain: methods and rules leaf-to-root (nearest
//! declaration wins), the config schema root-to-leaf (subclass defaults
//! overlay inherited ones). Changes made to a parent after the fact are
//! therefore visible to every subclass.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::config::{accessor_name, BuiltinRule, ConfigRule};
use crate::context::{self, ContextGuard};
use crate::defaults::{CONSTRUCTOR_METHOD, NAMESPACE_PREFIX};
use crate::error::{ErrorKind, JtacResult};
use crate::instance::ObjectRef;
use crate::value::{PropertyBag, Value};

/// Method implementation: receives the invocation context and arguments
pub type MethodFn = Arc<dyn Fn(&Invocation<'_>, &[Value]) -> JtacResult<Value> + Send + Sync>;

/// Body of a method table entry
#[derive(Clone)]
pub enum MethodBody {
    /// User-supplied implementation
    Native(MethodFn),
    /// Generated getter for the named property
    Getter(String),
    /// Generated setter for the named property
    Setter(String),
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::Native(_) => write!(f, "Native"),
            MethodBody::Getter(p) => write!(f, "Getter({})", p),
            MethodBody::Setter(p) => write!(f, "Setter({})", p),
        }
    }
}

/// Method table entry
#[derive(Debug, Clone)]
pub struct MethodEntry {
    /// Implementation
    pub body: MethodBody,
    /// Declared through a class definition (as opposed to patched onto the
    /// class through `Instance::implement`). Only declared methods can
    /// delegate to their parent.
    pub declared: bool,
}

/// Members declared by a class or added to it later
#[derive(Clone, Default)]
pub struct ClassMembers {
    pub(crate) config: PropertyBag,
    pub(crate) rules: Vec<(String, ConfigRule)>,
    pub(crate) methods: Vec<(String, MethodFn)>,
}

impl ClassMembers {
    /// Create an empty member set
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a config property with its default value
    pub fn config(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.config.insert(name, default);
        self
    }

    /// Attach a rule to a config property
    pub fn config_rule(mut self, name: impl Into<String>, rule: ConfigRule) -> Self {
        self.rules.push((name.into(), rule));
        self
    }

    /// Add a method
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[Value]) -> JtacResult<Value> + Send + Sync + 'static,
    {
        self.methods.push((name.into(), Arc::new(f)));
        self
    }

    /// Whether a method named `constructor` is among the members
    pub(crate) fn declares_constructor(&self) -> bool {
        self.methods.iter().any(|(name, _)| name == CONSTRUCTOR_METHOD)
    }
}

/// Builder for a class definition.
///
/// The reserved parts of a definition (parent, constructor, config, rules,
/// abstract flag, required classes) each have their own method; everything
/// added through [`ClassBuilder::method`] becomes a method, except one named
/// `constructor`, which becomes the constructor.
pub struct ClassBuilder {
    pub(crate) name: String,
    pub(crate) strip_namespace_prefix: bool,
    pub(crate) extend: Option<String>,
    pub(crate) is_abstract: bool,
    pub(crate) constructor: Option<MethodFn>,
    pub(crate) requires: Vec<String>,
    pub(crate) members: ClassMembers,
}

impl ClassBuilder {
    /// Start a definition for the fully-qualified class `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strip_namespace_prefix: true,
            extend: None,
            is_abstract: false,
            constructor: None,
            requires: Vec::new(),
            members: ClassMembers::new(),
        }
    }

    /// Inherit from an already registered class
    pub fn extend(mut self, parent: impl Into<String>) -> Self {
        self.extend = Some(parent.into());
        self
    }

    /// Mark the class abstract
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Set the constructor. It runs once per instance after defaults are
    /// reviewed; call `inv.call_parent(&[])` first to run ancestor
    /// constructors root-to-leaf.
    pub fn constructor<F>(mut self, f: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[Value]) -> JtacResult<Value> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(f));
        self
    }

    /// Require another class to be registered before this one
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.requires.push(name.into());
        self
    }

    /// Declare a config property with its default value
    pub fn config(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.members = self.members.config(name, default);
        self
    }

    /// Attach a rule to a config property
    pub fn config_rule(mut self, name: impl Into<String>, rule: ConfigRule) -> Self {
        self.members = self.members.config_rule(name, rule);
        self
    }

    /// Add a method. A method named `constructor` replaces the constructor.
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[Value]) -> JtacResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        if name == CONSTRUCTOR_METHOD {
            return self.constructor(f);
        }
        self.members = self.members.method(name, f);
        self
    }

    /// Class name being defined
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Default)]
struct Members {
    config: PropertyBag,
    rules: FxHashMap<String, ConfigRule>,
    methods: FxHashMap<String, MethodEntry>,
}

/// Registered class descriptor
pub struct ClassDef {
    name: String,
    strip_namespace_prefix: bool,
    parent: Option<Arc<ClassDef>>,
    is_abstract: bool,
    constructor: Option<MethodFn>,
    requires: Vec<String>,
    members: RwLock<Members>,
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("is_abstract", &self.is_abstract)
            .finish()
    }
}

impl ClassDef {
    /// Build a descriptor from a builder and its resolved parent
    pub(crate) fn from_builder(builder: ClassBuilder, parent: Option<Arc<ClassDef>>) -> Arc<Self> {
        let class = Arc::new(Self {
            name: builder.name,
            strip_namespace_prefix: builder.strip_namespace_prefix,
            parent,
            is_abstract: builder.is_abstract,
            constructor: builder.constructor,
            requires: builder.requires,
            members: RwLock::new(Members::default()),
        });
        class.add_members(builder.members);
        class
    }

    /// Fully-qualified class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `name` without the namespace prefix, when the registry that defined
    /// this class strips it
    pub(crate) fn local_name<'a>(&self, name: &'a str) -> &'a str {
        if self.strip_namespace_prefix {
            name.strip_prefix(NAMESPACE_PREFIX).unwrap_or(name)
        } else {
            name
        }
    }

    /// Parent class
    pub fn parent(&self) -> Option<&Arc<ClassDef>> {
        self.parent.as_ref()
    }

    /// Whether the class is abstract
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Explicit constructor, if one was supplied
    pub fn constructor(&self) -> Option<&MethodFn> {
        self.constructor.as_ref()
    }

    /// Classes required at definition time
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// This class followed by its ancestors, leaf to root
    pub fn ancestry(&self) -> impl Iterator<Item = &ClassDef> {
        std::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    /// Whether this class is `name` or inherits from it
    pub fn inherits_from(&self, name: &str) -> bool {
        self.ancestry().any(|class| class.name == name)
    }

    /// Merged config schema: every inherited property with the nearest
    /// default, in declaration order from the root down.
    pub fn config_schema(&self) -> PropertyBag {
        let chain: Vec<&ClassDef> = self.ancestry().collect();
        let mut schema = PropertyBag::new();
        for class in chain.into_iter().rev() {
            schema.extend_from(&class.members.read().config);
        }
        schema
    }

    /// Whether a config property is declared on this class or an ancestor
    pub fn has_config(&self, name: &str) -> bool {
        self.ancestry().any(|class| class.members.read().config.contains(name))
    }

    /// Nearest rule for a config property
    pub fn rule(&self, name: &str) -> Option<ConfigRule> {
        self.ancestry()
            .find_map(|class| class.members.read().rules.get(name).cloned())
    }

    /// Nearest method table entry for `name`
    pub fn method(&self, name: &str) -> Option<MethodEntry> {
        self.ancestry()
            .find_map(|class| class.members.read().methods.get(name).cloned())
    }

    /// Nearest method table entry for `name` together with the class that
    /// holds it
    pub fn find_method(self: &Arc<Self>, name: &str) -> Option<(Arc<ClassDef>, MethodEntry)> {
        let mut current = Some(self.clone());
        while let Some(class) = current {
            let entry = class.members.read().methods.get(name).cloned();
            if let Some(entry) = entry {
                return Some((class, entry));
            }
            current = class.parent.clone();
        }
        None
    }

    /// Names of the methods declared directly on this class
    pub fn own_method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.members.read().methods.keys().cloned().collect();
        names.sort();
        names
    }

    /// Merge members into this class: rules and defaults are added or
    /// replaced, built-in rules are chosen for new properties that have
    /// none, methods are added or replaced, and accessors are generated for
    /// the properties named in `members`.
    pub(crate) fn add_members(&self, members: ClassMembers) {
        let ClassMembers {
            config,
            rules,
            methods,
        } = members;

        {
            let mut own = self.members.write();
            for (name, rule) in rules {
                own.rules.insert(name, rule);
            }
            for (name, f) in methods {
                own.methods.insert(
                    name,
                    MethodEntry {
                        body: MethodBody::Native(f),
                        declared: true,
                    },
                );
            }
            for (name, default) in config.iter() {
                own.config.insert(name, default.clone());
            }
        }

        for (name, default) in config.iter() {
            if self.rule(name).is_none() {
                if let Some(builtin) = BuiltinRule::for_default(default) {
                    self.members
                        .write()
                        .rules
                        .insert(name.to_string(), ConfigRule::builtin(builtin));
                }
            }
            self.synthesize_accessors(name);
        }
    }

    /// Patch methods onto the class without declaring them
    pub(crate) fn patch_methods(&self, methods: Vec<(String, MethodFn)>) {
        let mut own = self.members.write();
        for (name, f) in methods {
            own.methods.insert(
                name,
                MethodEntry {
                    body: MethodBody::Native(f),
                    declared: false,
                },
            );
        }
    }

    fn synthesize_accessors(&self, property: &str) {
        let rule = self.rule(property).unwrap_or_default();
        let getter = accessor_name("get", property);
        let setter = accessor_name("set", property);

        let generate_getter = rule.auto_get() && self.method(&getter).is_none();
        let generate_setter = rule.auto_set() && self.method(&setter).is_none();

        let mut own = self.members.write();
        if generate_getter {
            own.methods.insert(
                getter,
                MethodEntry {
                    body: MethodBody::Getter(property.to_string()),
                    declared: true,
                },
            );
        }
        if generate_setter {
            own.methods.insert(
                setter,
                MethodEntry {
                    body: MethodBody::Setter(property.to_string()),
                    declared: true,
                },
            );
        }
    }
}

/// Context handed to every method and constructor call
pub struct Invocation<'a> {
    this: &'a ObjectRef,
    owner: Option<&'a Arc<ClassDef>>,
    method: &'a str,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        this: &'a ObjectRef,
        owner: Option<&'a Arc<ClassDef>>,
        method: &'a str,
    ) -> Self {
        Self { this, owner, method }
    }

    /// Instance the method runs on
    pub fn this(&self) -> &ObjectRef {
        self.this
    }

    /// Class that declared the running method; `None` for patched methods
    pub fn owner(&self) -> Option<&Arc<ClassDef>> {
        self.owner
    }

    /// Name of the running method
    pub fn method(&self) -> &str {
        self.method
    }

    /// Run the same-named method of the nearest ancestor of the declaring
    /// class, on the same instance.
    pub fn call_parent(&self, args: &[Value]) -> JtacResult<Value> {
        let class_name = self.this.full_class_name();
        let owner = self.owner.ok_or_else(|| {
            context::error(
                ErrorKind::NotRegistered(self.method.to_string()),
                Some(class_name),
            )
        })?;
        let no_parent = || {
            context::error(
                ErrorKind::NoParentMethod {
                    class: owner.name().to_string(),
                    method: self.method.to_string(),
                },
                Some(class_name),
            )
        };
        let parent = owner.parent().ok_or_else(no_parent)?;

        if self.method == CONSTRUCTOR_METHOD {
            return self.this.run_constructor(parent).map(|_| Value::Null);
        }

        let (declaring, entry) = parent.find_method(self.method).ok_or_else(no_parent)?;
        self.this.run_method(&declaring, &entry, self.method, args)
    }

    /// Push a context label naming the running method
    pub fn push_context(&self) -> ContextGuard {
        let owner = self
            .owner
            .map(|class| class.name())
            .unwrap_or_else(|| self.this.full_class_name());
        context::push_context(format!("{}.{}", owner, self.method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleCheck;

    fn base() -> Arc<ClassDef> {
        ClassDef::from_builder(
            ClassBuilder::new("Shapes.Base")
                .abstract_class()
                .config("color", "black")
                .config("visible", true),
            None,
        )
    }

    #[test]
    fn test_accessors_generated_for_config() {
        let class = base();
        assert!(matches!(
            class.method("getColor").map(|e| e.body),
            Some(MethodBody::Getter(p)) if p == "color"
        ));
        assert!(matches!(
            class.method("setVisible").map(|e| e.body),
            Some(MethodBody::Setter(p)) if p == "visible"
        ));
    }

    #[test]
    fn test_builtin_rule_synthesized_from_default() {
        let class = base();
        assert!(matches!(
            class.rule("color").and_then(|r| r.check().cloned()),
            Some(RuleCheck::Builtin(BuiltinRule::Str))
        ));
    }

    #[test]
    fn test_schema_merges_down_the_chain() {
        let parent = base();
        let child = ClassDef::from_builder(
            ClassBuilder::new("Shapes.Circle")
                .extend("Shapes.Base")
                .config("radius", 0)
                .config("color", "red"),
            Some(parent),
        );

        let schema = child.config_schema();
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["color", "visible", "radius"]);
        assert_eq!(schema.get("color"), Some(&Value::from("red")));
        assert!(child.has_config("visible"));
        assert!(child.inherits_from("Shapes.Base"));
        assert!(!child.inherits_from("Shapes.Square"));
    }

    #[test]
    fn test_explicit_accessor_not_replaced() {
        let class = ClassDef::from_builder(
            ClassBuilder::new("Custom")
                .config("label", "")
                .method("getLabel", |_inv, _args| Ok(Value::from("fixed"))),
            None,
        );
        assert!(matches!(
            class.method("getLabel").map(|e| e.body),
            Some(MethodBody::Native(_))
        ));
    }

    #[test]
    fn test_rule_flags_suppress_accessors() {
        let class = ClassDef::from_builder(
            ClassBuilder::new("Flags")
                .config("hidden", 0)
                .config_rule("hidden", ConfigRule::new().no_auto_get().no_auto_set()),
            None,
        );
        assert!(class.method("getHidden").is_none());
        assert!(class.method("setHidden").is_none());
        assert!(class.rule("hidden").is_some());
    }

    #[test]
    fn test_add_members_visible_to_subclass() {
        let parent = base();
        let child = ClassDef::from_builder(
            ClassBuilder::new("Shapes.Square").extend("Shapes.Base"),
            Some(parent.clone()),
        );

        parent.add_members(ClassMembers::new().config("border", 1));
        assert!(child.has_config("border"));
        assert!(child.method("getBorder").is_some());
        assert_eq!(child.config_schema().get("border"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_method_named_constructor_becomes_constructor() {
        let class = ClassDef::from_builder(
            ClassBuilder::new("Ctor").method("constructor", |_inv, _args| Ok(Value::Null)),
            None,
        );
        assert!(class.constructor().is_some());
        assert!(class.method("constructor").is_none());
    }

    #[test]
    fn test_local_name_follows_prefix_flag() {
        let mut builder = ClassBuilder::new("Plain");
        builder.strip_namespace_prefix = false;
        let plain = ClassDef::from_builder(builder, None);
        assert_eq!(plain.local_name("jTAC.Plain"), "jTAC.Plain");
        assert_eq!(base().local_name("jTAC.Shapes.Base"), "Shapes.Base");
    }
}
