//! Aliases and initial values
//!
//! An alias maps a short name to a class (or another alias) plus a preset
//! [`Initializer`] applied when an instance is created through it.

use std::fmt;
use std::sync::Arc;

use crate::error::JtacResult;
use crate::instance::ObjectRef;
use crate::value::PropertyBag;

/// Initializer callback: receives the new instance and its class name
pub type InitFn = Arc<dyn Fn(&ObjectRef, &str) -> JtacResult<()> + Send + Sync>;

/// Initial values applied to a freshly constructed instance
#[derive(Clone, Default)]
pub enum Initializer {
    /// Nothing to apply
    #[default]
    Empty,
    /// Property values applied through their setters
    Values(PropertyBag),
    /// Callback run for its side effects
    Func(InitFn),
}

impl Initializer {
    /// Wrap a callback
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&ObjectRef, &str) -> JtacResult<()> + Send + Sync + 'static,
    {
        Initializer::Func(Arc::new(f))
    }

    /// Whether there is nothing to apply
    pub fn is_empty(&self) -> bool {
        match self {
            Initializer::Empty => true,
            Initializer::Values(bag) => bag.is_empty(),
            Initializer::Func(_) => false,
        }
    }

    pub(crate) fn apply(&self, obj: &ObjectRef) -> JtacResult<()> {
        match self {
            Initializer::Empty => Ok(()),
            Initializer::Values(bag) => obj.set_properties(bag),
            Initializer::Func(f) => f(obj, obj.full_class_name()),
        }
    }
}

impl fmt::Debug for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Initializer::Empty => write!(f, "Empty"),
            Initializer::Values(bag) => f.debug_tuple("Values").field(bag).finish(),
            Initializer::Func(_) => write!(f, "Func"),
        }
    }
}

impl From<PropertyBag> for Initializer {
    fn from(bag: PropertyBag) -> Self {
        Initializer::Values(bag)
    }
}

impl From<Option<PropertyBag>> for Initializer {
    fn from(bag: Option<PropertyBag>) -> Self {
        bag.map_or(Initializer::Empty, Initializer::Values)
    }
}

impl From<()> for Initializer {
    fn from(_: ()) -> Self {
        Initializer::Empty
    }
}

/// Registered alias
#[derive(Debug, Clone)]
pub struct AliasEntry {
    /// Target class or alias name
    pub target: String,
    /// Values applied before the caller's own
    pub initial: Initializer,
}

/// Flags for alias registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AliasOptions {
    /// Replace an existing alias of the same name
    pub replace: bool,
    /// Skip registration silently when the target is not defined
    pub optional: bool,
}

impl AliasOptions {
    /// Options with `replace` set
    pub fn replacing() -> Self {
        Self {
            replace: true,
            ..Self::default()
        }
    }

    /// Options with `optional` set
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Self::default()
        }
    }
}
