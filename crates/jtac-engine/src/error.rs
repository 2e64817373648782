//! Error types for the class engine

use std::fmt;

/// Result type for engine operations
pub type JtacResult<T> = Result<T, JtacError>;

/// Kinds of failures raised by the engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    /// A class is registered twice without replacement
    #[error("Class '{0}' is already defined")]
    DuplicateClass(String),

    /// An alias is registered twice without replacement
    #[error("Alias '{0}' is already defined")]
    DuplicateAlias(String),

    /// Lookup or creation against an unregistered name
    #[error("Class '{0}' is not defined. Class names are case sensitive")]
    ClassNotFound(String),

    /// `extend` references an unregistered class at definition time
    #[error("Class '{class}' extends unknown class '{referenced}'. Class names are case sensitive")]
    UnknownClass {
        /// Class being defined
        class: String,
        /// Name that could not be resolved
        referenced: String,
    },

    /// Factory creation of an abstract class
    #[error("Class '{0}' is abstract and cannot be created")]
    AbstractClass(String),

    /// A property rule rejected a value
    #[error("Property '{property}' cannot be set to {value}: expected {expected}")]
    InvalidPropertyValue {
        /// Property name
        property: String,
        /// Constraint description (type or allowed values)
        expected: String,
        /// Rendering of the rejected value
        value: String,
    },

    /// A property is neither declared nor reachable through an accessor
    #[error("Property '{0}' is not defined")]
    UnknownProperty(String),

    /// A declared property has no setter
    #[error("Property '{0}' has no setter")]
    ReadOnlyProperty(String),

    /// A method is not defined anywhere on the class chain
    #[error("Method '{0}' is not defined")]
    NoSuchMethod(String),

    /// `call_parent` found no ancestor implementation
    #[error("No ancestor of '{class}' defines '{method}'")]
    NoParentMethod {
        /// Class that declared the calling method
        class: String,
        /// Method name
        method: String,
    },

    /// `call_parent` used outside of any method call
    #[error("call_parent was used outside of a method call")]
    NoCaller,

    /// `call_parent` from a method the registry did not declare
    #[error("Method '{0}' was not declared through a class definition and has no parent")]
    NotRegistered(String),

    /// A required class is not registered
    #[error("Required class '{0}' is not defined. Class names are case sensitive")]
    MissingDependency(String),

    /// Creation without a class name or discriminator
    #[error("A class name or alias is required")]
    NameRequired,

    /// Malformed external input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Engine error: the failure kind plus the diagnostic context in effect
/// when it was raised.
#[derive(Debug, Clone, PartialEq)]
pub struct JtacError {
    kind: ErrorKind,
    class_name: Option<String>,
    trail: Vec<String>,
}

impl JtacError {
    /// Create an error, capturing the current context trail
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            class_name: None,
            trail: crate::context::trail(),
        }
    }

    /// Attach the full class name of the failing instance or class
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Failure kind
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Full class name of the failing instance, if known
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Context trail, outermost first
    pub fn trail(&self) -> &[String] {
        &self.trail
    }

    /// Consume the error and return its kind
    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for JtacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(class_name) = &self.class_name {
            write!(f, " [class {}]", class_name)?;
        }
        if !self.trail.is_empty() {
            write!(f, " (while: {})", self.trail.join(" > "))?;
        }
        Ok(())
    }
}

impl std::error::Error for JtacError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for JtacError {
    fn from(kind: ErrorKind) -> Self {
        JtacError::new(kind)
    }
}

/// Rejection returned by a property rule or check helper
#[derive(Debug, Clone, PartialEq)]
pub enum RuleViolation {
    /// The value does not satisfy the constraint described here
    Expected(String),
    /// Coercion itself failed (e.g. creating an instance from a class name)
    Failed(JtacError),
}

impl RuleViolation {
    /// Describe the expected constraint
    pub fn expected(description: impl Into<String>) -> Self {
        RuleViolation::Expected(description.into())
    }
}

impl From<JtacError> for RuleViolation {
    fn from(err: JtacError) -> Self {
        RuleViolation::Failed(err)
    }
}
