//! Config property rules
//!
//! A [`ConfigRule`] decides how a property's setter validates or coerces
//! candidate values and whether getters/setters are generated for it. When
//! a class declares a property without a rule, a [`BuiltinRule`] is chosen
//! from the type of its default value.

use std::fmt;
use std::sync::Arc;

use crate::coerce;
use crate::context;
use crate::defaults::CLASS_DISCRIMINATOR;
use crate::error::{ErrorKind, JtacResult, RuleViolation};
use crate::instance::Instance;
use crate::registry::{ClassRegistry, WeakRegistry};
use crate::value::Value;

/// Custom validator: receives the instance being updated and the candidate
/// value, returns the value to store.
pub type ValidatorFn = Arc<dyn Fn(&Instance, Value) -> Result<Value, RuleViolation> + Send + Sync>;

/// Built-in coercion rule chosen from a default value's type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinRule {
    /// Strict boolean (also `"true"`/`"false"`, `1`/`0`)
    Bool,
    /// Integer only
    Int,
    /// Any finite number
    Number,
    /// Any string, numbers converted
    Str,
    /// Array instance
    Array,
    /// Regular expression, strings compiled
    Regex,
}

impl BuiltinRule {
    /// Rule implied by a default value, if its type has one
    pub fn for_default(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) => Some(BuiltinRule::Bool),
            Value::Int(_) => Some(BuiltinRule::Int),
            Value::Number(_) => Some(BuiltinRule::Number),
            Value::Str(_) => Some(BuiltinRule::Str),
            Value::Array(_) => Some(BuiltinRule::Array),
            Value::Regex(_) => Some(BuiltinRule::Regex),
            _ => None,
        }
    }

    /// Coerce a candidate value
    pub fn apply(self, value: &Value) -> Result<Value, RuleViolation> {
        match self {
            BuiltinRule::Bool => coerce::check_as_bool(value).map(Value::Bool),
            BuiltinRule::Int => coerce::check_as_int(value).map(Value::Int),
            BuiltinRule::Number => coerce::check_as_number(value).map(Value::Number),
            BuiltinRule::Str => coerce::check_as_str(value).map(Value::Str),
            BuiltinRule::Array => coerce::check_as_array(value).map(Value::Array),
            BuiltinRule::Regex => coerce::check_as_regex(value).map(Value::Regex),
        }
    }
}

/// How a rule checks candidate values
#[derive(Clone)]
pub enum RuleCheck {
    /// Built-in coercion
    Builtin(BuiltinRule),
    /// Value must equal one of these
    OneOf(Vec<Value>),
    /// Custom validator
    Validator(ValidatorFn),
}

impl fmt::Debug for RuleCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCheck::Builtin(rule) => f.debug_tuple("Builtin").field(rule).finish(),
            RuleCheck::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            RuleCheck::Validator(_) => write!(f, "Validator"),
        }
    }
}

/// Validation policy and accessor-generation flags for one property
#[derive(Debug, Clone)]
pub struct ConfigRule {
    check: Option<RuleCheck>,
    auto_get: bool,
    auto_set: bool,
    clear_cache: bool,
}

impl Default for ConfigRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRule {
    /// Rule with no check and both accessors generated
    pub fn new() -> Self {
        Self {
            check: None,
            auto_get: true,
            auto_set: true,
            clear_cache: false,
        }
    }

    /// Rule using a built-in coercion
    pub fn builtin(rule: BuiltinRule) -> Self {
        Self {
            check: Some(RuleCheck::Builtin(rule)),
            ..Self::new()
        }
    }

    /// Rule restricting the property to a fixed set of values
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            check: Some(RuleCheck::OneOf(values.into_iter().map(Into::into).collect())),
            ..Self::new()
        }
    }

    /// Rule using a custom validator
    pub fn validator<F>(f: F) -> Self
    where
        F: Fn(&Instance, Value) -> Result<Value, RuleViolation> + Send + Sync + 'static,
    {
        Self {
            check: Some(RuleCheck::Validator(Arc::new(f))),
            ..Self::new()
        }
    }

    /// Rule accepting instances of `base` (or null). Strings are treated as
    /// a class name or alias and bags as options carrying `jtacClass`; both
    /// are created through `registry`.
    pub fn instance_of(registry: &ClassRegistry, base: impl Into<String>) -> Self {
        let registry = registry.downgrade();
        let base = base.into();
        Self::validator(move |_this, value| coerce_instance(&registry, &base, value))
    }

    /// Do not generate a getter
    pub fn no_auto_get(mut self) -> Self {
        self.auto_get = false;
        self
    }

    /// Do not generate a setter
    pub fn no_auto_set(mut self) -> Self {
        self.auto_set = false;
        self
    }

    /// Clear the instance cache whenever the property is set
    pub fn clears_cache(mut self) -> Self {
        self.clear_cache = true;
        self
    }

    /// The check, if any
    pub fn check(&self) -> Option<&RuleCheck> {
        self.check.as_ref()
    }

    /// Whether a getter is generated
    pub fn auto_get(&self) -> bool {
        self.auto_get
    }

    /// Whether a setter is generated
    pub fn auto_set(&self) -> bool {
        self.auto_set
    }

    /// Whether setting the property clears the cache
    pub fn clear_cache(&self) -> bool {
        self.clear_cache
    }

    /// Validate a candidate value for `property` on `this`, returning the
    /// value to store.
    pub fn check_value(&self, this: &Instance, property: &str, value: Value) -> JtacResult<Value> {
        let result = match &self.check {
            None => Ok(value.clone()),
            Some(RuleCheck::Builtin(rule)) => rule.apply(&value),
            Some(RuleCheck::OneOf(allowed)) => {
                if allowed.contains(&value) {
                    Ok(value.clone())
                } else {
                    Err(RuleViolation::expected(format!(
                        "one of {}",
                        Value::Array(allowed.clone())
                    )))
                }
            }
            Some(RuleCheck::Validator(f)) => f(this, value.clone()),
        };

        match result {
            Ok(v) => Ok(v),
            Err(RuleViolation::Expected(expected)) => Err(context::error(
                ErrorKind::InvalidPropertyValue {
                    property: property.to_string(),
                    expected,
                    value: value.to_string(),
                },
                Some(this.full_class_name()),
            )),
            Err(RuleViolation::Failed(err)) => Err(err),
        }
    }
}

/// Accessor method name for a property: `accessor_name("get", "color")`
/// is `"getColor"`.
pub fn accessor_name(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => {
            let mut name = String::with_capacity(prefix.len() + property.len());
            name.push_str(prefix);
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
            name
        }
        None => prefix.to_string(),
    }
}

fn coerce_instance(
    registry: &WeakRegistry,
    base: &str,
    value: Value,
) -> Result<Value, RuleViolation> {
    let expected = || RuleViolation::expected(format!("an instance of {}", base));
    let created = match &value {
        Value::Null => return Ok(Value::Null),
        Value::Object(obj) => obj.clone(),
        Value::Str(name) => {
            let registry = registry.upgrade().ok_or_else(expected)?;
            registry.create(name, crate::alias::Initializer::Empty)?
        }
        Value::Bag(bag) if bag.contains(CLASS_DISCRIMINATOR) => {
            let registry = registry.upgrade().ok_or_else(expected)?;
            registry.create_from_values(bag.clone())?
        }
        _ => return Err(expected()),
    };

    if created.instance_of(base) {
        Ok(Value::Object(created))
    } else {
        Err(expected())
    }
}
