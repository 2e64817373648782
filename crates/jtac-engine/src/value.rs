//! Dynamic values held in config, internal and cache bags
//!
//! Config defaults, caller-supplied initial values and everything returned by
//! generated getters are `Value`s. Cloning a `Value` copies arrays and bags
//! element by element (a deep clone), while object and function values are
//! shared handles.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::JtacResult;
use crate::instance::ObjectRef;

/// Callable stored in a function-typed value.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> JtacResult<Value> + Send + Sync>;

/// Dynamically typed property value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer number
    Int(i64),
    /// Floating point number
    Number(f64),
    /// String
    Str(String),
    /// Ordered list of values
    Array(Vec<Value>),
    /// Compiled regular expression
    Regex(Pattern),
    /// Name/value bag (options object)
    Bag(PropertyBag),
    /// Instance of a registered class
    Object(ObjectRef),
    /// Callable
    Function(NativeFn),
}

impl Value {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Regex(_) => "regexp",
            Value::Bag(_) => "bag",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Extract boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract integer value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract any numeric value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Extract array items
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Extract regular expression
    pub fn as_regex(&self) -> Option<&Pattern> {
        match self {
            Value::Regex(p) => Some(p),
            _ => None,
        }
    }

    /// Extract property bag
    pub fn as_bag(&self) -> Option<&PropertyBag> {
        match self {
            Value::Bag(bag) => Some(bag),
            _ => None,
        }
    }

    /// Extract object handle
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Extract callable
    pub fn as_function(&self) -> Option<&NativeFn> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Convert a JSON value. Objects become bags, integral numbers become
    /// `Int`, all other numbers `Number`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Bag(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Wrap a closure as a function value
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> JtacResult<Value> + Send + Sync + 'static,
    {
        Value::Function(Arc::new(f))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Int(a), Value::Number(b)) | (Value::Number(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            (Value::Bag(a), Value::Bag(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Regex(p) => write!(f, "Regex(/{}/)", p.as_str()),
            Value::Bag(bag) => f.debug_tuple("Bag").field(bag).finish(),
            Value::Object(obj) => write!(f, "Object({}#{})", obj.full_class_name(), obj.id()),
            Value::Function(_) => write!(f, "Function"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Regex(p) => write!(f, "/{}/", p.as_str()),
            Value::Bag(bag) => {
                write!(f, "{{")?;
                for (i, (name, value)) in bag.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Value::Object(obj) => write!(f, "<{}>", obj.full_class_name()),
            Value::Function(_) => write!(f, "<function>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Pattern> for Value {
    fn from(p: Pattern) -> Self {
        Value::Regex(p)
    }
}

impl From<PropertyBag> for Value {
    fn from(bag: PropertyBag) -> Self {
        Value::Bag(bag)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Compiled regular expression compared by its source pattern
#[derive(Clone, Debug)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    /// Source text of the pattern
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Underlying compiled regex
    pub fn as_regex(&self) -> &Regex {
        &self.0
    }

    /// Test whether the pattern matches anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Pattern(re)
    }
}

/// Ordered name → value bag.
///
/// Insertion order is preserved so that bulk updates apply properties in the
/// order they were declared. Equality ignores order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyBag {
    entries: IndexMap<String, Value>,
}

impl PropertyBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bag is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Check if a name is present
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert or replace a value, keeping the original position on replace.
    /// Returns the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Remove a value by name, keeping the order of the remaining entries
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.shift_remove(name)
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Overlay every entry of `other` onto this bag
    pub fn extend_from(&mut self, other: &PropertyBag) {
        self.entries.extend(
            other
                .entries
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
    }

    /// Build a bag from a JSON object, keeping document order; any other
    /// JSON value yields `None`.
    pub fn from_json(json: serde_json::Value) -> Option<Self> {
        match Value::from_json(json) {
            Value::Bag(bag) => Some(bag),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for PropertyBag {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Build a [`PropertyBag`] from `name => value` pairs.
///
/// ```rust,ignore
/// let bag = props! { "color" => "red", "radius" => 2 };
/// ```
#[macro_export]
macro_rules! props {
    () => {
        $crate::PropertyBag::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut bag = $crate::PropertyBag::new();
        $( bag.insert($name, $value); )+
        bag
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_insert_keeps_order() {
        let mut bag = PropertyBag::new();
        bag.insert("b", 1);
        bag.insert("a", 2);
        bag.insert("b", 3);

        let keys: Vec<&str> = bag.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(bag.get("b"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_bag_remove() {
        let mut bag = props! { "x" => 1, "y" => 2 };
        assert_eq!(bag.remove("x"), Some(Value::Int(1)));
        assert_eq!(bag.remove("x"), None);
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_bag_remove_keeps_order_of_rest() {
        let mut bag = props! { "a" => 1, "b" => 2, "c" => 3, "d" => 4 };
        bag.remove("b");
        assert_eq!(bag.keys().collect::<Vec<_>>(), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_from_json_keeps_document_order() {
        let json = serde_json::json!({ "zeta": 1, "alpha": 2, "mid": 3 });
        let bag = PropertyBag::from_json(json).unwrap();
        assert_eq!(bag.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_bag_extend_from_overlays() {
        let mut base = props! { "color" => "black", "radius" => 0 };
        base.extend_from(&props! { "color" => "red", "label" => "c" });

        assert_eq!(base.get("color"), Some(&Value::from("red")));
        assert_eq!(base.get("radius"), Some(&Value::Int(0)));
        assert_eq!(base.keys().collect::<Vec<_>>(), vec!["color", "radius", "label"]);
    }

    #[test]
    fn test_clone_copies_nested_bags() {
        let original = Value::Bag(props! { "inner" => vec![Value::Int(1)] });
        let mut copy = original.clone();
        if let Value::Bag(bag) = &mut copy {
            bag.insert("inner", Value::Null);
        }
        assert_eq!(
            original.as_bag().and_then(|b| b.get("inner")),
            Some(&Value::Array(vec![Value::Int(1)]))
        );
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "jtacClass": "Shapes.Circle",
            "radius": 2,
            "ratio": 0.5,
            "tags": ["a", null]
        });
        let bag = PropertyBag::from_json(json).unwrap();

        assert_eq!(bag.get("jtacClass"), Some(&Value::from("Shapes.Circle")));
        assert_eq!(bag.get("radius"), Some(&Value::Int(2)));
        assert_eq!(bag.get("ratio"), Some(&Value::Number(0.5)));
        assert_eq!(
            bag.get("tags"),
            Some(&Value::Array(vec![Value::from("a"), Value::Null]))
        );
        assert!(PropertyBag::from_json(serde_json::json!([1])).is_none());
    }

    #[test]
    fn test_numeric_equality() {
        assert_eq!(Value::Int(5), Value::Number(5.0));
        assert_ne!(Value::Int(5), Value::from("5"));
    }

    #[test]
    fn test_pattern_equality_by_source() {
        let a = Pattern::new("^a+$").unwrap();
        let b = Pattern::new("^a+$").unwrap();
        assert_eq!(Value::Regex(a), Value::Regex(b));
    }

    #[test]
    fn test_display() {
        let v = Value::Array(vec![Value::from("x"), Value::Int(1), Value::Null]);
        assert_eq!(v.to_string(), "[\"x\", 1, null]");
    }
}
