//! Generic checks and coercions used by property rules.
//!
//! Each `check_as_*` helper accepts the loosely typed inputs a caller is
//! likely to supply (numbers as strings, `"true"`/`"false"`, `1`/`0`) and
//! returns the value in its final form, or a [`RuleViolation`] describing
//! what was expected.

use crate::error::RuleViolation;
use crate::value::{NativeFn, Pattern, PropertyBag, Value};

/// Accept an integer: integers, integral finite numbers, or strings that
/// parse as integers.
pub fn check_as_int(value: &Value) -> Result<i64, RuleViolation> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            Ok(*n as i64)
        }
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RuleViolation::expected("an integer")),
        _ => Err(RuleViolation::expected("an integer")),
    }
}

/// Like [`check_as_int`] but also accepts null
pub fn check_as_int_or_null(value: &Value) -> Result<Option<i64>, RuleViolation> {
    match value {
        Value::Null => Ok(None),
        other => check_as_int(other)
            .map(Some)
            .map_err(|_| RuleViolation::expected("an integer or null")),
    }
}

/// Accept any finite number, including numeric strings
pub fn check_as_number(value: &Value) -> Result<f64, RuleViolation> {
    let n = match value {
        Value::Int(i) => Some(*i as f64),
        Value::Number(n) => Some(*n),
        Value::Str(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(RuleViolation::expected("a finite number")),
    }
}

/// Accept a boolean, `"true"`/`"false"`, or `1`/`0`
pub fn check_as_bool(value: &Value) -> Result<bool, RuleViolation> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Str(s) if s == "true" => Ok(true),
        Value::Str(s) if s == "false" => Ok(false),
        Value::Int(1) => Ok(true),
        Value::Int(0) => Ok(false),
        Value::Number(n) if *n == 1.0 => Ok(true),
        Value::Number(n) if *n == 0.0 => Ok(false),
        _ => Err(RuleViolation::expected("a boolean")),
    }
}

/// Accept a string; numbers are converted to their string form
pub fn check_as_str(value: &Value) -> Result<String, RuleViolation> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Number(n) if n.is_finite() => Ok(n.to_string()),
        _ => Err(RuleViolation::expected("a string")),
    }
}

/// Like [`check_as_str`] but also accepts null
pub fn check_as_str_or_null(value: &Value) -> Result<Option<String>, RuleViolation> {
    match value {
        Value::Null => Ok(None),
        other => check_as_str(other)
            .map(Some)
            .map_err(|_| RuleViolation::expected("a string or null")),
    }
}

/// Accept an array
pub fn check_as_array(value: &Value) -> Result<Vec<Value>, RuleViolation> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(RuleViolation::expected("an array")),
    }
}

/// Accept a regular expression, compiling string patterns
pub fn check_as_regex(value: &Value) -> Result<Pattern, RuleViolation> {
    match value {
        Value::Regex(p) => Ok(p.clone()),
        Value::Str(s) => {
            Pattern::new(s).map_err(|_| RuleViolation::expected("a valid regular expression"))
        }
        _ => Err(RuleViolation::expected("a regular expression")),
    }
}

/// Accept a function value
pub fn check_as_function(value: &Value) -> Result<NativeFn, RuleViolation> {
    match value {
        Value::Function(f) => Ok(f.clone()),
        _ => Err(RuleViolation::expected("a function")),
    }
}

/// New bag holding `base` overlaid with `overlay`
pub fn merge(base: &PropertyBag, overlay: &PropertyBag) -> PropertyBag {
    let mut merged = base.clone();
    merged.extend_from(overlay);
    merged
}

/// Shallow overlay of `source` onto `target`
pub fn extend(target: &mut PropertyBag, source: &PropertyBag) {
    target.extend_from(source);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn test_check_as_int() {
        assert_eq!(check_as_int(&Value::Int(4)), Ok(4));
        assert_eq!(check_as_int(&Value::Number(4.0)), Ok(4));
        assert_eq!(check_as_int(&Value::from(" 12 ")), Ok(12));
        assert!(check_as_int(&Value::Number(4.5)).is_err());
        assert!(check_as_int(&Value::from("abc")).is_err());
        assert!(check_as_int(&Value::Null).is_err());
        assert_eq!(check_as_int_or_null(&Value::Null), Ok(None));
    }

    #[test]
    fn test_check_as_number() {
        assert_eq!(check_as_number(&Value::Int(2)), Ok(2.0));
        assert_eq!(check_as_number(&Value::from("2.5")), Ok(2.5));
        assert!(check_as_number(&Value::Number(f64::INFINITY)).is_err());
        assert!(check_as_number(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_check_as_bool() {
        assert_eq!(check_as_bool(&Value::from("true")), Ok(true));
        assert_eq!(check_as_bool(&Value::from("false")), Ok(false));
        assert_eq!(check_as_bool(&Value::Int(1)), Ok(true));
        assert_eq!(check_as_bool(&Value::Int(0)), Ok(false));
        assert!(check_as_bool(&Value::Int(2)).is_err());
        assert!(check_as_bool(&Value::from("yes")).is_err());
    }

    #[test]
    fn test_check_as_str() {
        assert_eq!(check_as_str(&Value::Int(7)), Ok("7".to_string()));
        assert_eq!(check_as_str(&Value::Number(2.5)), Ok("2.5".to_string()));
        assert!(check_as_str(&Value::Array(vec![])).is_err());
        assert_eq!(check_as_str_or_null(&Value::Null), Ok(None));
    }

    #[test]
    fn test_check_as_regex() {
        let p = check_as_regex(&Value::from("^\\d+$")).unwrap();
        assert!(p.is_match("123"));
        assert!(check_as_regex(&Value::from("(")).is_err());
        assert!(check_as_regex(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_check_as_array_and_function() {
        assert!(check_as_array(&Value::Array(vec![Value::Int(1)])).is_ok());
        assert!(check_as_array(&Value::from("[1]")).is_err());
        let f = Value::function(|args| Ok(Value::Int(args.len() as i64)));
        let callable = check_as_function(&f).unwrap();
        assert_eq!(callable(&[Value::Null]).unwrap(), Value::Int(1));
        assert!(check_as_function(&Value::Null).is_err());
    }

    #[test]
    fn test_merge_does_not_touch_inputs() {
        let base = props! { "a" => 1 };
        let overlay = props! { "a" => 2, "b" => 3 };
        let merged = merge(&base, &overlay);
        assert_eq!(merged.get("a"), Some(&Value::Int(2)));
        assert_eq!(base.get("a"), Some(&Value::Int(1)));

        let mut target = base.clone();
        extend(&mut target, &overlay);
        assert_eq!(target, merged);
    }
}
