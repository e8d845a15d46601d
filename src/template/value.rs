// src/template/value.rs
//! Shared coercion rules for untyped JSON inside template expressions.
//!
//! Every helper that compares, tests or prints a context value goes through
//! these two functions so that loose-equality and truthiness behave the same
//! everywhere.

use serde_json::Value;

/// Stringification used for loose comparison and display.
///
/// Returns `None` for null: comparing against a missing or null value is
/// never equal to anything, including another null.
pub fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        other => serde_json::to_string(other).ok(),
    }
}

/// Like [`stringify`] but renders null as the empty string.
pub fn display(value: &Value) -> String {
    stringify(value).unwrap_or_default()
}

/// Truthiness for conditional block helpers: null, `false`, the empty
/// string and empty collections are falsy; everything else (including `0`)
/// is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stringify_distinguishes_number_types() {
        assert_eq!(stringify(&json!(1337)).unwrap(), "1337");
        assert_eq!(stringify(&json!(1337.0)).unwrap(), "1337.0");
        assert_eq!(stringify(&json!("1337")).unwrap(), "1337");
        assert_eq!(stringify(&Value::Null), None);
    }

    #[test]
    fn zero_and_false_truthiness() {
        assert!(is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!([false])));
    }
}
