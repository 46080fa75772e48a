//! Loose JSON field checks for request bodies. Clients send codes and flags
//! as strings or numbers interchangeably, so "present" means non-empty,
//! non-zero and non-null.

use serde_json::Value;

pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Text form of a scalar field (`1` and `"1"` both give `"1"`).
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(as_text).collect::<Vec<_>>().join(","),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Whether the value reads as a finite number; blank strings and null count as zero.
pub fn is_finite_number(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().map(f64::is_finite).unwrap_or(false),
        Value::String(s) if s.trim().is_empty() => true,
        Value::String(s) => s.trim().parse::<f64>().map(f64::is_finite).unwrap_or(false),
        Value::Bool(_) | Value::Null => true,
        _ => false,
    }
}

/// The record itself, whether sent bare or under `key`.
pub fn unwrap_record<'a>(raw: &'a Value, key: &str) -> &'a Value {
    match raw.get(key) {
        Some(inner) if is_truthy(Some(inner)) => inner,
        _ => raw,
    }
}
