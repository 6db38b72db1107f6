//! JSON helpers
//!
//! Kind detection, numeric-aware equality and the canonical projection used for
//! structural equality, uniqueness checks and fingerprints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Primitive JSON kind of a runtime value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn from_json_type(type_str: &str) -> Option<Self> {
        match type_str {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// Most specific kind of a value (integral numbers are `Integer`)
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if is_integral(n) => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Array | Self::Object)
    }

    /// Whether `value` conforms to this kind. Booleans are never numbers.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Integer, Value::Number(n)) => is_integral(n),
            (Self::Number, Value::Number(_)) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Array, Value::Array(_)) => true,
            (Self::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JsonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_integral(n: &Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    n.as_f64().map(|f| f.is_finite() && f.fract() == 0.0).unwrap_or(false)
}

/// Structural equality where `1` and `1.0` compare equal
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => number_eq(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map(|y| json_eq(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}

fn number_eq(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Canonical form: integral floats become integers, object keys are sorted
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Number(n) if !(n.is_i64() || n.is_u64()) && is_integral(n) => {
            match n.as_f64() {
                Some(f) if f >= i64::MIN as f64 && f <= i64::MAX as f64 => Value::from(f as i64),
                _ => value.clone(),
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let canonical: Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), canonicalize(&map[k])))
                .collect();
            Value::Object(canonical)
        }
        _ => value.clone(),
    }
}

/// Canonical JSON text of a value
pub fn canonical_string(value: &Value) -> String {
    canonicalize(value).to_string()
}

/// Numeric view of a JSON number (never of a boolean)
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_detection() {
        assert_eq!(JsonKind::of(&json!(5)), JsonKind::Integer);
        assert_eq!(JsonKind::of(&json!(5.5)), JsonKind::Number);
        assert_eq!(JsonKind::of(&json!(true)), JsonKind::Boolean);
        assert_eq!(JsonKind::of(&json!({"a": 1})), JsonKind::Object);
    }

    #[test]
    fn test_booleans_are_not_numbers() {
        assert!(!JsonKind::Integer.matches(&json!(true)));
        assert!(!JsonKind::Number.matches(&json!(false)));
        assert!(JsonKind::Number.matches(&json!(3)));
        assert!(JsonKind::Integer.matches(&json!(3.0)));
    }

    #[test]
    fn test_numeric_equality() {
        assert!(json_eq(&json!([1, {"a": 2.0}]), &json!([1.0, {"a": 2}])));
        assert!(!json_eq(&json!(1), &json!(true)));
        assert_eq!(canonical_string(&json!({"b": 1.0, "a": [2.0]})), r#"{"a":[2],"b":1}"#);
    }
}
