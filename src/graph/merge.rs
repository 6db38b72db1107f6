//! `allOf` keyword merging
//!
//! Branches are merged key by key into one effective schema node:
//! - unseen keys pass through
//! - `enum` intersects, `required` unions
//! - `type` must agree (`integer` narrows `number`)
//! - lower bounds take the max, upper bounds the min
//! - `multipleOf` keeps the larger value when one divides the other
//! - `properties` merge per property with these same rules
//! - anything else is overwritten by the later branch

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::json::{as_number, json_eq};

const LOWER_BOUNDS: &[&str] = &["minimum", "minLength", "minItems", "minProperties"];
const UPPER_BOUNDS: &[&str] = &["maximum", "maxLength", "maxItems", "maxProperties"];

/// Merge `from` into `into`; `uri` names the node for error reporting
pub fn merge_schemas(
    into: &mut Map<String, Value>,
    from: &Map<String, Value>,
    uri: &str,
) -> Result<()> {
    for (key, incoming) in from {
        let Some(existing) = into.get(key) else {
            into.insert(key.clone(), incoming.clone());
            continue;
        };

        let merged = match key.as_str() {
            "properties" => merge_properties(existing, incoming, uri)?,
            "required" => merge_required(existing, incoming),
            "enum" => merge_enum(existing, incoming, uri)?,
            "type" => merge_type(existing, incoming, uri)?,
            "multipleOf" => merge_multiple_of(existing, incoming, uri)?,
            "exclusiveMinimum" | "exclusiveMaximum"
                if existing.is_boolean() || incoming.is_boolean() =>
            {
                // draft 4 flags: exclusive if either side says so
                Value::Bool(existing.as_bool().unwrap_or(false) || incoming.as_bool().unwrap_or(false))
            }
            "exclusiveMinimum" => tighten(existing, incoming, f64::max),
            "exclusiveMaximum" => tighten(existing, incoming, f64::min),
            k if LOWER_BOUNDS.contains(&k) => tighten(existing, incoming, f64::max),
            k if UPPER_BOUNDS.contains(&k) => tighten(existing, incoming, f64::min),
            _ => incoming.clone(),
        };
        into.insert(key.clone(), merged);
    }
    Ok(())
}

fn merge_properties(existing: &Value, incoming: &Value, uri: &str) -> Result<Value> {
    let (Some(existing), Some(incoming)) = (existing.as_object(), incoming.as_object()) else {
        return Err(SchemaError::definition(uri, "`properties` must be an object"));
    };

    let mut merged = existing.clone();
    for (name, schema) in incoming {
        if let (Some(Value::Object(current)), Some(schema)) = (merged.get_mut(name), schema.as_object()) {
            merge_schemas(current, schema, &format!("{}/{}", uri, name))?;
            continue;
        }
        merged.insert(name.clone(), schema.clone());
    }
    Ok(Value::Object(merged))
}

fn merge_required(existing: &Value, incoming: &Value) -> Value {
    let mut names: Vec<Value> = existing.as_array().cloned().unwrap_or_default();
    for name in incoming.as_array().into_iter().flatten() {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    Value::Array(names)
}

fn merge_enum(existing: &Value, incoming: &Value, uri: &str) -> Result<Value> {
    let (Some(existing), Some(incoming)) = (existing.as_array(), incoming.as_array()) else {
        return Err(SchemaError::definition(uri, "`enum` must be an array"));
    };
    let common: Vec<Value> = existing
        .iter()
        .filter(|v| incoming.iter().any(|w| json_eq(v, w)))
        .cloned()
        .collect();
    if common.is_empty() {
        return Err(SchemaError::definition(
            uri,
            format!("enum intersection of {:?} and {:?} is empty", existing, incoming),
        ));
    }
    Ok(Value::Array(common))
}

fn type_names(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn merge_type(existing: &Value, incoming: &Value, uri: &str) -> Result<Value> {
    let left = type_names(existing);
    let right = type_names(incoming);

    let mut common: Vec<&str> = Vec::new();
    for l in &left {
        for r in &right {
            let narrowed = match (*l, *r) {
                (a, b) if a == b => Some(a),
                ("integer", "number") | ("number", "integer") => Some("integer"),
                _ => None,
            };
            if let Some(t) = narrowed {
                if !common.contains(&t) {
                    common.push(t);
                }
            }
        }
    }

    match common.len() {
        0 => Err(SchemaError::definition(
            uri,
            format!("conflicting types in allOf: {} and {}", existing, incoming),
        )),
        1 => Ok(Value::String(common[0].to_string())),
        _ => Ok(Value::Array(
            common.into_iter().map(|t| Value::String(t.to_string())).collect(),
        )),
    }
}

fn merge_multiple_of(existing: &Value, incoming: &Value, uri: &str) -> Result<Value> {
    let (Some(a), Some(b)) = (as_number(existing), as_number(incoming)) else {
        return Err(SchemaError::definition(uri, "`multipleOf` must be a number"));
    };
    let divides = |big: f64, small: f64| {
        small != 0.0 && {
            let q = big / small;
            (q - q.round()).abs() < 1e-9
        }
    };

    if divides(a, b) {
        Ok(existing.clone())
    } else if divides(b, a) {
        Ok(incoming.clone())
    } else {
        Err(SchemaError::definition(
            uri,
            format!("incompatible multipleOf constraints {} and {}", existing, incoming),
        ))
    }
}

fn tighten(existing: &Value, incoming: &Value, pick: fn(f64, f64) -> f64) -> Value {
    match (as_number(existing), as_number(incoming)) {
        (Some(a), Some(b)) => {
            if pick(a, b) == a {
                existing.clone()
            } else {
                incoming.clone()
            }
        }
        _ => incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn merged(a: Value, b: Value) -> Result<Map<String, Value>> {
        let mut into = a.as_object().cloned().unwrap();
        merge_schemas(&mut into, b.as_object().unwrap(), "test")?;
        Ok(into)
    }

    #[test]
    fn test_bounds_tighten() {
        let m = merged(
            json!({"minimum": 1, "maximum": 10, "minLength": 2}),
            json!({"minimum": 5, "maximum": 20, "maxLength": 4}),
        )
        .unwrap();
        assert_eq!(m["minimum"], json!(5));
        assert_eq!(m["maximum"], json!(10));
        assert_eq!(m["minLength"], json!(2));
        assert_eq!(m["maxLength"], json!(4));
    }

    #[test]
    fn test_type_conflict_is_an_error() {
        let err = merged(json!({"type": "string"}), json!({"type": "integer"})).unwrap_err();
        assert!(matches!(err, SchemaError::Definition { .. }));

        let m = merged(json!({"type": "number"}), json!({"type": "integer"})).unwrap();
        assert_eq!(m["type"], json!("integer"));
    }

    #[test]
    fn test_enum_intersects() {
        let m = merged(json!({"enum": ["a", "b", "c"]}), json!({"enum": ["c", "b", "z"]})).unwrap();
        assert_eq!(m["enum"], json!(["b", "c"]));
        assert!(merged(json!({"enum": ["a"]}), json!({"enum": ["b"]})).is_err());
    }

    #[test]
    fn test_multiple_of() {
        let m = merged(json!({"multipleOf": 2}), json!({"multipleOf": 6})).unwrap();
        assert_eq!(m["multipleOf"], json!(6));
        assert!(merged(json!({"multipleOf": 4}), json!({"multipleOf": 6})).is_err());
    }

    #[test]
    fn test_properties_and_required_merge() {
        let m = merged(
            json!({"properties": {"a": {"minimum": 1}}, "required": ["a"]}),
            json!({"properties": {"a": {"minimum": 5}, "b": {"type": "string"}}, "required": ["b", "a"]}),
        )
        .unwrap();
        assert_eq!(m["properties"]["a"]["minimum"], json!(5));
        assert_eq!(m["properties"]["b"]["type"], json!("string"));
        assert_eq!(m["required"], json!(["a", "b"]));
    }

    #[test]
    fn test_unseen_and_other_keys() {
        let m = merged(json!({"title": "A", "pattern": "x"}), json!({"title": "B", "format": "email"}))
            .unwrap();
        assert_eq!(m["title"], json!("B"));
        assert_eq!(m["pattern"], json!("x"));
        assert_eq!(m["format"], json!("email"));
    }
}
