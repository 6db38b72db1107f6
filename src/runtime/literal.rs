//! Literal values
//!
//! A single JSON scalar (or an inferred open-extension value) carried with
//! the keyword-constraint set it was validated against. Literals compare
//! transparently with raw scalars: `age == 5`, `name == "x"`, `score < 1.5`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::graph::{TypeGraph, TypeId};
use crate::json::{as_number, json_eq, JsonKind};
use crate::runtime::TypeHandle;
use crate::validators::ValidatorRegistry;

#[derive(Debug, Clone)]
pub struct LiteralValue {
    value: Value,
    type_name: String,
    keywords: Arc<Map<String, Value>>,
    registry: Arc<ValidatorRegistry>,
    origin: Option<TypeHandle>,
}

impl LiteralValue {
    /// Wrap `value` as the literal type `handle`, then validate it
    ///
    /// `null` is replaced by the type's default when it has one.
    pub fn new(handle: &TypeHandle, value: Value) -> Result<Self, ValidationError> {
        let graph = handle.graph();
        let literal = handle
            .descriptor()
            .and_then(|d| d.as_literal())
            .ok_or_else(|| ValidationError::new(format!("{} is not a literal type", handle.name())))?;

        let value = match (&value, literal.meta.default.as_ref()) {
            (Value::Null, Some(default)) if !default.is_null() => default.clone(),
            _ => value,
        };

        let literal = Self {
            value,
            type_name: handle.name(),
            keywords: literal.keywords.clone(),
            registry: graph.registry().clone(),
            origin: Some(handle.clone()),
        };
        literal.validate()?;
        Ok(literal)
    }

    /// Literal typed only by the JSON kind of `value` (open extensions)
    pub fn inferred(value: Value, registry: Arc<ValidatorRegistry>) -> Self {
        let kind = JsonKind::of(&value);
        let mut keywords = Map::new();
        keywords.insert("type".into(), Value::String(kind.as_str().to_string()));
        Self {
            value,
            type_name: kind.as_str().to_string(),
            keywords: Arc::new(keywords),
            registry,
            origin: None,
        }
    }

    /// Run the keyword validators (`type` first)
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.registry
            .validate(&self.keywords, &self.value)
            .map_err(|e| e.in_type(&self.type_name))
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn keywords(&self) -> &Map<String, Value> {
        &self.keywords
    }

    /// The literal type this value was built as, if any
    pub fn handle(&self) -> Option<&TypeHandle> {
        self.origin.as_ref()
    }

    pub(crate) fn is_type(&self, graph: &Arc<TypeGraph>, id: TypeId) -> bool {
        self.origin.as_ref().map(|h| h.is(graph, id)).unwrap_or(false)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_i64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        as_number(&self.value)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => as_number(left)?.partial_cmp(&as_number(right)?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

impl PartialEq for LiteralValue {
    fn eq(&self, other: &Self) -> bool {
        json_eq(&self.value, &other.value)
    }
}

impl PartialOrd for LiteralValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        compare(&self.value, &other.value)
    }
}

impl PartialEq<Value> for LiteralValue {
    fn eq(&self, other: &Value) -> bool {
        json_eq(&self.value, other)
    }
}

impl PartialOrd<Value> for LiteralValue {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        compare(&self.value, other)
    }
}

macro_rules! scalar_comparisons {
    ($($ty:ty),*) => {
        $(
            impl PartialEq<$ty> for LiteralValue {
                fn eq(&self, other: &$ty) -> bool {
                    json_eq(&self.value, &Value::from(*other))
                }
            }

            impl PartialOrd<$ty> for LiteralValue {
                fn partial_cmp(&self, other: &$ty) -> Option<Ordering> {
                    compare(&self.value, &Value::from(*other))
                }
            }
        )*
    };
}

scalar_comparisons!(i64, i32, u64, f64, bool, &str);
