//! Runtime values
//!
//! Values built from a compiled [`TypeGraph`]:
//! - [`Instance`] for object types
//! - [`ArrayValue`] for array types
//! - [`LiteralValue`] for literal types
//!
//! Every value reaches its typed form through [`coerce`]: values already
//! typed as the target are revalidated in place, anything else is projected
//! to JSON and rebuilt. `Union` targets try each candidate in order.

pub mod array;
pub mod extension;
pub mod instance;
pub mod literal;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{SchemaError, ValidationError};
use crate::graph::{TypeDescriptor, TypeGraph, TypeId, TypeKind};
use crate::json::canonical_string;

pub use array::ArrayValue;
pub use extension::{match_extension, ExtensionMatch};
pub use instance::Instance;
pub use literal::LiteralValue;

// =============================================================================
// Typed Value
// =============================================================================

/// A stored property, array element or coercion result
#[derive(Debug, Clone)]
pub enum TypedValue {
    /// Not yet coerced (bypass writes, unconstrained array elements)
    Raw(Value),
    Literal(LiteralValue),
    Object(Instance),
    Array(ArrayValue),
}

impl TypedValue {
    /// Plain JSON projection, without validation
    pub fn to_json(&self) -> Value {
        match self {
            Self::Raw(v) => v.clone(),
            Self::Literal(l) => l.value().clone(),
            Self::Object(i) => i.to_json(),
            Self::Array(a) => a.to_json(),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Self::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Object(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_instance_mut(&mut self) -> Option<&mut Instance> {
        match self {
            Self::Object(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayValue> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Self::Object(i) => Some(i),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<ArrayValue> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_literal(self) -> Option<LiteralValue> {
        match self {
            Self::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Name of the type this value was built as
    pub fn type_name(&self) -> Option<String> {
        match self {
            Self::Raw(_) => None,
            Self::Literal(l) => Some(l.type_name().to_string()),
            Self::Object(i) => Some(i.type_name()),
            Self::Array(a) => Some(a.type_name()),
        }
    }
}

/// Structural equality over the canonical JSON projection
impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        canonical_string(&self.to_json()) == canonical_string(&other.to_json())
    }
}

impl From<Value> for TypedValue {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

impl From<LiteralValue> for TypedValue {
    fn from(value: LiteralValue) -> Self {
        Self::Literal(value)
    }
}

impl From<Instance> for TypedValue {
    fn from(value: Instance) -> Self {
        Self::Object(value)
    }
}

impl From<ArrayValue> for TypedValue {
    fn from(value: ArrayValue) -> Self {
        Self::Array(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::Raw(Value::from(value))
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::Raw(Value::from(value))
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        Self::Raw(Value::from(value))
    }
}

impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        Self::Raw(Value::from(value))
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        Self::Raw(Value::from(value))
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        Self::Raw(Value::from(value))
    }
}

// =============================================================================
// Type Handle
// =============================================================================

/// A constructible type: a graph plus an id in it
#[derive(Clone)]
pub struct TypeHandle {
    graph: Arc<TypeGraph>,
    id: TypeId,
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("name", &self.name())
            .field("id", &self.id)
            .finish()
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph) && self.id == other.id
    }
}

impl TypeHandle {
    /// Handle for `id`; `Reference` ids are followed to their target
    pub fn new(graph: Arc<TypeGraph>, id: TypeId) -> Self {
        let id = graph.deref(id);
        Self { graph, id }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn graph(&self) -> &Arc<TypeGraph> {
        &self.graph
    }

    pub fn descriptor(&self) -> Option<&TypeDescriptor> {
        self.graph.get(self.id)
    }

    pub fn kind(&self) -> Option<TypeKind> {
        self.descriptor().map(TypeDescriptor::kind)
    }

    pub fn name(&self) -> String {
        self.graph.type_name(self.id)
    }

    pub(crate) fn is(&self, graph: &Arc<TypeGraph>, id: TypeId) -> bool {
        Arc::ptr_eq(&self.graph, graph) && self.id == graph.deref(id)
    }

    /// Handle for another id in the same graph
    pub(crate) fn sibling(&self, id: TypeId) -> TypeHandle {
        TypeHandle::new(self.graph.clone(), id)
    }

    /// Build and validate a value of this type from JSON
    ///
    /// A `Union` returns the first candidate that accepts the data.
    pub fn create(&self, value: Value) -> Result<TypedValue, ValidationError> {
        coerce(&self.graph, self.id, TypedValue::Raw(value))
    }

    /// Coerce an existing value to this type
    pub fn coerce(&self, value: impl Into<TypedValue>) -> Result<TypedValue, ValidationError> {
        coerce(&self.graph, self.id, value.into())
    }

    /// Parse, construct and validate
    pub fn from_json(&self, text: &str) -> Result<TypedValue, SchemaError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(self.create(value)?)
    }

    /// Empty instance of an object type (defaults applied)
    pub fn instance(&self) -> Result<Instance, ValidationError> {
        Instance::new(self.clone())
    }

    /// Instance of an object type built from named properties
    pub fn instance_with<I, K, V>(&self, properties: I) -> Result<Instance, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<TypedValue>,
    {
        Instance::with_properties(self.clone(), properties)
    }

    /// Array value of an array type
    pub fn array(&self, items: Vec<Value>) -> Result<ArrayValue, ValidationError> {
        ArrayValue::from_values(self.clone(), items)
    }

    /// Literal value of a literal type
    pub fn literal(&self, value: Value) -> Result<LiteralValue, ValidationError> {
        LiteralValue::new(self, value)
    }

    /// Check a JSON value without keeping the result
    pub fn validate_value(&self, value: &Value) -> Result<(), ValidationError> {
        self.create(value.clone()).map(|_| ())
    }
}

// =============================================================================
// Coercion
// =============================================================================

/// Coerce `value` to the type `id` of `graph`
pub fn coerce(
    graph: &Arc<TypeGraph>,
    id: TypeId,
    mut value: TypedValue,
) -> Result<TypedValue, ValidationError> {
    coerce_in_place(graph, id, &mut value)?;
    Ok(value)
}

/// Coerce the value in `slot` to `id`; on failure `slot` is left untouched
pub(crate) fn coerce_in_place(
    graph: &Arc<TypeGraph>,
    id: TypeId,
    slot: &mut TypedValue,
) -> Result<(), ValidationError> {
    let id = graph.deref(id);

    match slot {
        TypedValue::Object(instance) if instance.handle().is(graph, id) => {
            return instance.validate();
        }
        TypedValue::Array(array) if array.handle().is(graph, id) => {
            return array.validate();
        }
        TypedValue::Literal(literal) if literal.is_type(graph, id) => {
            return literal.validate();
        }
        _ => {}
    }

    let handle = TypeHandle::new(graph.clone(), id);
    let built = match graph.get(id) {
        Some(TypeDescriptor::Union(union)) => coerce_union(graph, &union.candidates, slot, &handle)?,
        Some(TypeDescriptor::Object(_)) => {
            let map = match slot.to_json() {
                Value::Object(map) => map,
                other => {
                    return Err(ValidationError::new(format!("{} is not an object", other))
                        .in_type(&handle.name()))
                }
            };
            let mut instance = Instance::with_properties(handle, map)?;
            instance.validate()?;
            TypedValue::Object(instance)
        }
        Some(TypeDescriptor::Array(_)) => {
            let items = match slot.to_json() {
                Value::Array(items) => items,
                other => {
                    return Err(ValidationError::new(format!("{} is not an array", other))
                        .in_type(&handle.name()))
                }
            };
            let mut array = ArrayValue::from_values(handle, items)?;
            array.validate()?;
            TypedValue::Array(array)
        }
        Some(TypeDescriptor::Literal(_)) => TypedValue::Literal(LiteralValue::new(&handle, slot.to_json())?),
        Some(TypeDescriptor::Reference(_)) | None => {
            return Err(ValidationError::new(format!("unknown type {}", id)));
        }
    };

    *slot = built;
    Ok(())
}

fn coerce_union(
    graph: &Arc<TypeGraph>,
    candidates: &[TypeId],
    slot: &TypedValue,
    handle: &TypeHandle,
) -> Result<TypedValue, ValidationError> {
    let mut failures = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match coerce(graph, *candidate, slot.clone()) {
            Ok(value) => return Ok(value),
            Err(e) => failures.push(format!("{}: {}", graph.type_name(*candidate), e)),
        }
    }

    let names: Vec<String> = candidates.iter().map(|c| graph.type_name(*c)).collect();
    Err(ValidationError::new(format!(
        "{} does not match any of [{}]: {}",
        slot.to_json(),
        names.join(", "),
        failures.join("; ")
    ))
    .in_type(&handle.name()))
}
