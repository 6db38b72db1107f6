//! Array values
//!
//! An [`ArrayValue`] wraps the raw elements of one array type. Mutations
//! only mark it dirty; the typed projection is rebuilt the next time it is
//! read. Arrays from a strict build revalidate on every mutation instead and
//! roll back a mutation that fails.
//!
//! Revalidation order:
//! 1. items (uniform, positional tuple, or per-element union)
//! 2. `minItems` / `maxItems`
//! 3. `uniqueItems`

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::error::{SchemaError, ValidationError};
use crate::graph::{ArrayType, ItemConstraint, TypeGraph};
use crate::json::canonical_string;
use crate::runtime::{coerce_in_place, TypeHandle, TypedValue};

#[derive(Debug, Clone)]
pub struct ArrayValue {
    ty: TypeHandle,
    data: Vec<TypedValue>,
    dirty: bool,
    revalidations: usize,
    strict: bool,
}

fn array_of<'g>(graph: &'g Arc<TypeGraph>, handle: &TypeHandle) -> Result<&'g ArrayType, ValidationError> {
    graph
        .get(handle.id())
        .and_then(|d| d.as_array())
        .ok_or_else(|| ValidationError::new(format!("{} is not an array type", handle.name())))
}

impl ArrayValue {
    pub fn new(handle: TypeHandle) -> Result<Self, ValidationError> {
        Self::from_items(handle, Vec::new())
    }

    pub fn from_values(handle: TypeHandle, values: Vec<Value>) -> Result<Self, ValidationError> {
        Self::from_items(handle, values.into_iter().map(TypedValue::Raw).collect())
    }

    /// Wrap already-built elements; validated now only for strict builds
    pub fn from_items(handle: TypeHandle, items: Vec<TypedValue>) -> Result<Self, ValidationError> {
        array_of(handle.graph(), &handle)?;
        let strict = handle.graph().config().strict;
        let mut array = Self {
            ty: handle,
            data: items,
            dirty: true,
            revalidations: 0,
            strict,
        };
        if strict {
            array.revalidate()?;
        }
        Ok(array)
    }

    /// Parse, construct and validate
    pub fn from_json(handle: &TypeHandle, text: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(text)?;
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(ValidationError::new(format!("{} is not an array", other))
                    .in_type(&handle.name())
                    .into())
            }
        };
        let mut array = Self::from_values(handle.clone(), items)?;
        array.validate()?;
        Ok(array)
    }

    pub fn handle(&self) -> &TypeHandle {
        &self.ty
    }

    pub fn type_name(&self) -> String {
        self.ty.name()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    fn mutate<R>(&mut self, op: impl FnOnce(&mut Vec<TypedValue>) -> R) -> Result<R, ValidationError> {
        if !self.strict {
            let result = op(&mut self.data);
            self.dirty = true;
            return Ok(result);
        }

        let snapshot = self.data.clone();
        let was_dirty = self.dirty;
        let result = op(&mut self.data);
        self.dirty = true;
        if let Err(e) = self.revalidate() {
            self.data = snapshot;
            self.dirty = was_dirty;
            return Err(e);
        }
        Ok(result)
    }

    fn check_index(&self, index: usize, len: usize) -> Result<(), ValidationError> {
        if index < len {
            Ok(())
        } else {
            Err(ValidationError::new(format!(
                "index {} out of range for length {}",
                index,
                self.data.len()
            ))
            .in_type(&self.type_name()))
        }
    }

    pub fn push(&mut self, value: impl Into<TypedValue>) -> Result<(), ValidationError> {
        let value = value.into();
        self.mutate(|data| data.push(value))
    }

    pub fn insert(&mut self, index: usize, value: impl Into<TypedValue>) -> Result<(), ValidationError> {
        self.check_index(index, self.data.len() + 1)?;
        let value = value.into();
        self.mutate(|data| data.insert(index, value))
    }

    /// Replace the element at `index`, returning the old one
    pub fn set(&mut self, index: usize, value: impl Into<TypedValue>) -> Result<TypedValue, ValidationError> {
        self.check_index(index, self.data.len())?;
        let value = value.into();
        self.mutate(|data| std::mem::replace(&mut data[index], value))
    }

    pub fn remove(&mut self, index: usize) -> Result<TypedValue, ValidationError> {
        self.check_index(index, self.data.len())?;
        self.mutate(|data| data.remove(index))
    }

    pub fn pop(&mut self) -> Result<Option<TypedValue>, ValidationError> {
        self.mutate(Vec::pop)
    }

    pub fn clear(&mut self) -> Result<(), ValidationError> {
        self.mutate(Vec::clear)
    }

    pub fn extend<I, V>(&mut self, values: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = V>,
        V: Into<TypedValue>,
    {
        let values: Vec<TypedValue> = values.into_iter().map(Into::into).collect();
        self.mutate(|data| data.extend(values))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw elements, without revalidating
    pub fn raw(&self) -> Vec<Value> {
        self.data.iter().map(TypedValue::to_json).collect()
    }

    /// Typed element at `index`, revalidating first if dirty
    pub fn get(&mut self, index: usize) -> Result<Option<&TypedValue>, ValidationError> {
        self.validate()?;
        Ok(self.data.get(index))
    }

    /// Typed projection, revalidating first if dirty
    pub fn typed(&mut self) -> Result<&[TypedValue], ValidationError> {
        self.validate()?;
        Ok(&self.data)
    }

    /// Revalidate if any mutation happened since the last pass
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        if self.dirty {
            self.revalidate()?;
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of full revalidation passes run so far
    pub fn revalidation_count(&self) -> usize {
        self.revalidations
    }

    pub fn as_structure(&mut self) -> Result<Value, ValidationError> {
        self.validate()?;
        Ok(self.to_json())
    }

    pub fn serialize(&mut self) -> Result<String, ValidationError> {
        let structure = self.as_structure()?;
        serde_json::to_string(&structure).map_err(|e| ValidationError::new(e.to_string()))
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.raw())
    }

    fn revalidate(&mut self) -> Result<(), ValidationError> {
        let graph = self.ty.graph().clone();
        let array = array_of(&graph, &self.ty)?;
        let type_name = self.type_name();
        self.revalidations += 1;
        trace!(array = %type_name, len = self.data.len(), pass = self.revalidations, "revalidating array");

        for (i, item) in self.data.iter_mut().enumerate() {
            let target = match &array.items {
                ItemConstraint::Any => None,
                ItemConstraint::Uniform(id) => Some(*id),
                ItemConstraint::Tuple(ids) => ids.get(i).copied(),
            };
            if let Some(id) = target {
                coerce_in_place(&graph, id, item).map_err(|e| e.at(&i.to_string(), &type_name))?;
            }
        }

        if let ItemConstraint::Tuple(ids) = &array.items {
            if self.data.len() < ids.len() {
                return Err(ValidationError::new(format!(
                    "expected at least {} items, found {}",
                    ids.len(),
                    self.data.len()
                ))
                .in_type(&type_name));
            }
        }

        graph
            .registry()
            .validate(&array.keywords, &self.to_json())
            .map_err(|e| e.in_type(&type_name))?;

        self.dirty = false;
        Ok(())
    }
}

impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        canonical_string(&self.to_json()) == canonical_string(&other.to_json())
    }
}

impl fmt::Display for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.to_json())
    }
}
