//! Object instances
//!
//! An [`Instance`] holds the declared properties of one object type (keyed
//! by wire name, initially unset) plus an extension bucket for
//! undeclared ones. Every write goes through coercion; a failed write leaves
//! the previous value in place.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{SchemaError, ValidationError};
use crate::graph::{ObjectType, TypeGraph, TypeId};
use crate::json::canonical_string;
use crate::runtime::extension::classify;
use crate::runtime::{coerce, coerce_in_place, TypeHandle, TypedValue};

#[derive(Debug, Clone)]
pub struct Instance {
    ty: TypeHandle,
    /// wire name -> value, declared properties only
    properties: BTreeMap<String, TypedValue>,
    /// wire name -> value
    extensions: BTreeMap<String, TypedValue>,
}

fn object_of<'g>(graph: &'g Arc<TypeGraph>, handle: &TypeHandle) -> Result<&'g ObjectType, ValidationError> {
    graph
        .get(handle.id())
        .and_then(|d| d.as_object())
        .ok_or_else(|| ValidationError::new(format!("{} is not an object type", handle.name())))
}

fn is_null(value: &TypedValue) -> bool {
    match value {
        TypedValue::Raw(v) => v.is_null(),
        TypedValue::Literal(l) => l.is_null(),
        _ => false,
    }
}

impl Instance {
    /// Empty instance with declared defaults applied
    ///
    /// In strict builds a type with required properties is validated
    /// immediately, so this fails when a required property has no default.
    pub fn new(handle: TypeHandle) -> Result<Self, ValidationError> {
        Self::with_properties(handle, std::iter::empty::<(String, TypedValue)>())
    }

    /// Instance built from named properties (wire names or accessors)
    pub fn with_properties<I, K, V>(handle: TypeHandle, properties: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<TypedValue>,
    {
        let graph = handle.graph().clone();
        let object = object_of(&graph, &handle)?;

        let mut instance = Self {
            ty: handle,
            properties: BTreeMap::new(),
            extensions: BTreeMap::new(),
        };

        for prop in &object.properties {
            if let Some(default) = &prop.default {
                let value = coerce(&graph, prop.type_id, TypedValue::Raw(default.clone()))
                    .map_err(|e| e.at(&prop.name, &instance.type_name()))?;
                instance.properties.insert(prop.name.clone(), value);
            }
        }

        for (name, value) in properties {
            let name: String = name.into();
            instance.set(&name, value)?;
        }

        if graph.config().strict && object.has_required() {
            instance.validate()?;
        }
        Ok(instance)
    }

    /// Parse, construct and validate
    pub fn from_json(handle: &TypeHandle, text: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(text)?;
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(ValidationError::new(format!("{} is not an object", other))
                    .in_type(&handle.name())
                    .into())
            }
        };
        let mut instance = Self::with_properties(handle.clone(), map)?;
        instance.validate()?;
        Ok(instance)
    }

    pub fn handle(&self) -> &TypeHandle {
        &self.ty
    }

    pub fn type_id(&self) -> TypeId {
        self.ty.id()
    }

    pub fn type_name(&self) -> String {
        self.ty.name()
    }

    // =========================================================================
    // Property access
    // =========================================================================

    /// Stored value by wire name or accessor; `None` when unset
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        let graph = self.ty.graph();
        match object_of(graph, &self.ty).ok().and_then(|o| o.property(name)) {
            Some(prop) => self.properties.get(&prop.name),
            None => self.extensions.get(name),
        }
    }

    /// Mutable access to a stored value
    ///
    /// Writes through this reference bypass coercion until the next
    /// [`validate`](Self::validate).
    pub fn get_mut(&mut self, name: &str) -> Option<&mut TypedValue> {
        let graph = self.ty.graph().clone();
        match object_of(&graph, &self.ty).ok().and_then(|o| o.property(name)) {
            Some(prop) => self.properties.get_mut(&prop.name),
            None => self.extensions.get_mut(name),
        }
    }

    /// Coerce and store a property
    ///
    /// Declared properties coerce to their declared type; `null` on a
    /// property with a non-null default restores the default. Undeclared
    /// names go through pattern / additional-properties matching.
    pub fn set(&mut self, name: &str, value: impl Into<TypedValue>) -> Result<(), ValidationError> {
        let graph = self.ty.graph().clone();
        let object = object_of(&graph, &self.ty)?;
        let type_name = self.type_name();
        let value = value.into();

        match object.property(name) {
            Some(prop) => {
                let value = match &prop.default {
                    Some(default) if is_null(&value) && !default.is_null() => TypedValue::Raw(default.clone()),
                    _ => value,
                };
                let coerced = coerce(&graph, prop.type_id, value).map_err(|e| e.at(&prop.name, &type_name))?;
                self.properties.insert(prop.name.clone(), coerced);
            }
            None => {
                let coerced = classify(&graph, object, name, value).map_err(|e| e.at(name, &type_name))?;
                self.extensions.insert(name.to_string(), coerced);
            }
        }
        Ok(())
    }

    /// Store a raw value without validation
    pub fn set_raw(&mut self, name: &str, value: Value) {
        let graph = self.ty.graph().clone();
        match object_of(&graph, &self.ty).ok().and_then(|o| o.property(name)) {
            Some(prop) => {
                self.properties.insert(prop.name.clone(), TypedValue::Raw(value));
            }
            None => {
                self.extensions.insert(name.to_string(), TypedValue::Raw(value));
            }
        }
    }

    /// Unset a property
    ///
    /// Required properties cannot be deleted; extensions are removed outright.
    pub fn delete(&mut self, name: &str) -> Result<Option<TypedValue>, ValidationError> {
        let graph = self.ty.graph().clone();
        let object = object_of(&graph, &self.ty)?;

        match object.property(name) {
            Some(prop) if prop.required => Err(ValidationError::new("cannot delete a required property")
                .at(&prop.name, &self.type_name())),
            Some(prop) => Ok(self.properties.remove(&prop.name)),
            None => Ok(self.extensions.remove(name)),
        }
    }

    /// Whether the property is currently set
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Wire names of set properties: declared order, then extensions
    pub fn keys(&self) -> Vec<String> {
        self.entries().map(|(name, _)| name.to_string()).collect()
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        let declared: Vec<(&str, &TypedValue)> = object_of(self.ty.graph(), &self.ty)
            .map(|object| {
                object
                    .properties
                    .iter()
                    .filter_map(|p| self.properties.get(&p.name).map(|v| (p.name.as_str(), v)))
                    .collect()
            })
            .unwrap_or_default();

        declared
            .into_iter()
            .chain(self.extensions.iter().map(|(k, v)| (k.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.properties.len() + self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Validation and output
    // =========================================================================

    /// Coerce every set property, then check required ones
    ///
    /// A required property is missing when it is unset and its type does
    /// not admit `null`.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        let graph = self.ty.graph().clone();
        let object = object_of(&graph, &self.ty)?;
        let type_name = self.type_name();

        for prop in &object.properties {
            if let Some(slot) = self.properties.get_mut(&prop.name) {
                coerce_in_place(&graph, prop.type_id, slot).map_err(|e| e.at(&prop.name, &type_name))?;
            }
        }

        for (name, slot) in self.extensions.iter_mut() {
            *slot = classify(&graph, object, name, slot.clone()).map_err(|e| e.at(name, &type_name))?;
        }

        let missing: Vec<&str> = object
            .properties
            .iter()
            .filter(|p| p.required && !self.properties.contains_key(&p.name))
            .filter(|p| !graph.admits_null(p.type_id))
            .map(|p| p.name.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(ValidationError::new(format!(
                "missing required properties: {}",
                missing.join(", ")
            ))
            .in_type(&type_name));
        }
        Ok(())
    }

    /// Validate, then project to plain JSON
    pub fn as_structure(&mut self) -> Result<Value, ValidationError> {
        self.validate()?;
        Ok(self.to_json())
    }

    /// Validate, then emit JSON text
    pub fn serialize(&mut self) -> Result<String, ValidationError> {
        let structure = self.as_structure()?;
        serde_json::to_string(&structure).map_err(|e| ValidationError::new(e.to_string()))
    }

    /// Plain JSON projection without validation; unset properties are omitted
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        canonical_string(&self.to_json()) == canonical_string(&other.to_json())
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.to_json())
    }
}
