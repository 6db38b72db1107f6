//! Pattern / additional-properties matching
//!
//! Decides which policy governs a property name that is not declared in
//! `properties`. `patternProperties` are consulted first, in declaration
//! order; only when no pattern matches does the object's extension policy
//! apply.

use std::sync::Arc;

use tracing::trace;

use crate::error::ValidationError;
use crate::graph::{ExtensionPolicy, ObjectType, PatternProperty, TypeGraph, TypeId};
use crate::runtime::{coerce, LiteralValue, TypedValue};

/// Policy selected for an undeclared property
#[derive(Debug, Clone, Copy)]
pub enum ExtensionMatch<'a> {
    /// First `patternProperties` entry whose regex matches the name
    Pattern(&'a PatternProperty),
    /// `additionalProperties: false`
    Sealed,
    /// Literal type inferred from the value
    Open,
    /// `additionalProperties: {schema}`
    Typed(TypeId),
}

/// Select the policy for `name` on `object`
pub fn match_extension<'a>(object: &'a ObjectType, name: &str) -> ExtensionMatch<'a> {
    if let Some(pattern) = object.patterns.iter().find(|p| p.regex.is_match(name)) {
        trace!(property = name, pattern = %pattern.pattern, "pattern property matched");
        return ExtensionMatch::Pattern(pattern);
    }

    match object.extension {
        ExtensionPolicy::Sealed => ExtensionMatch::Sealed,
        ExtensionPolicy::Open => ExtensionMatch::Open,
        ExtensionPolicy::Typed(id) => ExtensionMatch::Typed(id),
    }
}

/// Coerce `value` for the undeclared property `name`
pub(crate) fn classify(
    graph: &Arc<TypeGraph>,
    object: &ObjectType,
    name: &str,
    value: TypedValue,
) -> Result<TypedValue, ValidationError> {
    match match_extension(object, name) {
        ExtensionMatch::Pattern(pattern) => coerce(graph, pattern.type_id, value),
        ExtensionMatch::Typed(id) => coerce(graph, id, value),
        ExtensionMatch::Sealed => Err(ValidationError::new(format!(
            "additional property '{}' is not allowed",
            name
        ))),
        ExtensionMatch::Open => Ok(match value {
            TypedValue::Raw(raw) => {
                TypedValue::Literal(LiteralValue::inferred(raw, graph.registry().clone()))
            }
            typed => typed,
        }),
    }
}
