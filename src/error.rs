//! Error types for schema compilation and runtime validation

use std::fmt;

use thiserror::Error;

/// Result type for build-time operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Build-time (and round-trip) errors
///
/// Build errors are always fatal: no partial type graph is returned.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unresolvable reference '{uri}': {reason}")]
    Resolution { uri: String, reason: String },

    #[error("Schema definition error in '{uri}': {message}")]
    Definition { uri: String, message: String },

    #[error("Unsupported feature in '{uri}': {feature}")]
    Unsupported { uri: String, feature: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Schema failed meta-validation: {0}")]
    MetaSchema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    pub(crate) fn resolution(uri: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Resolution {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn definition(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Definition {
            uri: uri.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(uri: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            uri: uri.into(),
            feature: feature.into(),
        }
    }

    /// The runtime validation error, if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// A runtime constraint violation
///
/// Raised synchronously by every mutating operation on instances and arrays.
/// A failed operation never leaves the target half-updated.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    /// Property being assigned or validated, if any
    pub property: Option<String>,
    /// Owning type name, if known
    pub type_name: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            property: None,
            type_name: None,
        }
    }

    /// Annotate with the property and owning type
    ///
    /// Nested annotations build a dotted path rooted at the outermost type.
    pub fn at(mut self, property: &str, type_name: &str) -> Self {
        self.property = Some(match self.property.take() {
            Some(inner) => format!("{}.{}", property, inner),
            None => property.to_string(),
        });
        self.type_name = Some(type_name.to_string());
        self
    }

    pub fn in_type(mut self, type_name: &str) -> Self {
        if self.type_name.is_none() {
            self.type_name = Some(type_name.to_string());
        }
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.type_name, &self.property) {
            (Some(ty), Some(prop)) => write!(f, "{}.{}: {}", ty, prop, self.message),
            (Some(ty), None) => write!(f, "{}: {}", ty, self.message),
            (None, Some(prop)) => write!(f, "{}: {}", prop, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_nests_properties() {
        let err = ValidationError::new("-1 was less than 0")
            .at("age", "Person")
            .at("owner", "Pet");
        assert_eq!(err.property.as_deref(), Some("owner.age"));
        assert_eq!(err.type_name.as_deref(), Some("Pet"));
        assert_eq!(err.to_string(), "Pet.owner.age: -1 was less than 0");
    }

    #[test]
    fn test_validation_converts_into_schema_error() {
        let err: SchemaError = ValidationError::new("bad").into();
        assert!(err.as_validation().is_some());
    }
}
