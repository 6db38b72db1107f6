//! Object Builder
//!
//! Entry point for turning a schema document into constructible types:
//! meta-validate the document, run one [`BuildSession`] over it, then export
//! the compiled types into a [`Namespace`].

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{BuildConfig, DraftVersion, ObjectsConfig};
use crate::error::{Result, SchemaError};
use crate::graph::{BuildSession, TypeDescriptor, TypeGraph};
use crate::names::{standardize, uri_base_name};
use crate::resolver::{DocumentResolver, Resolver, DEFAULT_BASE_URI};
use crate::runtime::TypeHandle;
use crate::validators::ValidatorRegistry;

/// Compiles one schema document into a [`Namespace`]
pub struct ObjectBuilder {
    schema: Value,
    base_uri: String,
    resolver: Arc<dyn Resolver>,
    registry: Arc<ValidatorRegistry>,
    config: ObjectsConfig,
}

impl fmt::Debug for ObjectBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBuilder")
            .field("base_uri", &self.base_uri)
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ObjectBuilder {
    /// Builder over an in-memory document with default configuration
    pub fn new(schema: Value) -> Result<Self> {
        Self::with_config(schema, ObjectsConfig::default())
    }

    /// Builder over an in-memory document
    ///
    /// The document is meta-validated here unless
    /// `validation.meta_validate` is off. Its base URI is `$id` (or `id`)
    /// when present.
    pub fn with_config(schema: Value, config: ObjectsConfig) -> Result<Self> {
        if config.validation.meta_validate {
            meta_validate(&schema, config.validation.default_draft)?;
        }

        let base_uri = schema
            .get("$id")
            .or_else(|| schema.get("id"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BASE_URI)
            .to_string();

        let registry = if config.validation.formats {
            ValidatorRegistry::new()
        } else {
            ValidatorRegistry::minimal()
        };

        Ok(Self {
            schema,
            base_uri,
            resolver: Arc::new(DocumentResolver::new()),
            registry: Arc::new(registry),
            config,
        })
    }

    /// Builder over a schema file; relative `file:` references resolve
    /// against its directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_config(path, ObjectsConfig::default())
    }

    pub fn from_file_with_config(path: impl AsRef<Path>, config: ObjectsConfig) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let schema: Value = serde_json::from_str(&content)?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SchemaError::resolution(path.display().to_string(), "not a file path"))?;
        let has_id = schema.get("$id").or_else(|| schema.get("id")).is_some();

        let mut builder = Self::with_config(schema, config)?;
        builder.resolver = Arc::new(DocumentResolver::new().with_base_dir(dir));
        if !has_id {
            builder.base_uri = format!("file:{}", file_name);
        }
        debug!(path = %path.display(), base = %builder.base_uri, "loaded schema file");
        Ok(builder)
    }

    /// Use a different resolver for `$ref` documents
    pub fn resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Use a different validator registry
    pub fn registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Override the document's base URI
    pub fn base_uri(mut self, uri: impl Into<String>) -> Self {
        self.base_uri = uri.into();
        self
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn config(&self) -> &ObjectsConfig {
        &self.config
    }

    /// Build with the configured build options
    pub fn build_classes(&self) -> Result<Namespace> {
        self.build_with(self.config.build.clone())
    }

    /// Build with explicit build options
    pub fn build_with(&self, config: BuildConfig) -> Result<Namespace> {
        let graph = self.build_graph(config)?;
        let namespace = Namespace::export(graph);
        info!(types = namespace.len(), "built namespace");
        Ok(namespace)
    }

    /// Compile the type graph without exporting names
    pub fn build_graph(&self, config: BuildConfig) -> Result<Arc<TypeGraph>> {
        let session = BuildSession::new(&*self.resolver, self.registry.clone(), config);
        let graph = session.build_document(&self.base_uri, &self.schema)?;
        Ok(Arc::new(graph))
    }
}

/// Validate `schema` against its draft's meta-schema
fn meta_validate(schema: &Value, fallback: DraftVersion) -> Result<()> {
    let draft = match schema.get("$schema").and_then(Value::as_str) {
        None => fallback,
        Some(uri) => DraftVersion::from_schema_uri(uri).unwrap_or_else(|| {
            warn!(schema = uri, draft = ?fallback, "unrecognized $schema, using default draft");
            fallback
        }),
    };

    JSONSchema::options()
        .with_draft(draft.as_jsonschema())
        .compile(schema)
        .map(|_| ())
        .map_err(|e| SchemaError::MetaSchema(e.to_string()))
}

// =============================================================================
// Namespace
// =============================================================================

/// Exported type names mapped to constructible handles
#[derive(Debug, Clone)]
pub struct Namespace {
    types: BTreeMap<String, TypeHandle>,
    root: Option<TypeHandle>,
}

impl Namespace {
    /// Export every concrete type of `graph`
    ///
    /// Titled types export under their title, untitled ones under the last
    /// URI segment (skipped when `named_only`). Titled entries win name
    /// collisions; otherwise the first type built keeps the name.
    pub fn export(graph: Arc<TypeGraph>) -> Self {
        let config = graph.config().clone();
        let mut types: BTreeMap<String, TypeHandle> = BTreeMap::new();
        let mut titled: BTreeMap<String, bool> = BTreeMap::new();

        for (id, descriptor) in graph.iter() {
            if matches!(descriptor, TypeDescriptor::Reference(_)) {
                continue;
            }

            let meta = descriptor.meta();
            let is_titled = meta.title.is_some();
            let raw = match &meta.title {
                Some(title) => title.clone(),
                None if config.named_only => continue,
                None => uri_base_name(&meta.uri),
            };
            let name = if config.standardize_names {
                standardize(&raw)
            } else {
                raw
            };

            let exportable = name
                .chars()
                .next()
                .map(|c| c.is_alphabetic() || c == '_')
                .unwrap_or(false);
            if !exportable {
                continue;
            }

            let replace = match titled.get(&name) {
                None => true,
                Some(existing_titled) => is_titled && !existing_titled,
            };
            if replace {
                types.insert(name.clone(), TypeHandle::new(graph.clone(), id));
                titled.insert(name, is_titled);
            }
        }

        let root = graph.root().map(|id| TypeHandle::new(graph.clone(), id));
        Self { types, root }
    }

    pub fn get(&self, name: &str) -> Option<&TypeHandle> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Exported names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, TypeHandle> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Handle for the document's root type
    pub fn root(&self) -> Option<&TypeHandle> {
        self.root.as_ref()
    }

    /// Graph shared by every handle in this namespace
    pub fn graph(&self) -> Option<&Arc<TypeGraph>> {
        self.root.as_ref().map(TypeHandle::graph)
    }
}

impl<'a> IntoIterator for &'a Namespace {
    type Item = (&'a String, &'a TypeHandle);
    type IntoIter = btree_map::Iter<'a, String, TypeHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use serde_json::json;

    #[test]
    fn test_export_names() {
        let ns = ObjectBuilder::new(json!({
            "title": "Example Schema",
            "type": "object",
            "definitions": {
                "home-address": {"type": "object"},
                "Other": {"title": "MyObj1", "type": "string"}
            },
            "properties": {"name": {"type": "string"}}
        }))
        .unwrap()
        .build_classes()
        .unwrap();

        assert!(ns.contains("ExampleSchema"));
        assert!(ns.contains("HomeAddress"));
        assert!(ns.contains("Myobj1"));
        assert!(ns.contains("Name"));
        assert_eq!(ns.root().map(TypeHandle::name), Some("Example Schema".to_string()));
    }

    #[test]
    fn test_named_only() {
        let builder = ObjectBuilder::new(json!({
            "title": "Root",
            "type": "object",
            "properties": {"name": {"type": "string"}, "tag": {"title": "Tag", "type": "string"}}
        }))
        .unwrap();
        let ns = builder.build_with(BuildConfig::default().named_only(true)).unwrap();
        assert_eq!(ns.names(), vec!["Root", "Tag"]);
    }

    #[test]
    fn test_without_standardizing() {
        let ns = ObjectBuilder::new(json!({"title": "Example Schema", "type": "object"}))
            .unwrap()
            .build_with(BuildConfig::default().standardize_names(false))
            .unwrap();
        assert!(ns.contains("Example Schema"));
    }

    #[test]
    fn test_titled_wins_collision() {
        let ns = ObjectBuilder::new(json!({
            "title": "Root",
            "type": "object",
            "properties": {
                "person": {"type": "integer"},
                "other": {"title": "Person", "type": "object"}
            }
        }))
        .unwrap()
        .build_classes()
        .unwrap();
        let person = ns.get("Person").unwrap();
        assert_eq!(person.descriptor().map(|d| d.title()), Some(Some("Person")));
    }

    #[test]
    fn test_meta_validation() {
        let err = ObjectBuilder::new(json!({"title": "Bad", "type": 5})).unwrap_err();
        assert!(matches!(err, SchemaError::MetaSchema(_)));

        let config = ObjectsConfig {
            validation: ValidationConfig {
                meta_validate: false,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(ObjectBuilder::with_config(json!({"title": "Bad", "minimum": "x"}), config).is_ok());
    }

    #[test]
    fn test_id_sets_base_uri() {
        let builder = ObjectBuilder::new(json!({
            "$id": "http://example.com/person.json",
            "type": "object"
        }))
        .unwrap();
        let graph = builder.build_graph(BuildConfig::default()).unwrap();
        assert_eq!(graph.lookup("http://example.com/person.json"), graph.root());
    }
}
