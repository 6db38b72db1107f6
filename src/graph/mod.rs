//! Type Graph
//!
//! The compiled form of a schema document: an arena of [`TypeDescriptor`]s
//! indexed by [`TypeId`], plus the Resolution Table mapping canonical URIs to
//! ids. Cycles are represented by `Reference` descriptors whose target is an
//! index into the same arena, valid once the build completes.
//!
//! A graph is immutable after [`builder::BuildSession`] produces it and is
//! shared read-only (`Arc<TypeGraph>`) by every runtime value.

pub mod analysis;
pub mod builder;
pub mod merge;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::BuildConfig;
use crate::names::uri_base_name;
use crate::validators::ValidatorRegistry;

pub use builder::BuildSession;

// =============================================================================
// Identifiers
// =============================================================================

/// Index of a descriptor in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Descriptors
// =============================================================================

/// Header shared by every descriptor variant
#[derive(Debug, Clone, Default)]
pub struct TypeMeta {
    /// Canonical URI the descriptor was built under
    pub uri: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
}

impl TypeMeta {
    pub(crate) fn from_node(uri: &str, node: &Map<String, Value>) -> Self {
        Self {
            uri: uri.to_string(),
            title: node.get("title").and_then(Value::as_str).map(String::from),
            description: node
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            default: node.get("default").cloned(),
        }
    }

    /// Title, or the last segment of the URI
    pub fn name(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| uri_base_name(&self.uri))
    }
}

/// Compiled representation of one schema node
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Object(ObjectType),
    Array(ArrayType),
    Literal(LiteralType),
    Union(UnionType),
    Reference(ReferenceType),
}

/// Coarse descriptor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Object,
    Array,
    Literal,
    Union,
    Reference,
}

impl TypeDescriptor {
    pub fn meta(&self) -> &TypeMeta {
        match self {
            Self::Object(t) => &t.meta,
            Self::Array(t) => &t.meta,
            Self::Literal(t) => &t.meta,
            Self::Union(t) => &t.meta,
            Self::Reference(t) => &t.meta,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Object(_) => TypeKind::Object,
            Self::Array(_) => TypeKind::Array,
            Self::Literal(_) => TypeKind::Literal,
            Self::Union(_) => TypeKind::Union,
            Self::Reference(_) => TypeKind::Reference,
        }
    }

    pub fn uri(&self) -> &str {
        &self.meta().uri
    }

    pub fn title(&self) -> Option<&str> {
        self.meta().title.as_deref()
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            Self::Array(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&LiteralType> {
        match self {
            Self::Literal(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionType> {
        match self {
            Self::Union(t) => Some(t),
            _ => None,
        }
    }

    /// Ids this descriptor points at directly
    pub fn children(&self) -> Vec<TypeId> {
        match self {
            Self::Object(t) => {
                let mut ids: Vec<TypeId> = t.properties.iter().map(|p| p.type_id).collect();
                ids.extend(t.patterns.iter().map(|p| p.type_id));
                if let ExtensionPolicy::Typed(id) = t.extension {
                    ids.push(id);
                }
                ids
            }
            Self::Array(t) => match &t.items {
                ItemConstraint::Any => Vec::new(),
                ItemConstraint::Uniform(id) => vec![*id],
                ItemConstraint::Tuple(ids) => ids.clone(),
            },
            Self::Literal(_) => Vec::new(),
            Self::Union(t) => t.candidates.clone(),
            Self::Reference(t) => vec![t.target],
        }
    }
}

/// A declared object property
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    /// Wire name, used for serialization and key-based access
    pub name: String,
    /// Sanitized accessor name
    pub accessor: String,
    pub type_id: TypeId,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

/// Policy for properties not declared in `properties`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPolicy {
    /// `additionalProperties: false`
    Sealed,
    /// `additionalProperties: true` or absent; literal type inferred from the value
    Open,
    /// `additionalProperties: {schema}`
    Typed(TypeId),
}

/// One `patternProperties` entry
#[derive(Debug, Clone)]
pub struct PatternProperty {
    pub pattern: String,
    pub regex: Regex,
    pub type_id: TypeId,
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub meta: TypeMeta,
    /// Declared properties, in declaration order
    pub properties: Vec<PropertyDescriptor>,
    /// Required wire names
    pub required: BTreeSet<String>,
    pub extension: ExtensionPolicy,
    /// Checked in order before `extension`
    pub patterns: Vec<PatternProperty>,
}

impl ObjectType {
    /// Look up a declared property by wire name or accessor
    ///
    /// An exact wire name wins over another property's accessor.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.properties.iter().find(|p| p.accessor == name))
    }

    pub fn has_required(&self) -> bool {
        !self.required.is_empty()
    }
}

/// Item typing for arrays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemConstraint {
    /// No `items`: elements pass through untouched
    Any,
    /// One schema for every element (a `oneOf` here is a per-element union)
    Uniform(TypeId),
    /// Positional typing; elements past the tuple pass through
    Tuple(Vec<TypeId>),
}

#[derive(Debug, Clone)]
pub struct ArrayType {
    pub meta: TypeMeta,
    pub items: ItemConstraint,
    /// `minItems` / `maxItems` / `uniqueItems`
    pub keywords: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct LiteralType {
    pub meta: TypeMeta,
    /// The full keyword-constraint set of the node
    pub keywords: Arc<Map<String, Value>>,
}

impl LiteralType {
    /// Whether the constraint set allows `null`
    pub fn admits_null(&self) -> bool {
        match self.keywords.get("type") {
            Some(Value::String(t)) => t == "null",
            Some(Value::Array(types)) => types.iter().any(|t| t == "null"),
            _ => {
                let enum_ok = self
                    .keywords
                    .get("enum")
                    .and_then(Value::as_array)
                    .map(|options| options.iter().any(Value::is_null))
                    .unwrap_or(true);
                let const_ok = self
                    .keywords
                    .get("const")
                    .map(Value::is_null)
                    .unwrap_or(true);
                enum_ok && const_ok
            }
        }
    }
}

/// Ordered candidates (`oneOf`, multi-typed primitives, `anyOf` use-first)
#[derive(Debug, Clone)]
pub struct UnionType {
    pub meta: TypeMeta,
    pub candidates: Vec<TypeId>,
}

/// Placeholder for a type that was still under construction when referenced
#[derive(Debug, Clone)]
pub struct ReferenceType {
    pub meta: TypeMeta,
    pub target: TypeId,
}

// =============================================================================
// Type Graph
// =============================================================================

/// Arena of compiled descriptors for one build session
pub struct TypeGraph {
    pub(crate) descriptors: Vec<TypeDescriptor>,
    pub(crate) by_uri: HashMap<String, TypeId>,
    pub(crate) root: Option<TypeId>,
    pub(crate) registry: Arc<ValidatorRegistry>,
    pub(crate) config: BuildConfig,
    pub(crate) fingerprint: String,
}

impl fmt::Debug for TypeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeGraph")
            .field("types", &self.descriptors.len())
            .field("root", &self.root)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl TypeGraph {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptor stored at `id` (may be a `Reference`)
    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.descriptors.get(id.0)
    }

    /// Follow `Reference` descriptors to the concrete type
    pub fn deref(&self, id: TypeId) -> TypeId {
        let mut current = id;
        for _ in 0..=self.descriptors.len() {
            match self.descriptors.get(current.0) {
                Some(TypeDescriptor::Reference(r)) => current = r.target,
                _ => return current,
            }
        }
        current
    }

    /// Concrete descriptor behind `id`
    pub fn resolve(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.get(self.deref(id))
    }

    /// Id bound to a canonical URI in the Resolution Table
    pub fn lookup(&self, uri: &str) -> Option<TypeId> {
        self.by_uri
            .get(uri)
            .or_else(|| self.by_uri.get(uri.strip_suffix('#').unwrap_or(uri)))
            .copied()
    }

    pub fn root(&self) -> Option<TypeId> {
        self.root
    }

    pub fn registry(&self) -> &Arc<ValidatorRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// SHA-256 of the canonical root document
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDescriptor)> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (TypeId(i), d))
    }

    /// All URIs in the Resolution Table, sorted
    pub fn uris(&self) -> Vec<&str> {
        let mut uris: Vec<&str> = self.by_uri.keys().map(String::as_str).collect();
        uris.sort();
        uris
    }

    /// Display name of a type (title, else last URI segment)
    pub fn type_name(&self, id: TypeId) -> String {
        self.resolve(id)
            .map(|d| d.meta().name())
            .unwrap_or_else(|| id.to_string())
    }

    /// Whether `null` is an acceptable value for `id`
    pub fn admits_null(&self, id: TypeId) -> bool {
        let mut visited = HashSet::new();
        self.admits_null_inner(id, &mut visited)
    }

    fn admits_null_inner(&self, id: TypeId, visited: &mut HashSet<TypeId>) -> bool {
        let id = self.deref(id);
        if !visited.insert(id) {
            return false;
        }
        match self.get(id) {
            Some(TypeDescriptor::Literal(lit)) => lit.admits_null(),
            Some(TypeDescriptor::Union(u)) => u
                .candidates
                .iter()
                .any(|c| self.admits_null_inner(*c, visited)),
            _ => false,
        }
    }

    /// Default declared on the concrete type, if any
    pub fn default_of(&self, id: TypeId) -> Option<&Value> {
        self.resolve(id).and_then(|d| d.meta().default.as_ref())
    }

    /// Structural summary of a descriptor
    ///
    /// Nested types are expanded once; revisits render as `{"$ref": uri}`.
    pub fn shape(&self, id: TypeId) -> Value {
        let mut visiting = HashSet::new();
        self.shape_inner(id, &mut visiting)
    }

    fn shape_inner(&self, id: TypeId, visiting: &mut HashSet<TypeId>) -> Value {
        let id = self.deref(id);
        let Some(descriptor) = self.get(id) else {
            return Value::Null;
        };
        if !visiting.insert(id) {
            return json!({ "$ref": descriptor.uri() });
        }

        let shape = match descriptor {
            TypeDescriptor::Object(obj) => {
                let properties: Map<String, Value> = obj
                    .properties
                    .iter()
                    .map(|p| (p.name.clone(), self.shape_inner(p.type_id, visiting)))
                    .collect();
                let patterns: Map<String, Value> = obj
                    .patterns
                    .iter()
                    .map(|p| (p.pattern.clone(), self.shape_inner(p.type_id, visiting)))
                    .collect();
                let extension = match obj.extension {
                    ExtensionPolicy::Sealed => json!("sealed"),
                    ExtensionPolicy::Open => json!("open"),
                    ExtensionPolicy::Typed(t) => self.shape_inner(t, visiting),
                };
                json!({
                    "kind": "object",
                    "name": descriptor.meta().name(),
                    "properties": properties,
                    "required": obj.required.iter().collect::<Vec<_>>(),
                    "patterns": patterns,
                    "extension": extension,
                })
            }
            TypeDescriptor::Array(arr) => {
                let items = match &arr.items {
                    ItemConstraint::Any => Value::Null,
                    ItemConstraint::Uniform(t) => self.shape_inner(*t, visiting),
                    ItemConstraint::Tuple(ts) => Value::Array(
                        ts.iter().map(|t| self.shape_inner(*t, visiting)).collect(),
                    ),
                };
                json!({ "kind": "array", "items": items, "keywords": arr.keywords })
            }
            TypeDescriptor::Literal(lit) => {
                json!({ "kind": "literal", "keywords": *lit.keywords })
            }
            TypeDescriptor::Union(u) => json!({
                "kind": "union",
                "candidates": u
                    .candidates
                    .iter()
                    .map(|c| self.shape_inner(*c, visiting))
                    .collect::<Vec<_>>(),
            }),
            TypeDescriptor::Reference(r) => json!({ "$ref": r.meta.uri }),
        };

        visiting.remove(&id);
        shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(uri: &str, keywords: Value) -> TypeDescriptor {
        TypeDescriptor::Literal(LiteralType {
            meta: TypeMeta {
                uri: uri.to_string(),
                ..Default::default()
            },
            keywords: Arc::new(keywords.as_object().cloned().unwrap_or_default()),
        })
    }

    fn graph(descriptors: Vec<TypeDescriptor>) -> TypeGraph {
        TypeGraph {
            descriptors,
            by_uri: HashMap::new(),
            root: None,
            registry: Arc::new(ValidatorRegistry::new()),
            config: BuildConfig::default(),
            fingerprint: String::new(),
        }
    }

    #[test]
    fn test_deref_follows_references() {
        let g = graph(vec![
            literal("a", json!({"type": "string"})),
            TypeDescriptor::Reference(ReferenceType {
                meta: TypeMeta::default(),
                target: TypeId(0),
            }),
        ]);
        assert_eq!(g.deref(TypeId(1)), TypeId(0));
        assert_eq!(g.resolve(TypeId(1)).map(|d| d.kind()), Some(TypeKind::Literal));
    }

    #[test]
    fn test_admits_null_through_union() {
        let g = graph(vec![
            literal("s", json!({"type": "string"})),
            literal("n", json!({"type": "null"})),
            TypeDescriptor::Union(UnionType {
                meta: TypeMeta::default(),
                candidates: vec![TypeId(0), TypeId(1)],
            }),
        ]);
        assert!(!g.admits_null(TypeId(0)));
        assert!(g.admits_null(TypeId(1)));
        assert!(g.admits_null(TypeId(2)));
    }

    #[test]
    fn test_literal_null_rules() {
        let lit = |v: Value| LiteralType {
            meta: TypeMeta::default(),
            keywords: Arc::new(v.as_object().cloned().unwrap()),
        };
        assert!(lit(json!({"type": ["integer", "null"]})).admits_null());
        assert!(lit(json!({"enum": ["a", null]})).admits_null());
        assert!(!lit(json!({"enum": ["a"]})).admits_null());
        assert!(lit(json!({})).admits_null());
    }
}
