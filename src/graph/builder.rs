//! Type Graph Builder
//!
//! A [`BuildSession`] walks one schema document and compiles every node into
//! the arena. It owns the Resolution Table (URI -> id) and the in-progress
//! set; nothing is shared between sessions.
//!
//! Dispatch order for a node:
//! 1. `$ref` (aliases the URI to the target; in-progress targets yield a
//!    `Reference` placeholder)
//! 2. `allOf` (branches merged into one node, then dispatched again)
//! 3. `oneOf` -> `Union`
//! 4. `anyOf` -> unsupported unless `any_of = "use-first"`
//! 5. arrays, 6. objects, 7. literals / `enum` / `const`
//! 8. multi-typed nodes -> `Union` of single-typed clones
//! 9. `{}` / `true` -> unconstrained literal

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use super::merge::merge_schemas;
use super::{
    ArrayType, ExtensionPolicy, ItemConstraint, LiteralType, ObjectType, PatternProperty,
    PropertyDescriptor, ReferenceType, TypeDescriptor, TypeGraph, TypeId, TypeMeta, UnionType,
};
use crate::config::{AnyOfPolicy, BuildConfig};
use crate::error::{Result, SchemaError};
use crate::json::canonical_string;
use crate::names::{parameterize, sanitize_accessor};
use crate::resolver::{
    canonicalize_uri, join_uri, resolve_fragment, split_fragment, Resolver, DEFAULT_BASE_URI,
};
use crate::validators::ValidatorRegistry;

const ARRAY_KEYWORDS: &[&str] = &["minItems", "maxItems", "uniqueItems"];
const OBJECT_MARKERS: &[&str] = &["properties", "additionalProperties", "patternProperties"];
// Keys holding data rather than subschemas
const DATA_KEYWORDS: &[&str] = &["enum", "const", "default", "examples"];
// Keys mapping user-chosen names to subschemas
const NAMED_SCHEMA_MAPS: &[&str] = &["properties", "patternProperties", "definitions", "$defs"];

/// One compilation of one schema document
pub struct BuildSession<'r> {
    resolver: &'r dyn Resolver,
    registry: Arc<ValidatorRegistry>,
    config: BuildConfig,
    /// Arena slots; `None` while a type is under construction
    slots: Vec<Option<TypeDescriptor>>,
    /// Resolution Table
    resolved: HashMap<String, TypeId>,
    in_progress: HashSet<String>,
    /// target -> its `Reference` placeholder
    placeholders: HashMap<TypeId, TypeId>,
    documents: HashMap<String, Arc<Value>>,
    base_stack: Vec<String>,
    /// `$ref` targets currently being followed
    ref_chain: Vec<String>,
    /// (document URI, root type URI) of the document being built
    root_alias: Option<(String, String)>,
}

impl<'r> BuildSession<'r> {
    pub fn new(resolver: &'r dyn Resolver, registry: Arc<ValidatorRegistry>, config: BuildConfig) -> Self {
        Self {
            resolver,
            registry,
            config,
            slots: Vec::new(),
            resolved: HashMap::new(),
            in_progress: HashSet::new(),
            placeholders: HashMap::new(),
            documents: HashMap::new(),
            base_stack: Vec::new(),
            ref_chain: Vec::new(),
            root_alias: None,
        }
    }

    /// Compile `document` (found at `base_uri`) into a type graph
    ///
    /// Definitions are compiled first, then the root. Any error aborts the
    /// whole build.
    pub fn build_document(mut self, base_uri: &str, document: &Value) -> Result<TypeGraph> {
        let base = canonicalize_uri(base_uri);
        let root_uri = root_type_uri(document);
        debug!(base = %base, root = %root_uri, "building type graph");

        self.documents.insert(base.clone(), Arc::new(document.clone()));
        self.base_stack.push(base.clone());
        self.root_alias = Some((base.clone(), root_uri.clone()));

        for key in ["definitions", "$defs"] {
            if let Some(definitions) = document.get(key).and_then(Value::as_object) {
                for (name, definition) in definitions {
                    let uri = format!("{}#/{}/{}", base, key, name);
                    self.resolve(&uri, definition)?;
                }
            }
        }

        let root = self.resolve_with_aliases(&root_uri, &[base], document)?;
        self.finish(Some(root), document)
    }

    /// Resolve `node` under `uri`, memoized
    pub fn resolve(&mut self, uri: &str, node: &Value) -> Result<TypeId> {
        self.resolve_with_aliases(uri, &[], node)
    }

    fn base(&self) -> &str {
        self.base_stack
            .last()
            .map(String::as_str)
            .unwrap_or(DEFAULT_BASE_URI)
    }

    fn reserve(&mut self) -> TypeId {
        self.slots.push(None);
        TypeId(self.slots.len() - 1)
    }

    /// Id already bound to `uri`, or a placeholder when it is still building
    fn bound(&mut self, uri: &str) -> Option<TypeId> {
        let target = *self.resolved.get(uri)?;
        if !self.in_progress.contains(uri) {
            return Some(target);
        }
        if let Some(&placeholder) = self.placeholders.get(&target) {
            return Some(placeholder);
        }

        debug!(uri, target = %target, "circular reference, binding placeholder");
        let placeholder = self.reserve();
        self.slots[placeholder.0] = Some(TypeDescriptor::Reference(ReferenceType {
            meta: TypeMeta {
                uri: uri.to_string(),
                ..Default::default()
            },
            target,
        }));
        self.placeholders.insert(target, placeholder);
        Some(placeholder)
    }

    fn resolve_with_aliases(&mut self, uri: &str, aliases: &[String], node: &Value) -> Result<TypeId> {
        let uri = canonicalize_uri(uri);
        if let Some(id) = self.bound(&uri) {
            return Ok(id);
        }

        let empty = Map::new();
        let map = match node {
            Value::Object(map) => map,
            Value::Bool(true) => &empty,
            Value::Bool(false) => {
                return Err(SchemaError::definition(uri, "the `false` schema admits no values"))
            }
            _ => return Err(SchemaError::definition(uri, "schema node must be an object or boolean")),
        };

        if let Some(reference) = map.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| SchemaError::definition(&uri, "`$ref` must be a string"))?;
            let target = join_uri(self.base(), reference);
            let id = self.resolve_ref(&target)?;
            self.resolved.insert(uri, id);
            for alias in aliases {
                self.resolved.insert(alias.clone(), id);
            }
            return Ok(id);
        }

        let id = self.reserve();
        trace!(uri = %uri, id = %id, "building type");
        self.resolved.insert(uri.clone(), id);
        self.in_progress.insert(uri.clone());
        for alias in aliases {
            self.resolved.insert(alias.clone(), id);
            self.in_progress.insert(alias.clone());
        }

        let built = self.build_node(&uri, map);

        self.in_progress.remove(&uri);
        for alias in aliases {
            self.in_progress.remove(alias);
        }

        self.slots[id.0] = Some(built?);
        Ok(id)
    }

    /// Follow a `$ref` target URI
    fn resolve_ref(&mut self, target: &str) -> Result<TypeId> {
        if let Some(id) = self.bound(target) {
            return Ok(id);
        }
        if self.ref_chain.iter().any(|t| t == target) {
            return Err(SchemaError::definition(
                target,
                "`$ref` chain never reaches a concrete schema",
            ));
        }

        let (doc_uri, fragment) = split_fragment(target);
        let document = self.document(doc_uri)?;

        if let Some((base, root_uri)) = self.root_alias.clone() {
            if fragment.is_empty() && doc_uri == base {
                return self.resolve_with_aliases(&root_uri, &[base], &document);
            }
        }

        let node = resolve_fragment(&document, fragment)
            .cloned()
            .ok_or_else(|| SchemaError::resolution(target, "fragment does not exist in document"))?;

        debug!(target, "resolving $ref");
        self.ref_chain.push(target.to_string());
        self.base_stack.push(doc_uri.to_string());
        let result = self.resolve(target, &node);
        self.base_stack.pop();
        self.ref_chain.pop();
        result
    }

    fn document(&mut self, uri: &str) -> Result<Arc<Value>> {
        if let Some(doc) = self.documents.get(uri) {
            return Ok(doc.clone());
        }
        let doc = Arc::new(self.resolver.resolve(uri)?);
        debug!(uri, "fetched schema document");
        self.documents.insert(uri.to_string(), doc.clone());
        Ok(doc)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn build_node(&mut self, uri: &str, map: &Map<String, Value>) -> Result<TypeDescriptor> {
        if map.contains_key("allOf") {
            let mut chain = Vec::new();
            let flattened = self.flatten_all_of(uri, map, &mut chain)?;
            return self.build_node(uri, &flattened);
        }

        if let Some(candidates) = map.get("oneOf") {
            return self.build_union(uri, map, candidates, "oneOf");
        }

        if let Some(candidates) = map.get("anyOf") {
            return match self.config.any_of {
                AnyOfPolicy::Unset => Err(SchemaError::unsupported(
                    uri,
                    "anyOf (build with any_of = \"use-first\" to select the first candidate)",
                )),
                AnyOfPolicy::UseFirst => self.build_union(uri, map, candidates, "anyOf"),
            };
        }

        let type_value = map.get("type");
        let type_name = type_value.and_then(Value::as_str);

        if type_name == Some("array") || (type_value.is_none() && map.contains_key("items")) {
            return self.build_array(uri, map);
        }

        if type_name == Some("object")
            || (type_value.is_none() && OBJECT_MARKERS.iter().any(|k| map.contains_key(*k)))
        {
            return self.build_object(uri, map);
        }

        if type_name.is_some()
            || (type_value.is_none() && (map.contains_key("enum") || map.contains_key("const")))
        {
            return Ok(self.build_literal(uri, map));
        }

        match type_value {
            Some(Value::Array(types)) => self.build_multi_type(uri, map, types),
            Some(_) => Err(SchemaError::definition(uri, "`type` must be a string or an array")),
            None => Ok(self.build_literal(uri, map)),
        }
    }

    fn build_literal(&self, uri: &str, map: &Map<String, Value>) -> TypeDescriptor {
        TypeDescriptor::Literal(LiteralType {
            meta: TypeMeta::from_node(uri, map),
            keywords: Arc::new(map.clone()),
        })
    }

    fn build_union(
        &mut self,
        uri: &str,
        map: &Map<String, Value>,
        candidates: &Value,
        keyword: &str,
    ) -> Result<TypeDescriptor> {
        let list = candidates
            .as_array()
            .filter(|list| !list.is_empty())
            .ok_or_else(|| SchemaError::definition(uri, format!("`{}` must be a non-empty array", keyword)))?;

        // use-first: later anyOf candidates are never consulted
        let considered = if keyword == "anyOf" { &list[..1] } else { &list[..] };

        let mut ids = Vec::with_capacity(considered.len());
        for (i, candidate) in considered.iter().enumerate() {
            ids.push(self.resolve(&format!("{}_{}", uri, i), candidate)?);
        }

        Ok(TypeDescriptor::Union(UnionType {
            meta: TypeMeta::from_node(uri, map),
            candidates: ids,
        }))
    }

    fn build_multi_type(
        &mut self,
        uri: &str,
        map: &Map<String, Value>,
        types: &[Value],
    ) -> Result<TypeDescriptor> {
        let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
        if names.len() != types.len() {
            return Err(SchemaError::definition(uri, "`type` entries must be strings"));
        }

        if let [single] = names.as_slice() {
            let mut narrowed = map.clone();
            narrowed.insert("type".into(), Value::String(single.to_string()));
            return self.build_node(uri, &narrowed);
        }
        if names.is_empty() {
            let mut unconstrained = map.clone();
            unconstrained.remove("type");
            return Ok(self.build_literal(uri, &unconstrained));
        }

        let mut candidates = Vec::with_capacity(names.len());
        for name in names {
            let mut narrowed = map.clone();
            narrowed.insert("type".into(), Value::String(name.to_string()));
            narrowed.remove("title");
            candidates.push(self.resolve(&format!("{}_{}", uri, name), &Value::Object(narrowed))?);
        }

        Ok(TypeDescriptor::Union(UnionType {
            meta: TypeMeta::from_node(uri, map),
            candidates,
        }))
    }

    fn build_array(&mut self, uri: &str, map: &Map<String, Value>) -> Result<TypeDescriptor> {
        let items = match map.get("items") {
            None | Some(Value::Bool(true)) => ItemConstraint::Any,
            Some(Value::Array(schemas)) => {
                let mut ids = Vec::with_capacity(schemas.len());
                for (i, schema) in schemas.iter().enumerate() {
                    ids.push(self.resolve(&format!("{}/items/{}", uri, i), schema)?);
                }
                ItemConstraint::Tuple(ids)
            }
            Some(schema @ Value::Object(_)) => {
                ItemConstraint::Uniform(self.resolve(&format!("{}/items", uri), schema)?)
            }
            Some(_) => {
                return Err(SchemaError::definition(
                    uri,
                    "`items` must be a schema or an array of schemas",
                ))
            }
        };

        let keywords: Map<String, Value> = ARRAY_KEYWORDS
            .iter()
            .filter_map(|k| map.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect();

        Ok(TypeDescriptor::Array(ArrayType {
            meta: TypeMeta::from_node(uri, map),
            items,
            keywords,
        }))
    }

    fn build_object(&mut self, uri: &str, map: &Map<String, Value>) -> Result<TypeDescriptor> {
        let empty = Map::new();
        let declared = match map.get("properties") {
            None => &empty,
            Some(Value::Object(props)) => props,
            Some(_) => return Err(SchemaError::definition(uri, "`properties` must be an object")),
        };

        let required: Vec<String> = match map.get("required") {
            None => Vec::new(),
            Some(Value::Array(names)) => {
                let mut out = Vec::with_capacity(names.len());
                for name in names {
                    let name = name.as_str().ok_or_else(|| {
                        SchemaError::definition(uri, "`required` entries must be strings")
                    })?;
                    out.push(name.to_string());
                }
                out
            }
            Some(_) => return Err(SchemaError::definition(uri, "`required` must be an array")),
        };

        if let Some(missing) = required.iter().find(|name| !declared.contains_key(*name)) {
            return Err(SchemaError::definition(
                uri,
                format!("required property '{}' is not declared in properties", missing),
            ));
        }

        let mut properties = Vec::with_capacity(declared.len());
        for (name, schema) in declared {
            let type_id = self.resolve(&format!("{}/{}", uri, name), schema)?;
            properties.push(PropertyDescriptor {
                name: name.clone(),
                accessor: sanitize_accessor(name),
                type_id,
                required: required.contains(name),
                default: schema.get("default").cloned(),
                description: schema
                    .get("description")
                    .and_then(Value::as_str)
                    .map(String::from),
            });
        }

        let extension = match map.get("additionalProperties") {
            None | Some(Value::Bool(true)) => ExtensionPolicy::Open,
            Some(Value::Bool(false)) => ExtensionPolicy::Sealed,
            Some(schema @ Value::Object(_)) => ExtensionPolicy::Typed(
                self.resolve(&format!("{}/additionalProperties", uri), schema)?,
            ),
            Some(_) => {
                return Err(SchemaError::definition(
                    uri,
                    "`additionalProperties` must be a boolean or a schema",
                ))
            }
        };

        let mut patterns = Vec::new();
        match map.get("patternProperties") {
            None => {}
            Some(Value::Object(entries)) => {
                for (i, (pattern, schema)) in entries.iter().enumerate() {
                    let regex = Regex::new(pattern).map_err(|e| {
                        SchemaError::definition(uri, format!("invalid pattern '{}': {}", pattern, e))
                    })?;
                    let type_id = self.resolve(&format!("{}/patternProperties/{}", uri, i), schema)?;
                    patterns.push(PatternProperty {
                        pattern: pattern.clone(),
                        regex,
                        type_id,
                    });
                }
            }
            Some(_) => {
                return Err(SchemaError::definition(uri, "`patternProperties` must be an object"))
            }
        }

        Ok(TypeDescriptor::Object(ObjectType {
            meta: TypeMeta::from_node(uri, map),
            properties,
            required: required.into_iter().collect(),
            extension,
            patterns,
        }))
    }

    // =========================================================================
    // allOf
    // =========================================================================

    /// Merge every `allOf` branch and the node's own keywords into one node
    fn flatten_all_of(
        &mut self,
        uri: &str,
        map: &Map<String, Value>,
        chain: &mut Vec<String>,
    ) -> Result<Map<String, Value>> {
        let branches = match map.get("allOf") {
            None => return Ok(map.clone()),
            Some(Value::Array(branches)) => branches,
            Some(_) => return Err(SchemaError::definition(uri, "`allOf` must be an array")),
        };

        let mut merged = Map::new();
        for branch in branches {
            let raw = self.all_of_branch(uri, branch, chain)?;
            merge_schemas(&mut merged, &raw, uri)?;
        }

        let mut own = map.clone();
        own.remove("allOf");
        merge_schemas(&mut merged, &own, uri)?;
        Ok(merged)
    }

    /// Raw keywords contributed by one branch, with `$ref`s made absolute
    fn all_of_branch(
        &mut self,
        uri: &str,
        branch: &Value,
        chain: &mut Vec<String>,
    ) -> Result<Map<String, Value>> {
        let obj = match branch {
            Value::Object(obj) => obj,
            Value::Bool(true) => return Ok(Map::new()),
            _ => return Err(SchemaError::definition(uri, "`allOf` branches must be schemas")),
        };

        if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            let target = join_uri(self.base(), reference);
            if self.in_progress.contains(&target) || chain.contains(&target) {
                return Err(SchemaError::definition(
                    uri,
                    format!("circular allOf reference to '{}'", target),
                ));
            }

            // Parents are compiled (and exported) in their own right
            self.resolve_ref(&target)?;

            let (doc_uri, fragment) = split_fragment(&target);
            let document = self.document(doc_uri)?;
            let parent = resolve_fragment(&document, fragment)
                .cloned()
                .ok_or_else(|| SchemaError::resolution(&target, "fragment does not exist in document"))?;

            chain.push(target.clone());
            self.base_stack.push(doc_uri.to_string());
            let result = self.all_of_branch(&target, &parent, chain);
            self.base_stack.pop();
            chain.pop();
            return result;
        }

        let mut node = obj.clone();
        absolutize_refs(&mut node, self.base());
        if node.contains_key("allOf") {
            return self.flatten_all_of(uri, &node, chain);
        }
        Ok(node)
    }

    // =========================================================================
    // Finish
    // =========================================================================

    fn finish(self, root: Option<TypeId>, document: &Value) -> Result<TypeGraph> {
        let mut descriptors = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.into_iter().enumerate() {
            let descriptor = slot.ok_or_else(|| {
                SchemaError::definition(format!("#{}", i), "type was never completed")
            })?;
            descriptors.push(descriptor);
        }

        let mut hasher = Sha256::new();
        hasher.update(canonical_string(document).as_bytes());
        let fingerprint = format!("{:x}", hasher.finalize());

        debug!(types = descriptors.len(), uris = self.resolved.len(), "type graph complete");

        Ok(TypeGraph {
            descriptors,
            by_uri: self.resolved,
            root,
            registry: self.registry,
            config: self.config,
            fingerprint,
        })
    }
}

/// URI of the root type: parameterized title or `$id`
pub(crate) fn root_type_uri(document: &Value) -> String {
    let name = document
        .get("title")
        .or_else(|| document.get("$id"))
        .or_else(|| document.get("id"))
        .and_then(Value::as_str)
        .map(|s| parameterize(s, '_'))
        .unwrap_or_default();
    if name.is_empty() {
        "root".to_string()
    } else {
        name
    }
}

/// Rewrite every `$ref` under `node` relative to `base`
fn absolutize_refs(node: &mut Map<String, Value>, base: &str) {
    for (key, value) in node.iter_mut() {
        if DATA_KEYWORDS.contains(&key.as_str()) {
            continue;
        }
        if key == "$ref" {
            if let Value::String(reference) = value {
                *reference = join_uri(base, reference);
            }
            continue;
        }
        match value {
            Value::Object(named) if NAMED_SCHEMA_MAPS.contains(&key.as_str()) => {
                named.values_mut().for_each(|schema| absolutize_value(schema, base));
            }
            _ => absolutize_value(value, base),
        }
    }
}

fn absolutize_value(value: &mut Value, base: &str) {
    match value {
        Value::Object(map) => absolutize_refs(map, base),
        Value::Array(items) => items.iter_mut().for_each(|v| absolutize_value(v, base)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeKind;
    use crate::resolver::DocumentResolver;
    use serde_json::json;

    fn build(schema: Value) -> Result<TypeGraph> {
        build_with(schema, BuildConfig::default())
    }

    fn build_with(schema: Value, config: BuildConfig) -> Result<TypeGraph> {
        let resolver = DocumentResolver::new();
        BuildSession::new(&resolver, Arc::new(ValidatorRegistry::new()), config)
            .build_document("memory:test", &schema)
    }

    #[test]
    fn test_root_uri_and_alias() {
        let graph = build(json!({"title": "Example Schema", "type": "object"})).unwrap();
        let root = graph.root().unwrap();
        assert_eq!(graph.lookup("example_schema"), Some(root));
        assert_eq!(graph.lookup("memory:test"), Some(root));
        assert_eq!(graph.lookup("memory:test#"), Some(root));
    }

    #[test]
    fn test_dispatch_kinds() {
        let graph = build(json!({
            "title": "Kinds",
            "type": "object",
            "properties": {
                "list": {"type": "array", "items": {"type": "string"}},
                "tuple": {"items": [{"type": "string"}, {"type": "integer"}]},
                "lit": {"type": "integer"},
                "choice": {"enum": ["a", "b"]},
                "either": {"type": ["string", "null"]},
                "one": {"oneOf": [{"type": "string"}, {"type": "integer"}]},
                "free": {}
            }
        }))
        .unwrap();

        let kind = |name: &str| {
            let id = graph.lookup(&format!("kinds/{}", name)).unwrap();
            graph.resolve(id).unwrap().kind()
        };
        assert_eq!(kind("list"), TypeKind::Array);
        assert_eq!(kind("tuple"), TypeKind::Array);
        assert_eq!(kind("lit"), TypeKind::Literal);
        assert_eq!(kind("choice"), TypeKind::Literal);
        assert_eq!(kind("either"), TypeKind::Union);
        assert_eq!(kind("one"), TypeKind::Union);
        assert_eq!(kind("free"), TypeKind::Literal);
        assert!(graph.lookup("kinds/either_null").is_some());
    }

    #[test]
    fn test_required_must_be_declared() {
        let err = build(json!({
            "title": "Bad",
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "required": ["b"]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Definition { .. }));
    }

    #[test]
    fn test_any_of_policy() {
        let schema = json!({"title": "A", "anyOf": [{"type": "string"}, {"type": "integer"}]});
        assert!(matches!(build(schema.clone()), Err(SchemaError::Unsupported { .. })));

        let graph = build_with(schema, BuildConfig::default().any_of(AnyOfPolicy::UseFirst)).unwrap();
        let root = graph.resolve(graph.root().unwrap()).unwrap();
        assert_eq!(root.as_union().map(|u| u.candidates.len()), Some(1));
    }

    #[test]
    fn test_self_reference_yields_placeholder() {
        let graph = build(json!({
            "title": "Node",
            "type": "object",
            "properties": {"next": {"$ref": "#"}}
        }))
        .unwrap();
        let root = graph.root().unwrap();
        let next = graph.lookup("node/next").unwrap();
        assert_ne!(next, root);
        assert_eq!(graph.get(next).unwrap().kind(), TypeKind::Reference);
        assert_eq!(graph.deref(next), root);
    }

    #[test]
    fn test_unresolvable_ref_aborts() {
        let err = build(json!({
            "title": "T",
            "type": "object",
            "properties": {"x": {"$ref": "memory:nowhere"}}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Resolution { .. }));
    }

    #[test]
    fn test_false_schema_is_rejected() {
        let err = build(json!({"title": "T", "properties": {"x": false}})).unwrap_err();
        assert!(matches!(err, SchemaError::Definition { .. }));
    }

    #[test]
    fn test_ref_loop_without_schema_is_rejected() {
        let err = build(json!({
            "title": "T",
            "definitions": {"a": {"$ref": "#/definitions/b"}, "b": {"$ref": "#/definitions/a"}},
            "type": "object"
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Definition { .. }));
    }

    #[test]
    fn test_absolutize_skips_data() {
        let mut node = json!({
            "properties": {"a": {"$ref": "#/definitions/x"}},
            "default": {"$ref": "keep"}
        })
        .as_object()
        .cloned()
        .unwrap();
        absolutize_refs(&mut node, "file:dir/doc.json");
        assert_eq!(node["properties"]["a"]["$ref"], json!("file:dir/doc.json#/definitions/x"));
        assert_eq!(node["default"]["$ref"], json!("keep"));
    }

    #[test]
    fn test_absolutize_properties_named_like_keywords() {
        let mut node = json!({
            "properties": {
                "default": {"$ref": "#/definitions/x"},
                "enum": {"items": {"$ref": "other.json"}}
            },
            "patternProperties": {"const": {"$ref": "#/definitions/y"}},
            "definitions": {"examples": {"$ref": "#/definitions/z"}}
        })
        .as_object()
        .cloned()
        .unwrap();
        absolutize_refs(&mut node, "file:dir/doc.json");
        assert_eq!(node["properties"]["default"]["$ref"], json!("file:dir/doc.json#/definitions/x"));
        assert_eq!(node["properties"]["enum"]["items"]["$ref"], json!("file:dir/other.json"));
        assert_eq!(node["patternProperties"]["const"]["$ref"], json!("file:dir/doc.json#/definitions/y"));
        assert_eq!(node["definitions"]["examples"]["$ref"], json!("file:dir/doc.json#/definitions/z"));
    }
}
