//! Schema Resolution
//!
//! Turns URIs into raw schema documents. The builder talks to a [`Resolver`];
//! [`DocumentResolver`] is the stock implementation and understands:
//! - `memory:<name>` documents registered up front
//! - `file:<relative path>` documents read from a base directory
//! - documents registered under an absolute URI (a local registry)
//! - whole directories, keyed by `$id` or relative path
//!
//! Fragments (`#/definitions/foo`) are applied by the builder via
//! [`resolve_fragment`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, SchemaError};

/// Base URI given to documents that carry no `$id`
pub const DEFAULT_BASE_URI: &str = "urn:familiar-objects:root";

/// Looks up raw schema documents by URI
///
/// Implementations must be read-only once a build starts.
pub trait Resolver: Send + Sync {
    /// Return the document named by `uri` (no fragment)
    fn resolve(&self, uri: &str) -> Result<Value>;
}

/// In-memory, file and directory backed resolver
#[derive(Debug, Clone, Default)]
pub struct DocumentResolver {
    /// Absolute URI -> document
    documents: HashMap<String, Value>,
    /// `memory:` name -> document
    memory: HashMap<String, Value>,
    /// Root for `file:` references
    base_dir: Option<PathBuf>,
}

impl DocumentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `file:` references relative to `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Register a `memory:<name>` document
    pub fn with_memory(mut self, name: impl Into<String>, document: Value) -> Self {
        self.add_memory(name, document);
        self
    }

    pub fn add_memory(&mut self, name: impl Into<String>, document: Value) {
        self.memory.insert(name.into(), document);
    }

    /// Register a document under an absolute URI
    pub fn add_document(&mut self, uri: &str, document: Value) {
        self.documents.insert(canonicalize_uri(uri), document);
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn len(&self) -> usize {
        self.documents.len() + self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register every `.json` file under `dir`
    ///
    /// Each document is keyed by its `$id` when present, otherwise by its
    /// path relative to `dir`. Returns the number of documents added.
    pub fn load_directory(&mut self, dir: &Path) -> anyhow::Result<usize> {
        let mut count = 0;

        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }

            let relative_path = path.strip_prefix(dir)?;
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let json: Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;

            let relative = relative_path.to_string_lossy().replace('\\', "/");
            let key = json
                .get("$id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or(relative);

            debug!(uri = %key, path = %path.display(), "registered schema document");
            self.add_document(&key, json);
            count += 1;
        }

        Ok(count)
    }

    fn read_file(&self, uri: &str, relative: &str) -> Result<Value> {
        let base = self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let path = base.join(relative);
        let content =
            fs::read_to_string(&path).map_err(|e| SchemaError::resolution(uri, e))?;
        debug!(uri, path = %path.display(), "loaded schema file");
        serde_json::from_str(&content).map_err(|e| SchemaError::resolution(uri, e))
    }
}

impl Resolver for DocumentResolver {
    fn resolve(&self, uri: &str) -> Result<Value> {
        let uri = canonicalize_uri(uri);

        if let Some(doc) = self.documents.get(&uri) {
            return Ok(doc.clone());
        }

        if let Some(name) = uri.strip_prefix("memory:") {
            return self
                .memory
                .get(name)
                .cloned()
                .ok_or_else(|| SchemaError::resolution(&uri, "no in-memory document by that name"));
        }

        if let Some(relative) = uri.strip_prefix("file:") {
            if let Some(doc) = self.documents.get(relative) {
                return Ok(doc.clone());
            }
            return self.read_file(&uri, relative);
        }

        Err(SchemaError::resolution(uri, "no document registered for this URI"))
    }
}

// =============================================================================
// URI helpers
// =============================================================================

/// `"X#"` and `"X"` name the same node
pub fn canonicalize_uri(uri: &str) -> String {
    uri.strip_suffix('#').unwrap_or(uri).to_string()
}

/// Split a URI into its document part and fragment (without `#`)
pub fn split_fragment(uri: &str) -> (&str, &str) {
    match uri.find('#') {
        Some(idx) => (&uri[..idx], &uri[idx + 1..]),
        None => (uri, ""),
    }
}

fn has_scheme(uri: &str) -> bool {
    match uri.find(':') {
        Some(idx) => {
            idx > 0
                && uri[..idx]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Resolve `reference` against the document URI `base`
pub fn join_uri(base: &str, reference: &str) -> String {
    let (base_doc, _) = split_fragment(base);

    if reference.starts_with('#') {
        return canonicalize_uri(&format!("{}{}", base_doc, reference));
    }
    if has_scheme(reference) {
        return canonicalize_uri(reference);
    }

    // Relative document reference: replace the last path segment of the base
    if let Some(path) = base_doc.strip_prefix("file:") {
        let joined = format!("{}{}", parent_of(path), reference);
        return canonicalize_uri(&format!("file:{}", normalize_path(&joined)));
    }
    if has_scheme(base_doc) && base_doc.contains('/') {
        return canonicalize_uri(&format!("{}{}", parent_of(base_doc), reference));
    }
    canonicalize_uri(&format!("file:{}", normalize_path(reference)))
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx + 1],
        None => "",
    }
}

/// Collapse `.` and `..` segments
fn normalize_path(path: &str) -> String {
    let (path, fragment) = match path.find('#') {
        Some(idx) => (&path[..idx], &path[idx..]),
        None => (path, ""),
    };
    let mut components: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                components.pop();
            }
            other => components.push(other),
        }
    }
    format!("{}{}", components.join("/"), fragment)
}

/// Apply a JSON-pointer fragment to a document
pub fn resolve_fragment<'a>(document: &'a Value, fragment: &str) -> Option<&'a Value> {
    if fragment.is_empty() || fragment == "/" {
        return Some(document);
    }
    let decoded = percent_decode(fragment);
    if decoded.starts_with('/') {
        document.pointer(&decoded)
    } else {
        None
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
