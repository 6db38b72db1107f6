//! Familiar Objects
//!
//! Compiles JSON Schema documents into a graph of type descriptors and
//! builds validated runtime values from them.
//!
//! ## Features
//!
//! - **Type Graph**: `$ref` (including circular ones), `allOf` merging,
//!   `oneOf` dispatch and opt-in `anyOf` compile into an arena of descriptors
//! - **Validated Instances**: every assignment is coerced and checked; a
//!   failed write never changes the stored value
//! - **Lazy Arrays**: item, length and uniqueness checks rerun only after
//!   a mutation, or eagerly in strict builds
//! - **Extension Policies**: sealed, open, typed and pattern-typed
//!   properties beyond the declared ones
//!
//! ## Architecture
//!
//! ```text
//! schema document
//!   └── ObjectBuilder (meta-validation)
//!         └── BuildSession ──> TypeGraph (arena + Resolution Table)
//!               │                  └── Namespace: name -> TypeHandle
//!               └── Resolver (memory:, file:, registered URIs)
//!
//! TypeHandle ──> Instance / ArrayValue / LiteralValue
//!                   └── ValidatorRegistry (keyword table)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use familiar_objects::ObjectBuilder;
//! use serde_json::json;
//!
//! let ns = ObjectBuilder::new(json!({
//!     "title": "Person",
//!     "type": "object",
//!     "properties": {"age": {"type": "integer", "minimum": 0}},
//!     "required": ["age"]
//! }))?
//! .build_classes()?;
//!
//! let mut person = ns.get("Person").unwrap().instance()?;
//! person.set("age", 5)?;
//! assert_eq!(person.serialize()?, r#"{"age":5}"#);
//! # Ok::<(), familiar_objects::SchemaError>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod json;
pub mod names;
pub mod resolver;
pub mod runtime;
pub mod validators;

pub use builder::{Namespace, ObjectBuilder};
pub use config::{AnyOfPolicy, BuildConfig, DraftVersion, ObjectsConfig, ValidationConfig};
pub use error::{Result, SchemaError, ValidationError};
pub use graph::analysis::CycleGroup;
pub use graph::{
    BuildSession, ExtensionPolicy, ItemConstraint, TypeDescriptor, TypeGraph, TypeId, TypeKind,
};
pub use resolver::{DocumentResolver, Resolver};
pub use runtime::{ArrayValue, Instance, LiteralValue, TypeHandle, TypedValue};
pub use validators::ValidatorRegistry;
