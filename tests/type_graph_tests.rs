//! Type Graph Tests
//!
//! Building schema documents into type graphs: combinators, references,
//! resolvers and configuration.

use std::fs;
use std::sync::Arc;

use familiar_objects::{
    AnyOfPolicy, BuildConfig, BuildSession, DocumentResolver, ObjectBuilder, ObjectsConfig,
    SchemaError, TypeKind, ValidatorRegistry,
};
use rstest::rstest;
use serde_json::{json, Value};

fn fixture(name: &str) -> Value {
    let text = match name {
        "person" => include_str!("fixtures/person.json"),
        "employee" => include_str!("fixtures/employee.json"),
        "shape" => include_str!("fixtures/shape.json"),
        "tagged" => include_str!("fixtures/tagged.json"),
        "order" => include_str!("fixtures/order.json"),
        "linked_list" => include_str!("fixtures/linked_list.json"),
        other => panic!("unknown fixture {}", other),
    };
    serde_json::from_str(text).unwrap()
}

// =============================================================================
// Idempotent builds
// =============================================================================

#[rstest]
#[case("person")]
#[case("employee")]
#[case("shape")]
#[case("tagged")]
#[case("order")]
#[case("linked_list")]
fn test_rebuild_has_identical_shape(#[case] name: &str) {
    let builder = ObjectBuilder::new(fixture(name)).unwrap();
    let first = builder.build_graph(BuildConfig::default()).unwrap();
    let second = builder.build_graph(BuildConfig::default()).unwrap();

    let (a, b) = (first.root().unwrap(), second.root().unwrap());
    assert_eq!(first.shape(a), second.shape(b));
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.uris(), second.uris());
}

#[test]
fn test_same_uri_resolves_once_per_session() {
    let resolver = DocumentResolver::new();
    let mut session = BuildSession::new(
        &resolver,
        Arc::new(ValidatorRegistry::new()),
        BuildConfig::default(),
    );
    let node = json!({"type": "string", "minLength": 2});
    let a = session.resolve("memory:doc#/x", &node).unwrap();
    let b = session.resolve("memory:doc#/x", &node).unwrap();
    let c = session.resolve("memory:doc#/x#", &node).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

// =============================================================================
// allOf
// =============================================================================

#[test]
fn test_all_of_tightens_bounds_and_unions_required() {
    let ns = ObjectBuilder::new(fixture("employee")).unwrap().build_classes().unwrap();
    let employee = ns.get("Employee").unwrap();
    let object = employee.descriptor().and_then(|d| d.as_object()).unwrap();

    let required: Vec<&str> = object.required.iter().map(String::as_str).collect();
    assert_eq!(required, vec!["name", "team"]);

    let level = object.property("level").unwrap();
    let literal = employee.graph().resolve(level.type_id).and_then(|d| d.as_literal()).unwrap();
    assert_eq!(literal.keywords.get("minimum"), Some(&json!(5)));

    // the parent is still exported in its own right
    assert!(ns.contains("Base"));
}

#[test]
fn test_all_of_type_conflict_fails_build() {
    let err = ObjectBuilder::new(json!({
        "title": "Bad",
        "allOf": [
            {"properties": {"x": {"type": "string"}}},
            {"properties": {"x": {"type": "integer"}}}
        ]
    }))
    .unwrap()
    .build_classes()
    .unwrap_err();
    assert!(matches!(err, SchemaError::Definition { .. }));
}

#[test]
fn test_circular_all_of_is_rejected() {
    let err = ObjectBuilder::new(json!({
        "title": "Loop",
        "definitions": {
            "a": {"allOf": [{"$ref": "#/definitions/b"}]},
            "b": {"allOf": [{"$ref": "#/definitions/a"}]}
        },
        "type": "object"
    }))
    .unwrap()
    .build_classes()
    .unwrap_err();
    assert!(matches!(err, SchemaError::Definition { .. }));
}

// =============================================================================
// oneOf / anyOf
// =============================================================================

#[test]
fn test_one_of_builds_union_of_candidates() {
    let ns = ObjectBuilder::new(fixture("shape")).unwrap().build_classes().unwrap();
    let shape = ns.get("Shape").unwrap();
    assert_eq!(shape.kind(), Some(TypeKind::Union));

    let union = shape.descriptor().and_then(|d| d.as_union()).unwrap();
    let names: Vec<String> = union
        .candidates
        .iter()
        .map(|c| shape.graph().type_name(*c))
        .collect();
    assert_eq!(names, vec!["Circle", "Square"]);
}

#[test]
fn test_any_of_requires_relaxation() {
    let schema = json!({"title": "Loose", "anyOf": [{"type": "string"}, {"type": "integer"}]});
    let builder = ObjectBuilder::new(schema).unwrap();

    let err = builder.build_classes().unwrap_err();
    assert!(matches!(err, SchemaError::Unsupported { .. }));

    let ns = builder
        .build_with(BuildConfig::default().any_of(AnyOfPolicy::UseFirst))
        .unwrap();
    let loose = ns.get("Loose").unwrap();
    assert!(loose.create(json!("text")).is_ok());
    // later candidates are never consulted
    assert!(loose.create(json!(3)).is_err());
}

#[test]
fn test_any_of_policy_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("objects.toml");
    fs::write(&path, "[build]\nany_of = \"use-first\"\n").unwrap();

    let config = ObjectsConfig::load_from(Some(path.to_str().unwrap())).unwrap();
    let ns = ObjectBuilder::with_config(
        json!({"title": "Loose", "anyOf": [{"type": "string"}]}),
        config,
    )
    .unwrap()
    .build_classes()
    .unwrap();
    assert!(ns.contains("Loose"));
}

// =============================================================================
// References
// =============================================================================

#[test]
fn test_self_reference_builds_once() {
    let ns = ObjectBuilder::new(fixture("linked_list")).unwrap().build_classes().unwrap();
    let node = ns.get("Node").unwrap();
    let graph = node.graph();

    let next = node
        .descriptor()
        .and_then(|d| d.as_object())
        .and_then(|o| o.property("next"))
        .unwrap();
    assert_eq!(graph.deref(next.type_id), node.id());
    assert!(graph.is_recursive(node.id()));
}

#[test]
fn test_definitions_are_exported_without_references() {
    let ns = ObjectBuilder::new(json!({
        "title": "Root",
        "type": "object",
        "definitions": {"unused": {"type": "object", "properties": {"a": {"type": "string"}}}}
    }))
    .unwrap()
    .build_classes()
    .unwrap();
    assert!(ns.contains("Unused"));
}

#[test]
fn test_unresolvable_reference_aborts_build() {
    let err = ObjectBuilder::new(json!({
        "title": "Root",
        "type": "object",
        "properties": {"x": {"$ref": "#/definitions/missing"}}
    }))
    .unwrap()
    .build_classes()
    .unwrap_err();
    assert!(matches!(err, SchemaError::Resolution { .. }));
}

#[test]
fn test_memory_resolver() {
    let resolver = DocumentResolver::new().with_memory(
        "address",
        json!({
            "title": "Address",
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        }),
    );

    let ns = ObjectBuilder::new(json!({
        "title": "Customer",
        "type": "object",
        "properties": {"home": {"$ref": "memory:address"}}
    }))
    .unwrap()
    .resolver(resolver)
    .build_classes()
    .unwrap();

    assert!(ns.contains("Address"));
    let customer = ns.get("Customer").unwrap();
    let err = customer.create(json!({"home": {}})).unwrap_err();
    assert_eq!(err.property.as_deref(), Some("home"));
    assert!(customer.create(json!({"home": {"city": "Oslo"}})).is_ok());
}

#[test]
fn test_file_references_resolve_relative_to_document() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("common")).unwrap();
    fs::write(
        dir.path().join("common/names.json"),
        r#"{"definitions": {"name": {"type": "string", "minLength": 1}}}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("pet.json"),
        r#"{
            "title": "Pet",
            "type": "object",
            "properties": {
                "name": {"$ref": "common/names.json#/definitions/name"},
                "owner": {"$ref": "owner.json"}
            }
        }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("owner.json"),
        r#"{
            "title": "Owner",
            "type": "object",
            "properties": {"name": {"$ref": "common/names.json#/definitions/name"}}
        }"#,
    )
    .unwrap();

    let ns = ObjectBuilder::from_file(dir.path().join("pet.json"))
        .unwrap()
        .build_classes()
        .unwrap();
    let pet = ns.get("Pet").unwrap();
    assert!(ns.contains("Owner"));

    assert!(pet.create(json!({"name": "Rex", "owner": {"name": "Ann"}})).is_ok());
    let err = pet.create(json!({"owner": {"name": ""}})).unwrap_err();
    assert_eq!(err.property.as_deref(), Some("owner.name"));
}

#[test]
fn test_registered_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("money.json"),
        r#"{"$id": "http://example.com/money.json", "type": "number", "minimum": 0}"#,
    )
    .unwrap();

    let mut resolver = DocumentResolver::new();
    assert_eq!(resolver.load_directory(dir.path()).unwrap(), 1);

    let ns = ObjectBuilder::new(json!({
        "title": "Invoice",
        "type": "object",
        "properties": {"total": {"$ref": "http://example.com/money.json"}}
    }))
    .unwrap()
    .resolver(resolver)
    .build_classes()
    .unwrap();

    let invoice = ns.get("Invoice").unwrap();
    assert!(invoice.create(json!({"total": 12.5})).is_ok());
    assert!(invoice.create(json!({"total": -1})).is_err());
}

// =============================================================================
// Meta-validation and formats
// =============================================================================

#[rstest]
#[case(json!({"type": "object", "properties": {"a": {"type": 7}}}))]
#[case(json!({"type": "string", "minLength": -2}))]
#[case(json!({"required": "name"}))]
fn test_meta_validation_rejects_malformed_documents(#[case] schema: Value) {
    let err = ObjectBuilder::new(schema).map(|_| ()).unwrap_err();
    assert!(matches!(err, SchemaError::MetaSchema(_)));
}

#[test]
fn test_draft4_exclusive_flags() {
    let ns = ObjectBuilder::new(json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "title": "Positive",
        "type": "number",
        "minimum": 0,
        "exclusiveMinimum": true
    }))
    .unwrap()
    .build_classes()
    .unwrap();
    let positive = ns.get("Positive").unwrap();
    assert!(positive.create(json!(0)).is_err());
    assert!(positive.create(json!(0.5)).is_ok());
}

#[test]
fn test_formats_can_be_disabled() {
    let schema = json!({
        "title": "User",
        "type": "object",
        "properties": {"email": {"type": "string", "format": "email"}}
    });

    let ns = ObjectBuilder::new(schema.clone()).unwrap().build_classes().unwrap();
    assert!(ns.get("User").unwrap().create(json!({"email": "nope"})).is_err());

    let mut config = ObjectsConfig::default();
    config.validation.formats = false;
    let ns = ObjectBuilder::with_config(schema, config).unwrap().build_classes().unwrap();
    assert!(ns.get("User").unwrap().create(json!({"email": "nope"})).is_ok());
}
