#![allow(unused_crate_dependencies)]

mod common;

use common::schema;
use graphcache::{
    CacheConfig, CacheReader, CacheSettings, ConfigError, KeyingError, OperationType, ResolveInfo, ResolverError,
    SchemaError, SchemaPredicates, UpdateError,
};
use rstest::rstest;
use serde_json::{Map, Value};

fn no_prediction(
    _arguments: &Map<String, Value>,
    _cache: &CacheReader<'_>,
    _info: &ResolveInfo<'_>,
) -> Result<Value, UpdateError> {
    Ok(Value::Null)
}

fn nothing(
    _parent: &Map<String, Value>,
    _arguments: &Map<String, Value>,
    _cache: &CacheReader<'_>,
    _info: &ResolveInfo<'_>,
) -> Result<Option<Value>, ResolverError> {
    Ok(None)
}

fn by_name(data: &Map<String, Value>) -> Result<Option<String>, KeyingError> {
    Ok(data.get("name").and_then(Value::as_str).map(str::to_string))
}

#[rstest]
#[case("Todo", "complete", true)]
#[case("Todo", "author", true)]
#[case("Todo", "text", false)]
#[case("Query", "todos", false)]
#[case("Query", "todo", true)]
#[case("Query", "search", true)]
#[case("Author", "missing", false)]
fn field_nullability(#[case] typename: &str, #[case] field: &str, #[case] nullable: bool) {
    assert_eq!(schema().is_field_nullable(typename, field), nullable);
}

#[rstest]
#[case("Author", "todos", true)]
#[case("Query", "search", true)]
#[case("Query", "todos", false)]
#[case("Query", "pagedTodos", false)]
fn list_item_nullability(#[case] typename: &str, #[case] field: &str, #[case] nullable: bool) {
    assert_eq!(schema().is_list_nullable(typename, field), nullable);
}

#[rstest]
#[case("Node", "Todo", true)]
#[case("Node", "Author", true)]
#[case("SearchResult", "Author", true)]
#[case("Todo", "Todo", true)]
#[case("Todo", "Author", false)]
#[case("Node", "SearchResult", false)]
fn fragment_matching(#[case] condition: &str, #[case] typename: &str, #[case] matches: bool) {
    assert_eq!(schema().is_interface_of_type(condition, typename), matches);
}

#[test]
fn typename_exists_on_every_type() {
    let schema = schema();

    assert!(schema.field_exists("Todo", "__typename"));
    assert!(schema.field_exists("Todo", "text"));
    assert!(!schema.field_exists("Todo", "title"));
}

#[test]
fn invalid_introspection_is_rejected() {
    let error = SchemaPredicates::from_introspection_json("{\"data\": 1}").unwrap_err();

    assert!(matches!(error, SchemaError::Json(_)));
}

#[test]
fn root_types_come_from_the_schema() {
    let settings = CacheSettings::from_toml("[root_types]\nquery = \"QueryRoot\"").unwrap();
    let config = CacheConfig::builder().settings(settings).schema(schema()).build().unwrap();

    assert_eq!(config.root_typename(OperationType::Query), "Query");
    assert_eq!(config.root_typename(OperationType::Mutation), "Mutation");
    assert_eq!(config.root_typename(OperationType::Subscription), "Subscription");
}

#[test]
fn resolvers_for_unknown_fields_are_rejected() {
    let error = CacheConfig::builder()
        .schema(schema())
        .resolver("Todo", "title", nothing)
        .build()
        .err()
        .unwrap();

    insta::assert_snapshot!(error, @"resolver registered for unknown field Todo.title");
}

#[test]
fn keys_for_unknown_types_are_rejected() {
    let error = CacheConfig::builder()
        .schema(schema())
        .key("Shop", by_name)
        .build()
        .err()
        .unwrap();

    assert!(matches!(error, ConfigError::UnknownType { typename, .. } if typename == "Shop"));
}

#[test]
fn embedded_types_must_exist() {
    let settings = CacheSettings::from_toml("embedded_types = [\"Point\"]").unwrap();
    let error = CacheConfig::builder()
        .settings(settings)
        .schema(schema())
        .build()
        .err()
        .unwrap();

    assert!(matches!(error, ConfigError::UnknownType { typename, .. } if typename == "Point"));
}

#[test]
fn predictions_must_be_for_mutation_fields() {
    let error = CacheConfig::builder()
        .schema(schema())
        .optimistic("todos", no_prediction)
        .build()
        .err()
        .unwrap();

    insta::assert_snapshot!(error, @"optimistic update registered for unknown field Mutation.todos");

    CacheConfig::builder()
        .schema(schema())
        .optimistic("toggleTodo", no_prediction)
        .build()
        .unwrap();
}

#[test]
fn anything_goes_without_a_schema() {
    CacheConfig::builder()
        .resolver("Todo", "title", nothing)
        .key("Shop", by_name)
        .optimistic("todos", no_prediction)
        .build()
        .unwrap();
}
