//! Keys that address data in the store.

use std::{collections::HashMap, fmt, sync::Arc};

use indexmap::IndexSet;
use serde_json::{Map, Value};

use crate::error::KeyingError;

/// Identifies one logical entity in the store, e.g. `Todo:1`.
///
/// Objects without a key of their own are embedded, their key is derived from
/// the field they were found under: `Query.author` or `Todo:1.tags.0`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(key: impl Into<String>) -> Self {
        EntityKey(key.into())
    }

    /// The key for an entity of `typename` identified by `id`
    pub fn for_entity(typename: &str, id: &str) -> Self {
        EntityKey(format!("{typename}:{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key of an object embedded under `field` of this entity
    pub(crate) fn embedded(&self, field: &FieldKey) -> EntityKey {
        EntityKey(format!("{}.{}", self.0, field.0))
    }

    /// The key of the `index`th item of an embedded list
    pub(crate) fn indexed(&self, index: usize) -> EntityKey {
        EntityKey(format!("{}.{index}", self.0))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityKey({})", self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        EntityKey::new(value)
    }
}

/// A field name together with its serialized arguments, e.g. `todos({"first":10})`
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn new(field_name: &str, arguments: Option<&Map<String, Value>>) -> Self {
        match arguments {
            Some(arguments) if !arguments.is_empty() => {
                let mut key = format!("{field_name}(");
                write_stable(&Value::Object(arguments.clone()), &mut key);
                key.push(')');
                FieldKey(key)
            }
            _ => FieldKey(field_name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn field_name(&self) -> &str {
        match self.0.find('(') {
            Some(index) => &self.0[..index],
            None => &self.0,
        }
    }

    /// The arguments this key was built from, if any
    pub fn arguments(&self) -> Option<Map<String, Value>> {
        let start = self.0.find('(')?;
        let json = self.0.get(start + 1..self.0.len() - 1)?;
        match serde_json::from_str(json) {
            Ok(Value::Object(arguments)) => Some(arguments),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldKey({})", self.0)
    }
}

/// Identifies an operation across dispatch, results and teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OperationKey(pub u64);

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something an operation read or wrote.
///
/// Entities are tracked by their `EntityKey`.  Fields of the query root are
/// tracked individually as `Query.fieldKey` so that unrelated root fields do
/// not depend on each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct DependencyKey(String);

impl DependencyKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn entity(key: &EntityKey) -> Self {
        DependencyKey(key.0.clone())
    }

    pub(crate) fn root_field(root: &EntityKey, field: &FieldKey) -> Self {
        DependencyKey(format!("{}.{}", root.0, field.0))
    }
}

impl From<&str> for DependencyKey {
    fn from(value: &str) -> Self {
        DependencyKey(value.to_string())
    }
}

pub type Dependencies = IndexSet<DependencyKey>;

/// Serializes JSON with object keys sorted, so equal arguments produce equal keys
pub fn stable_stringify(value: &Value) -> String {
    let mut output = String::new();
    write_stable(value, &mut output);
    output
}

fn write_stable(value: &Value, output: &mut String) {
    match value {
        Value::Object(object) => {
            let mut keys = object.keys().collect::<Vec<_>>();
            keys.sort();

            output.push('{');
            for (index, key) in keys.into_iter().enumerate() {
                if index != 0 {
                    output.push(',');
                }
                output.push_str(&Value::String(key.clone()).to_string());
                output.push(':');
                write_stable(&object[key], output);
            }
            output.push('}');
        }
        Value::Array(items) => {
            output.push('[');
            for (index, item) in items.iter().enumerate() {
                if index != 0 {
                    output.push(',');
                }
                write_stable(item, output);
            }
            output.push(']');
        }
        scalar => output.push_str(&scalar.to_string()),
    }
}

/// Computes the identifying part of an entity key for one type.
///
/// Returning `Ok(None)` marks the object as embedded.
pub trait KeyResolver: Send + Sync {
    fn key(&self, data: &Map<String, Value>) -> Result<Option<String>, KeyingError>;
}

impl<F> KeyResolver for F
where
    F: Fn(&Map<String, Value>) -> Result<Option<String>, KeyingError> + Send + Sync,
{
    fn key(&self, data: &Map<String, Value>) -> Result<Option<String>, KeyingError> {
        self(data)
    }
}

/// Keys an entity by the values of a list of its fields, joined with `:`.
///
/// An empty list keys nothing, which makes the type embedded.
pub(crate) struct FieldListKey(pub Vec<String>);

impl KeyResolver for FieldListKey {
    fn key(&self, data: &Map<String, Value>) -> Result<Option<String>, KeyingError> {
        if self.0.is_empty() {
            return Ok(None);
        }

        let mut parts = Vec::with_capacity(self.0.len());
        for field in &self.0 {
            match data.get(field) {
                Some(value) => parts.push(scalar_key(value).ok_or_else(|| {
                    KeyingError::new(format!("the key field {field} is not a string or number"))
                })?),
                None => return Err(KeyingError::new(format!("the key field {field} was not selected"))),
            }
        }

        Ok(Some(parts.join(":")))
    }
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(string) => Some(string.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// The keying functions of a cache, by typename
#[derive(Clone, Default)]
pub struct KeyRegistry {
    resolvers: HashMap<String, Arc<dyn KeyResolver>>,
}

impl KeyRegistry {
    pub(crate) fn insert(&mut self, typename: String, resolver: Arc<dyn KeyResolver>) {
        self.resolvers.insert(typename, resolver);
    }

    pub(crate) fn typenames(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    /// Computes the key of an object, `None` when it is embedded.
    ///
    /// The typename is taken from `__typename` unless given.
    pub fn key_of_entity(&self, typename: Option<&str>, data: &Map<String, Value>) -> Option<EntityKey> {
        let typename = typename.or_else(|| data.get("__typename").and_then(Value::as_str))?;

        let id = match self.resolvers.get(typename) {
            Some(resolver) => match resolver.key(data) {
                Ok(id) => id,
                Err(error) => {
                    tracing::warn!("could not key an object of type {typename}, embedding it: {error}");
                    None
                }
            },
            None => ["id", "_id"]
                .into_iter()
                .find_map(|field| data.get(field).and_then(scalar_key)),
        }?;

        Some(EntityKey::for_entity(typename, &id))
    }
}

impl fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("typenames", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(object) => object,
            _ => unreachable!(),
        }
    }

    #[rstest]
    #[case::no_arguments(None, "todos")]
    #[case::empty_arguments(Some(json!({})), "todos")]
    #[case::sorted(Some(json!({"b": 1, "a": "x"})), r#"todos({"a":"x","b":1})"#)]
    #[case::nested(Some(json!({"filter": {"z": true, "a": [2, 1]}})), r#"todos({"filter":{"a":[2,1],"z":true}})"#)]
    fn field_keys(#[case] arguments: Option<Value>, #[case] expected: &str) {
        let arguments = arguments.map(object);
        assert_eq!(FieldKey::new("todos", arguments.as_ref()).as_str(), expected);
    }

    #[test]
    fn field_key_parts() {
        let key = FieldKey::new("todos", Some(&object(json!({"first": 10}))));

        assert_eq!(key.field_name(), "todos");
        assert_eq!(key.arguments(), Some(object(json!({"first": 10}))));
        assert_eq!(FieldKey::new("todos", None).arguments(), None);
    }

    #[rstest]
    #[case::id(json!({"__typename": "Todo", "id": "1"}), Some("Todo:1"))]
    #[case::numeric_id(json!({"__typename": "Todo", "id": 1}), Some("Todo:1"))]
    #[case::underscore_id(json!({"__typename": "Todo", "_id": "abc"}), Some("Todo:abc"))]
    #[case::no_id(json!({"__typename": "Todo", "text": "x"}), None)]
    #[case::no_typename(json!({"id": "1"}), None)]
    fn default_keys(#[case] data: Value, #[case] expected: Option<&str>) {
        let registry = KeyRegistry::default();
        let key = registry.key_of_entity(None, &object(data));
        assert_eq!(key.as_ref().map(EntityKey::as_str), expected);
    }

    #[test]
    fn custom_keys() {
        let mut registry = KeyRegistry::default();
        registry.insert(
            "Book".into(),
            Arc::new(|data: &Map<String, Value>| -> Result<Option<String>, KeyingError> {
                Ok(data.get("isbn").and_then(Value::as_str).map(str::to_string))
            }),
        );
        registry.insert("Point".into(), Arc::new(FieldListKey(vec![])));
        registry.insert(
            "Broken".into(),
            Arc::new(|_: &Map<String, Value>| -> Result<Option<String>, KeyingError> {
                Err(KeyingError::new("nope"))
            }),
        );

        let book = object(json!({"__typename": "Book", "id": "1", "isbn": "123"}));
        assert_eq!(registry.key_of_entity(None, &book), Some(EntityKey::new("Book:123")));

        let point = object(json!({"__typename": "Point", "id": "1"}));
        assert_eq!(registry.key_of_entity(None, &point), None);

        let broken = object(json!({"__typename": "Broken", "id": "1"}));
        assert_eq!(registry.key_of_entity(None, &broken), None);
    }

    #[test]
    fn field_list_keys() {
        let resolver = FieldListKey(vec!["owner".into(), "name".into()]);

        assert_eq!(
            resolver.key(&object(json!({"owner": "graphcache", "name": "core"}))),
            Ok(Some("graphcache:core".to_string()))
        );
        assert!(resolver.key(&object(json!({"owner": "graphcache"}))).is_err());
    }

    #[test]
    fn embedded_keys() {
        let root = EntityKey::new("Query");
        let field = FieldKey::new("author", None);

        assert_eq!(root.embedded(&field).as_str(), "Query.author");
        assert_eq!(root.embedded(&field).indexed(2).as_str(), "Query.author.2");
    }
}
