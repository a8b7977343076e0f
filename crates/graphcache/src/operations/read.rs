use serde_json::{Map, Value};

use super::{FieldCollector, ReadResult};
use crate::{
    ast::{resolve_arguments, Document, Field, SelectionSet, Variables},
    cache::CacheReader,
    config::CacheConfig,
    error::{DocumentError, SchemaMismatch},
    keys::{Dependencies, DependencyKey, EntityKey, FieldKey},
    resolvers::ResolveInfo,
    response::{CacheOutcome, GraphqlError, PathSegment},
    store::{Link, Store},
};

/// Reads the main operation of `document` out of the store
pub(crate) fn read_query(
    store: &Store,
    config: &CacheConfig,
    document: &Document,
    variables: &Variables,
) -> Result<ReadResult, DocumentError> {
    let operation = document.main_operation()?;
    let root_key = EntityKey::new(config.root_typename(operation.operation_type));

    let mut reader = Reader::new(store, config, FieldCollector::new(&document.fragments, variables, config.schema()));
    let data = reader.read_entity(&root_key, &operation.selection_set, true);

    Ok(reader.finish(data))
}

/// Reads a fragment of one entity, given as a key or as an object with key fields
pub(crate) fn read_fragment(
    store: &Store,
    config: &CacheConfig,
    document: &Document,
    entity: &Value,
    variables: &Variables,
    fragment_name: Option<&str>,
) -> Result<ReadResult, DocumentError> {
    let fragment = document.select_fragment(fragment_name)?;

    let key = match entity {
        Value::String(key) => Some(EntityKey::new(key.as_str())),
        Value::Object(object) => {
            let typename = object
                .get("__typename")
                .and_then(Value::as_str)
                .unwrap_or(&fragment.type_condition);
            config.keys().key_of_entity(Some(typename), object)
        }
        _ => None,
    };

    let Some(key) = key else {
        tracing::warn!(
            "can't read the fragment {}: the entity has no key, pass a key or an object with its key fields",
            fragment.name
        );
        return Ok(ReadResult::miss(Dependencies::default()));
    };

    let mut reader = Reader::new(store, config, FieldCollector::new(&document.fragments, variables, config.schema()));
    let data = reader.read_entity(&key, &fragment.selection_set, false);

    Ok(reader.finish(data))
}

/// Reads back the result of a mutation or subscription.
///
/// Root fields are not stored, so the raw result is the starting point.
/// Keyed entities inside it are read from the store instead, so that
/// resolvers apply and the latest data is returned.
pub(crate) fn read_root(
    store: &Store,
    config: &CacheConfig,
    document: &Document,
    variables: &Variables,
    data: &Map<String, Value>,
) -> Result<ReadResult, DocumentError> {
    let operation = document.main_operation()?;
    let typename = config.root_typename(operation.operation_type);

    let mut reader = Reader::new(store, config, FieldCollector::new(&document.fragments, variables, config.schema()));
    let output = reader.read_raw_object(Some(typename), &operation.selection_set, data);

    Ok(reader.finish(Some(output)))
}

struct Reader<'a> {
    store: &'a Store,
    config: &'a CacheConfig,
    collector: FieldCollector<'a>,
    dependencies: Dependencies,
    partial: bool,
    errors: Vec<GraphqlError>,
    path: Vec<PathSegment>,
}

impl<'a> Reader<'a> {
    fn new(store: &'a Store, config: &'a CacheConfig, collector: FieldCollector<'a>) -> Self {
        Reader {
            store,
            config,
            collector,
            dependencies: Dependencies::default(),
            partial: false,
            errors: vec![],
            path: vec![],
        }
    }

    fn finish(self, data: Option<Map<String, Value>>) -> ReadResult {
        let outcome = match (&data, self.partial) {
            (None, _) => CacheOutcome::Miss,
            (Some(_), true) => CacheOutcome::Partial,
            (Some(_), false) => CacheOutcome::Hit,
        };

        ReadResult {
            data,
            outcome,
            dependencies: self.dependencies,
            errors: self.errors,
        }
    }

    fn variables(&self) -> &'a Variables {
        self.collector.variables()
    }

    fn is_nullable(&self, typename: Option<&str>, field_name: &str) -> bool {
        match (self.config.schema(), typename) {
            (Some(schema), Some(typename)) => schema.is_field_nullable(typename, field_name),
            _ => false,
        }
    }

    fn is_list_nullable(&self, typename: Option<&str>, field_name: &str) -> bool {
        match (self.config.schema(), typename) {
            (Some(schema), Some(typename)) => schema.is_list_nullable(typename, field_name),
            _ => false,
        }
    }

    /// Reads an entity of the store.  `None` means the selection could not be
    /// satisfied and has to be treated as missing by the caller.
    fn read_entity(&mut self, key: &EntityKey, selection_set: &SelectionSet, is_root: bool) -> Option<Map<String, Value>> {
        let store = self.store;
        let variables = self.variables();

        let typename = if is_root {
            key.as_str().to_string()
        } else {
            self.dependencies.insert(DependencyKey::entity(key));
            store.typename_of(key)?.to_string()
        };

        let fields = self.collector.collect(selection_set, Some(&typename), &|field| {
            let field_key = FieldKey::new(&field.name, resolve_arguments(&field.arguments, variables).as_ref());
            store.read_record(key, &field_key).is_some() || store.read_link(key, &field_key).is_some()
        });

        let mut output = Map::new();
        let mut has_fields = false;
        let mut has_partials = false;

        for field in fields {
            let response_key = field.response_key();
            if field.name == "__typename" {
                output.insert(response_key.to_string(), Value::String(typename.clone()));
                continue;
            }

            let arguments = resolve_arguments(&field.arguments, variables);
            let field_key = FieldKey::new(&field.name, arguments.as_ref());
            self.dependencies.insert(store.dependency_key(key, &field_key));

            if let Some(schema) = self.config.schema() {
                if !schema.field_exists(&typename, &field.name) {
                    let mismatch = SchemaMismatch {
                        typename: typename.clone(),
                        field: field.name.clone(),
                    };
                    tracing::warn!("treating the read of {key} as a miss: {mismatch}");
                    return None;
                }
            }

            self.path.push(PathSegment::Field(response_key.to_string()));
            let value = self.read_field(key, &typename, field, &field_key, arguments.unwrap_or_default(), &output);
            self.path.pop();

            match value {
                Some(value) => {
                    has_fields = true;
                    output.insert(response_key.to_string(), value);
                }
                None if self.is_nullable(Some(&typename), &field.name) => {
                    has_partials = true;
                    output.insert(response_key.to_string(), Value::Null);
                }
                None => return None,
            }
        }

        if has_partials {
            self.partial = true;
            if is_root && !has_fields {
                return None;
            }
        }

        Some(output)
    }

    fn read_field(
        &mut self,
        key: &EntityKey,
        typename: &str,
        field: &Field,
        field_key: &FieldKey,
        arguments: Map<String, Value>,
        output: &Map<String, Value>,
    ) -> Option<Value> {
        let store = self.store;
        let config = self.config;

        if let Some(resolver) = config.resolvers().get(typename, &field.name) {
            let stored = store
                .read_record(key, field_key)
                .cloned()
                .or_else(|| store.read_link(key, field_key).map(Link::to_json));

            let mut parent = output.clone();
            parent.insert(field.response_key().to_string(), stored.unwrap_or(Value::Null));

            let cache = CacheReader::new(store, config);
            let info = ResolveInfo {
                parent_typename: typename,
                parent_key: key,
                parent_field_key: field_key,
                field_name: &field.name,
                variables: self.variables(),
                path: &self.path,
            };
            let result = resolver.resolve(&parent, &arguments, &cache, &info);
            self.dependencies.extend(cache.into_dependencies());

            return match result {
                Ok(Some(value)) if field.is_composite() => {
                    self.read_resolved(Some(typename), &field.name, &key.embedded(field_key), &field.selection_set, value)
                }
                Ok(value) => value,
                Err(error) => {
                    tracing::debug!("resolver for {typename}.{} failed: {error}", field.name);
                    self.errors
                        .push(GraphqlError::new(error.to_string()).with_path(self.path.clone()));
                    Some(Value::Null)
                }
            };
        }

        if !field.is_composite() {
            return store.read_record(key, field_key).cloned();
        }

        let link = store.read_link(key, field_key)?;
        self.read_link(link, typename, &field.name, &field.selection_set)
    }

    fn read_link(&mut self, link: &Link, typename: &str, field_name: &str, selection_set: &SelectionSet) -> Option<Value> {
        match link {
            Link::Null => Some(Value::Null),
            Link::Entity(key) => self.read_entity(key, selection_set, false).map(Value::Object),
            Link::List(links) => {
                let items_nullable = self.is_list_nullable(Some(typename), field_name);
                let mut items = Vec::with_capacity(links.len());

                for (index, link) in links.iter().enumerate() {
                    self.path.push(PathSegment::Index(index));
                    let item = self.read_link(link, typename, field_name, selection_set);
                    self.path.pop();

                    match item {
                        Some(item) => items.push(item),
                        None if items_nullable => {
                            self.partial = true;
                            items.push(Value::Null);
                        }
                        None => return None,
                    }
                }

                Some(Value::Array(items))
            }
        }
    }

    /// Reads the value a resolver returned for a field with sub-selections
    fn read_resolved(
        &mut self,
        typename: Option<&str>,
        field_name: &str,
        embedded_key: &EntityKey,
        selection_set: &SelectionSet,
        value: Value,
    ) -> Option<Value> {
        match value {
            Value::Null => Some(Value::Null),
            Value::String(key) => self
                .read_entity(&EntityKey::new(key), selection_set, false)
                .map(Value::Object),
            Value::Array(values) => {
                let items_nullable = self.is_list_nullable(typename, field_name);
                let mut items = Vec::with_capacity(values.len());

                for (index, value) in values.into_iter().enumerate() {
                    self.path.push(PathSegment::Index(index));
                    let item = self.read_resolved(typename, field_name, &embedded_key.indexed(index), selection_set, value);
                    self.path.pop();

                    match item {
                        Some(item) => items.push(item),
                        None if items_nullable => {
                            self.partial = true;
                            items.push(Value::Null);
                        }
                        None => return None,
                    }
                }

                Some(Value::Array(items))
            }
            Value::Object(object) => {
                if let Some(key) = self.config.keys().key_of_entity(None, &object) {
                    if let Some(data) = self.read_entity(&key, selection_set, false) {
                        return Some(Value::Object(data));
                    }
                }
                self.read_embedded(embedded_key, selection_set, &object)
                    .map(Value::Object)
            }
            scalar => Some(scalar),
        }
    }

    /// Reads a selection directly out of an object a resolver returned
    fn read_embedded(
        &mut self,
        key: &EntityKey,
        selection_set: &SelectionSet,
        object: &Map<String, Value>,
    ) -> Option<Map<String, Value>> {
        let typename = object.get("__typename").and_then(Value::as_str);
        let variables = self.variables();

        let fields = self.collector.collect(selection_set, typename, &|field| {
            object.contains_key(field.response_key()) || object.contains_key(&field.name)
        });

        let mut output = Map::new();
        for field in fields {
            let response_key = field.response_key();
            let value = object
                .get(response_key)
                .or_else(|| object.get(&field.name))
                .cloned();

            let value = match value {
                Some(value) if field.is_composite() => {
                    let field_key = FieldKey::new(&field.name, resolve_arguments(&field.arguments, variables).as_ref());
                    self.path.push(PathSegment::Field(response_key.to_string()));
                    let value =
                        self.read_resolved(typename, &field.name, &key.embedded(&field_key), &field.selection_set, value);
                    self.path.pop();
                    value
                }
                value => value,
            };

            match value {
                Some(value) => {
                    output.insert(response_key.to_string(), value);
                }
                None if self.is_nullable(typename, &field.name) => {
                    self.partial = true;
                    output.insert(response_key.to_string(), Value::Null);
                }
                None => return None,
            }
        }

        Some(output)
    }

    /// Copies a raw result, reading keyed entities from the store
    fn read_raw_object(
        &mut self,
        typename: Option<&str>,
        selection_set: &SelectionSet,
        data: &Map<String, Value>,
    ) -> Map<String, Value> {
        let fields = self
            .collector
            .collect(selection_set, typename, &|field| data.contains_key(field.response_key()));

        let mut output = Map::new();
        for field in fields {
            let response_key = field.response_key();
            let Some(value) = data.get(response_key) else {
                continue;
            };

            let value = if field.is_composite() {
                self.path.push(PathSegment::Field(response_key.to_string()));
                let value = self.read_raw_value(&field.selection_set, value);
                self.path.pop();
                value
            } else {
                value.clone()
            };

            output.insert(response_key.to_string(), value);
        }

        output
    }

    fn read_raw_value(&mut self, selection_set: &SelectionSet, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        self.path.push(PathSegment::Index(index));
                        let item = self.read_raw_value(selection_set, item);
                        self.path.pop();
                        item
                    })
                    .collect(),
            ),
            Value::Object(object) => {
                if let Some(key) = self.config.keys().key_of_entity(None, object) {
                    if let Some(data) = self.read_entity(&key, selection_set, false) {
                        return Value::Object(data);
                    }
                }
                let typename = object.get("__typename").and_then(Value::as_str);
                Value::Object(self.read_raw_object(typename, selection_set, object))
            }
            other => other.clone(),
        }
    }
}
