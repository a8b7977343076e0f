use serde_json::{Map, Value};

use super::FieldCollector;
use crate::{
    ast::{resolve_arguments, Document, OperationType, SelectionSet, Variables},
    config::CacheConfig,
    error::{DocumentError, SchemaMismatch},
    keys::{Dependencies, EntityKey, FieldKey},
    store::{Link, Store, WriteTarget},
};

/// Normalizes the result of the main operation of `document` into the store.
///
/// Fields of the query root are stored on the root entity.  Fields of the
/// mutation and subscription roots are not stored, only the entities below them.
pub(crate) fn write_query(
    store: &mut Store,
    config: &CacheConfig,
    target: WriteTarget,
    document: &Document,
    variables: &Variables,
    data: &Map<String, Value>,
) -> Result<Dependencies, DocumentError> {
    let operation = document.main_operation()?;
    let typename = config.root_typename(operation.operation_type);
    let root_key = EntityKey::new(typename);

    let mut writer = Writer {
        store,
        config,
        target,
        collector: FieldCollector::new(&document.fragments, variables, config.schema()),
        dependencies: Dependencies::default(),
    };

    let _span = tracing::debug_span!("write", operation = operation.operation_type.as_str()).entered();
    writer.write_selection(
        &root_key,
        Some(typename),
        &operation.selection_set,
        data,
        Some(operation.operation_type),
    );

    Ok(writer.dependencies)
}

/// Writes `data` as a fragment of the entity it describes
pub(crate) fn write_fragment(
    store: &mut Store,
    config: &CacheConfig,
    target: WriteTarget,
    document: &Document,
    data: &Map<String, Value>,
    variables: &Variables,
    fragment_name: Option<&str>,
) -> Result<Dependencies, DocumentError> {
    let fragment = document.select_fragment(fragment_name)?;
    let typename = data
        .get("__typename")
        .and_then(Value::as_str)
        .unwrap_or(&fragment.type_condition);

    let Some(key) = config.keys().key_of_entity(Some(typename), data) else {
        tracing::warn!(
            "can't write the fragment {}: no key could be generated for the data, make sure it selects the key fields",
            fragment.name
        );
        return Ok(Dependencies::default());
    };

    let mut writer = Writer {
        store,
        config,
        target,
        collector: FieldCollector::new(&document.fragments, variables, config.schema()),
        dependencies: Dependencies::default(),
    };
    writer.write_selection(&key, Some(typename), &fragment.selection_set, data, None);

    Ok(writer.dependencies)
}

struct Writer<'a> {
    store: &'a mut Store,
    config: &'a CacheConfig,
    target: WriteTarget,
    collector: FieldCollector<'a>,
    dependencies: Dependencies,
}

impl Writer<'_> {
    fn write_selection(
        &mut self,
        key: &EntityKey,
        typename: Option<&str>,
        selection_set: &SelectionSet,
        data: &Map<String, Value>,
        root: Option<OperationType>,
    ) {
        let stores_fields = matches!(root, None | Some(OperationType::Query));

        if let (None, Some(typename)) = (root, typename) {
            let dependency = self.store.write_record(
                self.target,
                key,
                &FieldKey::new("__typename", None),
                Value::String(typename.to_string()),
            );
            self.dependencies.insert(dependency);
        }

        let variables = self.collector.variables();
        let fields = self
            .collector
            .collect(selection_set, typename, &|field| data.contains_key(field.response_key()));

        for field in fields {
            let response_key = field.response_key();
            if field.name == "__typename" {
                continue;
            }

            let Some(value) = data.get(response_key) else {
                tracing::warn!("invalid undefined: the field at `{key}.{response_key}` is missing from the result");
                continue;
            };

            if let (Some(schema), Some(typename)) = (self.config.schema(), typename) {
                if !schema.field_exists(typename, &field.name) {
                    let mismatch = SchemaMismatch {
                        typename: typename.to_string(),
                        field: field.name.clone(),
                    };
                    tracing::warn!("writing a field that is unknown to the schema: {mismatch}");
                }
            }

            let field_key = FieldKey::new(&field.name, resolve_arguments(&field.arguments, variables).as_ref());

            if !field.is_composite() {
                if stores_fields {
                    let dependency = self.store.write_record(self.target, key, &field_key, value.clone());
                    self.dependencies.insert(dependency);
                }
                continue;
            }

            let link = self.write_field(&key.embedded(&field_key), &field.selection_set, value);
            if stores_fields {
                let dependency = self.store.write_link(self.target, key, &field_key, link);
                self.dependencies.insert(dependency);
            }
        }
    }

    fn write_field(&mut self, embedded_key: &EntityKey, selection_set: &SelectionSet, value: &Value) -> Link {
        match value {
            Value::Null => Link::Null,
            Value::Array(items) => Link::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.write_field(&embedded_key.indexed(index), selection_set, item))
                    .collect(),
            ),
            Value::Object(object) => {
                let typename = object.get("__typename").and_then(Value::as_str);
                if typename.is_none() {
                    tracing::warn!("couldn't find __typename when writing `{embedded_key}`, add it to the selection set");
                }

                let key = self
                    .config
                    .keys()
                    .key_of_entity(typename, object)
                    .unwrap_or_else(|| embedded_key.clone());

                self.write_selection(&key, typename, selection_set, object, None);
                Link::Entity(key)
            }
            scalar => {
                tracing::warn!("invalid value at `{embedded_key}`: expected an object or a list, found {scalar}");
                Link::Null
            }
        }
    }
}
