//! Update functions and optimistic predictions for root fields.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::{Map, Value};

use crate::{
    ast::{resolve_arguments, Fragments, OperationDefinition, Variables},
    cache::{CacheReader, CacheWriter},
    config::CacheConfig,
    error::UpdateError,
    keys::{Dependencies, EntityKey, FieldKey},
    operations::FieldCollector,
    resolvers::ResolveInfo,
    store::{Store, WriteTarget},
};

/// Runs after the result of a root field has been written, to update other
/// cached data.
///
/// `result` is the whole data of the operation.  Updates run for mutation
/// fields even when their value is `null`.
pub trait UpdateResolver: Send + Sync {
    fn update(
        &self,
        result: &Map<String, Value>,
        arguments: &Map<String, Value>,
        cache: &mut CacheWriter<'_>,
        info: &ResolveInfo<'_>,
    ) -> Result<(), UpdateError>;
}

impl<F> UpdateResolver for F
where
    F: Fn(&Map<String, Value>, &Map<String, Value>, &mut CacheWriter<'_>, &ResolveInfo<'_>) -> Result<(), UpdateError>
        + Send
        + Sync,
{
    fn update(
        &self,
        result: &Map<String, Value>,
        arguments: &Map<String, Value>,
        cache: &mut CacheWriter<'_>,
        info: &ResolveInfo<'_>,
    ) -> Result<(), UpdateError> {
        self(result, arguments, cache, info)
    }
}

/// Predicts the result of a mutation field before the server responds
pub trait OptimisticResolver: Send + Sync {
    fn predict(
        &self,
        arguments: &Map<String, Value>,
        cache: &CacheReader<'_>,
        info: &ResolveInfo<'_>,
    ) -> Result<Value, UpdateError>;
}

impl<F> OptimisticResolver for F
where
    F: Fn(&Map<String, Value>, &CacheReader<'_>, &ResolveInfo<'_>) -> Result<Value, UpdateError> + Send + Sync,
{
    fn predict(
        &self,
        arguments: &Map<String, Value>,
        cache: &CacheReader<'_>,
        info: &ResolveInfo<'_>,
    ) -> Result<Value, UpdateError> {
        self(arguments, cache, info)
    }
}

#[derive(Clone, Default)]
pub struct UpdateRegistry {
    updaters: HashMap<String, HashMap<String, Arc<dyn UpdateResolver>>>,
}

impl UpdateRegistry {
    pub(crate) fn insert(&mut self, typename: String, field: String, updater: Arc<dyn UpdateResolver>) {
        self.updaters.entry(typename).or_default().insert(field, updater);
    }

    pub fn get(&self, typename: &str, field: &str) -> Option<&dyn UpdateResolver> {
        self.updaters.get(typename)?.get(field).map(Arc::as_ref)
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.updaters.iter().flat_map(|(typename, fields)| {
            fields
                .keys()
                .map(move |field| (typename.as_str(), field.as_str()))
        })
    }
}

impl fmt::Debug for UpdateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields()).finish()
    }
}

/// Optimistic predictors by mutation field name
#[derive(Clone, Default)]
pub struct OptimisticRegistry {
    predictors: HashMap<String, Arc<dyn OptimisticResolver>>,
}

impl OptimisticRegistry {
    pub(crate) fn insert(&mut self, field: String, predictor: Arc<dyn OptimisticResolver>) {
        self.predictors.insert(field, predictor);
    }

    pub fn get(&self, field: &str) -> Option<&dyn OptimisticResolver> {
        self.predictors.get(field).map(Arc::as_ref)
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = &str> {
        self.predictors.keys().map(String::as_str)
    }
}

impl fmt::Debug for OptimisticRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields()).finish()
    }
}

/// Where a mutation is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationState {
    Dispatched,
    OptimisticApplied,
    AwaitingNetwork,
    Reconciled,
    Done,
}

impl MutationState {
    /// The state after the operation was torn down.  Returns whether an
    /// optimistic layer has to be discarded.
    pub fn teardown(&mut self) -> bool {
        let discard = matches!(self, MutationState::OptimisticApplied | MutationState::AwaitingNetwork);
        *self = MutationState::Done;
        discard
    }
}

/// Predicts the data of the root fields that have an optimistic predictor.
///
/// Returns `None` when no included root field has one.
pub(crate) fn predict(
    store: &Store,
    config: &CacheConfig,
    operation: &OperationDefinition,
    fragments: &Fragments,
    variables: &Variables,
) -> Option<Map<String, Value>> {
    let root_typename = config.root_typename(operation.operation_type);
    let root_key = EntityKey::new(root_typename);
    let collector = FieldCollector::new(fragments, variables, config.schema());

    let mut data = Map::new();
    for field in collector.collect(&operation.selection_set, Some(root_typename), &|_| true) {
        let Some(predictor) = config.optimistic().get(&field.name) else {
            continue;
        };

        let arguments = resolve_arguments(&field.arguments, variables).unwrap_or_default();
        let field_key = FieldKey::new(&field.name, Some(&arguments));
        let info = ResolveInfo {
            parent_typename: root_typename,
            parent_key: &root_key,
            parent_field_key: &field_key,
            field_name: &field.name,
            variables,
            path: &[],
        };

        let reader = CacheReader::new(store, config);
        match predictor.predict(&arguments, &reader, &info) {
            Ok(value) => {
                data.insert(field.response_key().to_string(), value);
            }
            Err(error) => tracing::warn!("optimistic prediction for {root_typename}.{} failed: {error}", field.name),
        }
    }

    (!data.is_empty()).then_some(data)
}

/// Runs the update functions of every root field present in `data`.
pub(crate) fn run_updates(
    store: &mut Store,
    config: &CacheConfig,
    target: WriteTarget,
    operation: &OperationDefinition,
    fragments: &Fragments,
    variables: &Variables,
    data: &Map<String, Value>,
) -> Dependencies {
    let root_typename = config.root_typename(operation.operation_type);
    let root_key = EntityKey::new(root_typename);
    let collector = FieldCollector::new(fragments, variables, config.schema());
    let mut writer = CacheWriter::new(store, config, target);

    for field in collector.collect(&operation.selection_set, Some(root_typename), &|field| {
        data.contains_key(field.response_key())
    }) {
        if !data.contains_key(field.response_key()) {
            continue;
        }
        let Some(updater) = config.updates().get(root_typename, &field.name) else {
            continue;
        };

        let arguments = resolve_arguments(&field.arguments, variables).unwrap_or_default();
        let field_key = FieldKey::new(&field.name, Some(&arguments));
        let info = ResolveInfo {
            parent_typename: root_typename,
            parent_key: &root_key,
            parent_field_key: &field_key,
            field_name: &field.name,
            variables,
            path: &[],
        };

        let _span = tracing::debug_span!("update", field = %field_key).entered();
        if let Err(error) = updater.update(data, &arguments, &mut writer, &info) {
            tracing::warn!("update for {root_typename}.{} failed: {error}", field.name);
        }
    }

    writer.into_touched()
}

#[cfg(test)]
mod tests {
    use super::MutationState;

    #[test]
    fn teardown_discards_only_unreconciled_predictions() {
        let mut state = MutationState::OptimisticApplied;
        assert!(state.teardown());
        assert_eq!(state, MutationState::Done);

        let mut state = MutationState::Reconciled;
        assert!(!state.teardown());
        assert_eq!(state, MutationState::Done);
    }
}
