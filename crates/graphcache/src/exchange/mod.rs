//! The cache exchange: sequences reads, writes, layers and re-execution for
//! every operation and network result passing through.
//!
//! The exchange performs no I/O.  [`CacheExchange::dispatch`] takes operations
//! from the client and [`CacheExchange::receive`] takes results from the
//! network, and both return the results to emit and the operations to forward.

mod dependencies;
mod operation;
mod results;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use indexmap::IndexMap;
use serde_json::{Map, Value};

pub use self::{
    operation::{Operation, OperationContext, OperationKind, OperationMeta, RequestPolicy},
    results::{CombinedError, ExchangeOutput, NetworkResult, OperationResult},
};
use self::{
    dependencies::DependencyIndex,
    results::{CachedResult, OperationResultCache},
};
use crate::{
    ast::{normalize_variables, OperationType},
    cache::CacheReader,
    config::CacheConfig,
    documents::DocumentCache,
    keys::{Dependencies, OperationKey},
    operations,
    response::{CacheOutcome, GraphqlError},
    store::{Store, WriteTarget},
    updates::{self, MutationState},
};

pub struct CacheExchange {
    config: CacheConfig,
    store: Store,
    documents: DocumentCache,
    /// Queries that have been dispatched and not torn down, in dispatch order
    active: IndexMap<OperationKey, Operation>,
    /// Queries forwarded and still waiting for their result
    in_flight: HashSet<OperationKey>,
    dependencies: DependencyIndex,
    results: OperationResultCache,
    mutations: HashMap<OperationKey, MutationState>,
}

impl CacheExchange {
    pub fn new(config: CacheConfig) -> Self {
        let settings = config.settings();

        CacheExchange {
            store: Store::new(config.root_typename(OperationType::Query)),
            documents: DocumentCache::new(settings.document_cache_limit, settings.add_typenames),
            config,
            active: IndexMap::new(),
            in_flight: HashSet::new(),
            dependencies: DependencyIndex::default(),
            results: OperationResultCache::default(),
            mutations: HashMap::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Read access to the cache outside of any operation
    pub fn cache(&self) -> CacheReader<'_> {
        CacheReader::new(&self.store, &self.config)
    }

    pub fn mutation_state(&self, key: OperationKey) -> Option<MutationState> {
        self.mutations.get(&key).copied()
    }

    /// What the last read of an active query depended on
    pub fn dependencies(&self, key: OperationKey) -> Option<&Dependencies> {
        self.dependencies.get(key)
    }

    /// Forgets every formatted document
    pub fn clear_documents(&self) {
        self.documents.clear();
    }

    pub fn dispatch(&mut self, operation: Operation) -> ExchangeOutput {
        let _span = tracing::debug_span!("dispatch", key = %operation.key, kind = ?operation.kind).entered();
        let mut output = ExchangeOutput::default();

        match operation.kind {
            OperationKind::Teardown => self.teardown(operation, &mut output),
            OperationKind::Query => {
                let operation = self.prepare(operation);
                self.active.insert(operation.key, operation.clone());
                self.execute_query(operation, false, &mut output);
            }
            OperationKind::Mutation => {
                let operation = self.prepare(operation);
                self.execute_mutation(operation, &mut output);
            }
            OperationKind::Subscription => {
                let operation = self.prepare(operation);
                output.forward.push(operation);
            }
        }

        output
    }

    pub fn receive(&mut self, result: NetworkResult) -> ExchangeOutput {
        let NetworkResult {
            operation,
            data,
            mut errors,
            network_error,
            extensions,
        } = result;

        let _span = tracing::debug_span!("receive", key = %operation.key, kind = ?operation.kind).entered();
        let mut output = ExchangeOutput::default();

        if operation.kind == OperationKind::Teardown {
            tracing::warn!("ignoring a result for the teardown of operation {}", operation.key);
            return output;
        }

        let operation = self.prepare(operation);
        let key = operation.key;
        self.in_flight.remove(&key);

        let data = match data {
            Some(data) if network_error.is_none() => data,
            data => {
                tracing::debug!("operation {key} failed, releasing its layer");
                let touched = self.release(key);

                output.results.push(OperationResult {
                    operation: operation.with_outcome(None),
                    data,
                    error: CombinedError::new(network_error, errors),
                    stale: false,
                    extensions,
                });
                self.reexecute(touched, Some(key), &mut output);

                return output;
            }
        };

        let (target, mut touched) = self
            .store
            .begin_result(key, operation.kind == OperationKind::Subscription);
        touched.extend(self.write_result(target, &operation, &data));

        if let Some(state) = self.mutations.get_mut(&key) {
            *state = MutationState::Reconciled;
        }
        self.store.settle(key);

        let (data, read_errors) = self.read_back(&operation, data);
        errors.extend(read_errors);

        output.results.push(OperationResult {
            operation: operation.with_outcome(None),
            data: Some(data),
            error: CombinedError::new(None, errors),
            stale: false,
            extensions,
        });
        self.reexecute(touched, Some(key), &mut output);

        if let Some(state) = self.mutations.get_mut(&key) {
            *state = MutationState::Done;
        }

        output
    }

    /// Formats the document of an operation and normalizes its variables
    fn prepare(&self, operation: Operation) -> Operation {
        let document = match self.documents.format(&operation.document) {
            Ok(document) => document,
            Err(error) => {
                tracing::warn!("could not format the document of operation {}: {error}", operation.key);
                Arc::clone(&operation.document)
            }
        };
        let variables = normalize_variables(document.operation(), &operation.variables);

        operation.with_document(document, variables)
    }

    fn execute_query(&mut self, operation: Operation, reexecuting: bool, output: &mut ExchangeOutput) {
        let policy = operation.context.request_policy;
        if policy == RequestPolicy::NetworkOnly {
            self.forward(operation, reexecuting, output);
            return;
        }

        let previous = self.results.outcome(operation.key);
        let Some(cached) = self.read(&operation) else {
            self.forward(operation, reexecuting, output);
            return;
        };

        tracing::debug!("operation {} read as {}", operation.key, cached.outcome);

        if cached.outcome == CacheOutcome::Miss {
            if policy == RequestPolicy::CacheOnly {
                output.results.push(OperationResult {
                    operation: operation.with_outcome(Some(CacheOutcome::Miss)),
                    data: None,
                    error: None,
                    stale: false,
                    extensions: None,
                });
                return;
            }

            // Data that was served before is gone
            if reexecuting && matches!(previous, Some(CacheOutcome::Hit | CacheOutcome::Partial)) {
                output.results.push(OperationResult {
                    operation: operation.clone().with_outcome(Some(CacheOutcome::Miss)),
                    data: None,
                    error: None,
                    stale: true,
                    extensions: None,
                });
            }
            self.forward(operation, reexecuting, output);
            return;
        }

        let optimistic = self
            .dependencies
            .get(operation.key)
            .is_some_and(|dependencies| self.store.depends_on_optimistic(dependencies));
        let refetch = match policy {
            RequestPolicy::CacheOnly => false,
            RequestPolicy::CacheAndNetwork => true,
            RequestPolicy::CacheFirst | RequestPolicy::NetworkOnly => cached.outcome == CacheOutcome::Partial,
        };

        output.results.push(OperationResult {
            operation: operation.clone().with_outcome(Some(cached.outcome)),
            data: cached.data,
            error: CombinedError::new(None, cached.errors),
            stale: refetch || optimistic,
            extensions: None,
        });

        // Refetching now would race the prediction, the query is re-executed
        // once the prediction goes away.
        if refetch && !optimistic {
            self.forward(operation.with_policy(RequestPolicy::NetworkOnly), reexecuting, output);
        }
    }

    fn execute_mutation(&mut self, operation: Operation, output: &mut ExchangeOutput) {
        let key = operation.key;
        self.mutations.insert(key, MutationState::Dispatched);
        self.store.reserve_layer(key);

        let prediction = operation.document.operation().and_then(|definition| {
            updates::predict(
                &self.store,
                &self.config,
                definition,
                &operation.document.fragments,
                &operation.variables,
            )
        });

        if let Some(prediction) = prediction {
            tracing::debug!("applying optimistic result of operation {key}");
            let (target, mut touched) = self.store.begin_optimistic(key);
            touched.extend(self.write_result(target, &operation, &prediction));
            self.mutations.insert(key, MutationState::OptimisticApplied);
            self.reexecute(touched, None, output);
        }

        self.mutations.insert(key, MutationState::AwaitingNetwork);
        output.forward.push(operation.with_outcome(None));
    }

    fn teardown(&mut self, operation: Operation, output: &mut ExchangeOutput) {
        let key = operation.key;
        self.active.shift_remove(&key);
        self.in_flight.remove(&key);
        self.dependencies.remove(key);
        self.results.remove(key);

        let touched = self.release(key);
        self.mutations.remove(&key);
        output.forward.push(operation);
        self.reexecute(touched, Some(key), output);
    }

    /// Gives up the layer of an operation that will not get a usable result
    fn release(&mut self, key: OperationKey) -> Dependencies {
        match self.mutations.get_mut(&key).map(MutationState::teardown) {
            Some(true) => self.store.remove_layer(key),
            _ => self.store.teardown(key),
        }
    }

    fn forward(&mut self, operation: Operation, reexecuting: bool, output: &mut ExchangeOutput) {
        let key = operation.key;
        if reexecuting && self.in_flight.contains(&key) {
            tracing::debug!("operation {key} is already waiting for the network");
            return;
        }

        self.in_flight.insert(key);
        self.store.reserve_layer(key);
        output.forward.push(operation.with_outcome(None));
    }

    /// Reads an active query, reusing its last result while nothing it
    /// depends on changed
    fn read(&mut self, operation: &Operation) -> Option<CachedResult> {
        let document = operation.document.hash();
        if let Some(cached) = self.results.fresh(operation.key, document, &operation.variables) {
            return Some(cached.clone());
        }

        let result = match operations::read_query(&self.store, &self.config, &operation.document, &operation.variables) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!("could not read operation {}: {error}", operation.key);
                return None;
            }
        };

        self.dependencies.set(operation.key, result.dependencies);
        let cached = CachedResult {
            document,
            variables: operation.variables.clone(),
            data: result.data,
            outcome: result.outcome,
            errors: result.errors,
            dirty: false,
        };
        self.results.insert(operation.key, cached.clone());

        Some(cached)
    }

    /// The data to emit for a result that was just written.  Falls back to
    /// the network data when the store can't answer.
    fn read_back(&mut self, operation: &Operation, data: Map<String, Value>) -> (Map<String, Value>, Vec<GraphqlError>) {
        if operation.kind != OperationKind::Query {
            return match operations::read_root(
                &self.store,
                &self.config,
                &operation.document,
                &operation.variables,
                &data,
            ) {
                Ok(result) => (result.data.unwrap_or(data), result.errors),
                Err(error) => {
                    tracing::warn!("could not read back operation {}: {error}", operation.key);
                    (data, vec![])
                }
            };
        }

        if !self.active.contains_key(&operation.key) {
            return match operations::read_query(&self.store, &self.config, &operation.document, &operation.variables) {
                Ok(result) => (result.data.unwrap_or(data), result.errors),
                Err(_) => (data, vec![]),
            };
        }

        self.results.mark_dirty(operation.key);
        match self.read(operation) {
            Some(CachedResult {
                data: Some(read),
                errors,
                ..
            }) => (read, errors),
            _ => {
                tracing::debug!("operation {} can't be read back, emitting the network data", operation.key);
                (data, vec![])
            }
        }
    }

    fn write_result(&mut self, target: WriteTarget, operation: &Operation, data: &Map<String, Value>) -> Dependencies {
        let document = &operation.document;

        let mut touched =
            match operations::write_query(&mut self.store, &self.config, target, document, &operation.variables, data) {
                Ok(touched) => touched,
                Err(error) => {
                    tracing::warn!("could not write the result of operation {}: {error}", operation.key);
                    Dependencies::default()
                }
            };

        if matches!(operation.kind, OperationKind::Mutation | OperationKind::Subscription) {
            if let Some(definition) = document.operation() {
                touched.extend(updates::run_updates(
                    &mut self.store,
                    &self.config,
                    target,
                    definition,
                    &document.fragments,
                    &operation.variables,
                    data,
                ));
            }
        }

        touched
    }

    /// Re-reads every active query that depends on one of `touched`
    fn reexecute(&mut self, touched: Dependencies, exclude: Option<OperationKey>, output: &mut ExchangeOutput) {
        let dependents = self.dependencies.dependents(&touched);

        for key in dependents {
            if Some(key) == exclude {
                continue;
            }
            self.results.mark_dirty(key);

            let Some(operation) = self.active.get(&key).cloned() else {
                continue;
            };

            let policy = match (operation.context.request_policy, self.results.outcome(key)) {
                (RequestPolicy::CacheOnly, _) => RequestPolicy::CacheOnly,
                (_, Some(CacheOutcome::Partial)) => RequestPolicy::CacheAndNetwork,
                _ => RequestPolicy::CacheFirst,
            };

            tracing::debug!("re-executing operation {key}");
            self.execute_query(operation.with_policy(policy), true, output);
        }
    }
}

#[cfg(test)]
mod tests;
