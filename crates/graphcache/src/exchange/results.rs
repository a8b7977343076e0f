use std::{collections::HashMap, fmt};

use serde_json::{Map, Value};

use super::Operation;
use crate::{
    ast::{DocumentHash, Variables},
    keys::OperationKey,
    response::{CacheOutcome, GraphqlError},
};

/// A result coming back from the network for a forwarded operation
#[derive(Debug, Clone)]
pub struct NetworkResult {
    pub operation: Operation,
    pub data: Option<Map<String, Value>>,
    pub errors: Vec<GraphqlError>,
    /// The request failed before the server could answer
    pub network_error: Option<String>,
    pub extensions: Option<Map<String, Value>>,
}

impl NetworkResult {
    pub fn data(operation: Operation, data: Map<String, Value>) -> Self {
        NetworkResult {
            operation,
            data: Some(data),
            errors: vec![],
            network_error: None,
            extensions: None,
        }
    }

    pub fn network_error(operation: Operation, message: impl Into<String>) -> Self {
        NetworkResult {
            operation,
            data: None,
            errors: vec![],
            network_error: Some(message.into()),
            extensions: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<GraphqlError>) -> Self {
        self.errors = errors;
        self
    }
}

/// The network and GraphQL errors of a result
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub graphql_errors: Vec<GraphqlError>,
}

impl CombinedError {
    /// `None` when there is nothing to report
    pub fn new(network_error: Option<String>, graphql_errors: Vec<GraphqlError>) -> Option<Self> {
        if network_error.is_none() && graphql_errors.is_empty() {
            return None;
        }

        Some(CombinedError {
            network_error,
            graphql_errors,
        })
    }
}

impl fmt::Display for CombinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(network_error) = &self.network_error {
            writeln!(f, "[Network] {network_error}")?;
        }
        for error in &self.graphql_errors {
            writeln!(f, "[GraphQL] {error}")?;
        }
        Ok(())
    }
}

/// A result emitted by the exchange
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub operation: Operation,
    pub data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CombinedError>,
    /// More data is on its way, or the data depends on a prediction
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl OperationResult {
    pub fn cache_outcome(&self) -> Option<CacheOutcome> {
        self.operation.context.meta.cache_outcome
    }
}

/// Everything a call into the exchange produced
#[derive(Debug, Default, serde::Serialize)]
pub struct ExchangeOutput {
    /// Results to hand back to whoever dispatched the operations
    pub results: Vec<OperationResult>,
    /// Operations to send to the network
    pub forward: Vec<Operation>,
}

impl ExchangeOutput {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.forward.is_empty()
    }

    /// The emitted results of one operation, in order
    pub fn results_for(&self, key: OperationKey) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(move |result| result.operation.key == key)
    }
}

/// The last result read for an active query
#[derive(Debug, Clone)]
pub(crate) struct CachedResult {
    pub document: DocumentHash,
    pub variables: Variables,
    pub data: Option<Map<String, Value>>,
    pub outcome: CacheOutcome,
    pub errors: Vec<GraphqlError>,
    /// One of the dependencies of the result was written since it was read
    pub dirty: bool,
}

/// Last results of active queries, by operation
#[derive(Debug, Default)]
pub(crate) struct OperationResultCache {
    results: HashMap<OperationKey, CachedResult>,
}

impl OperationResultCache {
    /// A result that is still valid for the given document and variables
    pub fn fresh(&self, key: OperationKey, document: DocumentHash, variables: &Variables) -> Option<&CachedResult> {
        self.results
            .get(&key)
            .filter(|cached| !cached.dirty && cached.document == document && cached.variables == *variables)
    }

    pub fn outcome(&self, key: OperationKey) -> Option<CacheOutcome> {
        self.results.get(&key).map(|cached| cached.outcome)
    }

    pub fn insert(&mut self, key: OperationKey, result: CachedResult) {
        self.results.insert(key, result);
    }

    pub fn mark_dirty(&mut self, key: OperationKey) {
        if let Some(cached) = self.results.get_mut(&key) {
            cached.dirty = true;
        }
    }

    pub fn remove(&mut self, key: OperationKey) {
        self.results.remove(&key);
    }
}
