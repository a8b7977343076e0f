#![allow(dead_code)]

use graphcache::{
    CacheConfig, CacheExchange, CacheOutcome, Document, ExchangeOutput, NetworkResult, Operation, OperationKey,
    OperationResult, SchemaPredicates,
};
use serde_json::{Map, Value};

pub const SCHEMA: &str = include_str!("../fixtures/todos.introspection.json");

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn schema() -> SchemaPredicates {
    SchemaPredicates::from_introspection_json(SCHEMA).unwrap()
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(object) => object,
        other => unreachable!("expected an object, got {other}"),
    }
}

pub fn operation(key: u64, source: &str, variables: Value) -> Operation {
    Operation::new(OperationKey(key), Document::parse(source).unwrap(), object(variables))
}

/// Drives an exchange the way a client and a network would, and remembers
/// everything it emitted and forwarded.
pub struct Client {
    pub exchange: CacheExchange,
    pub emitted: Vec<OperationResult>,
    pub forwarded: Vec<Operation>,
}

impl Client {
    pub fn new(config: CacheConfig) -> Self {
        init_logging();
        Client {
            exchange: CacheExchange::new(config),
            emitted: vec![],
            forwarded: vec![],
        }
    }

    pub fn dispatch(&mut self, operation: Operation) -> ExchangeOutput {
        let output = self.exchange.dispatch(operation);
        self.record(&output);
        output
    }

    /// Answers the last forwarded operation with `key`
    pub fn respond(&mut self, key: u64, data: Value) -> ExchangeOutput {
        let operation = self.forwarded_operation(key);
        let output = self.exchange.receive(NetworkResult::data(operation, object(data)));
        self.record(&output);
        output
    }

    pub fn fail(&mut self, key: u64, message: &str) -> ExchangeOutput {
        let operation = self.forwarded_operation(key);
        let output = self.exchange.receive(NetworkResult::network_error(operation, message));
        self.record(&output);
        output
    }

    pub fn forwarded_operation(&self, key: u64) -> Operation {
        self.forwarded
            .iter()
            .rev()
            .find(|operation| operation.key == OperationKey(key))
            .cloned()
            .expect("the operation was never forwarded")
    }

    /// The data of every result emitted for `key`, in order
    pub fn emitted_data(&self, key: u64) -> Vec<Option<Map<String, Value>>> {
        self.emitted
            .iter()
            .filter(|result| result.operation.key == OperationKey(key))
            .map(|result| result.data.clone())
            .collect()
    }

    /// Reads a query straight out of the cache
    pub fn read(&self, source: &str, variables: Value) -> Option<Map<String, Value>> {
        let document = Document::parse(source).unwrap().with_typenames().unwrap();
        self.exchange
            .cache()
            .read_query(&document, &object(variables))
            .unwrap()
    }

    fn record(&mut self, output: &ExchangeOutput) {
        self.emitted.extend(output.results.iter().cloned());
        self.forwarded.extend(output.forward.iter().cloned());
    }
}

pub fn outcomes(output: &ExchangeOutput) -> Vec<(OperationKey, Option<CacheOutcome>)> {
    output
        .results
        .iter()
        .map(|result| (result.operation.key, result.cache_outcome()))
        .collect()
}
