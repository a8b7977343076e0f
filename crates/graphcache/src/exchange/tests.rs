use serde_json::{json, Map, Value};

use super::*;
use crate::ast::Document;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(object) => object,
        _ => unreachable!(),
    }
}

fn query(key: u64, source: &str) -> Operation {
    Operation::new(OperationKey(key), Document::parse(source).unwrap(), Map::new())
}

#[test]
fn forwarded_operations_are_formatted() {
    init_logging();
    let mut exchange = CacheExchange::new(CacheConfig::default());

    let output = exchange.dispatch(query(1, "{ todos { id } }"));

    insta::assert_json_snapshot!(output, @r#"
    {
      "results": [],
      "forward": [
        {
          "key": 1,
          "kind": "query",
          "query": "query {\n  todos {\n    id\n    __typename\n  }\n}\n",
          "variables": {},
          "context": {
            "requestPolicy": "cache-first",
            "meta": {}
          }
        }
      ]
    }
    "#);
}

#[test]
fn queries_waiting_for_the_network_are_not_forwarded_again() {
    init_logging();
    let mut exchange = CacheExchange::new(CacheConfig::default());

    let first = exchange.dispatch(query(1, "{ todos { id text } }")).forward.remove(0);
    let second = exchange.dispatch(query(2, "{ todos { id } }")).forward.remove(0);
    assert_eq!(exchange.store().layer_owners(), vec![OperationKey(1), OperationKey(2)]);

    let output = exchange.receive(NetworkResult::data(
        second,
        object(json!({"todos": [{"__typename": "Todo", "id": "1"}]})),
    ));

    // The first query still misses `text` and is already in flight
    assert_eq!(output.results.len(), 1);
    assert_eq!(output.results[0].operation.key, OperationKey(2));
    assert!(output.forward.is_empty());
    assert_eq!(exchange.store().layer_owners(), vec![OperationKey(1), OperationKey(2)]);

    let output = exchange.receive(NetworkResult::data(
        first,
        object(json!({"todos": [{"__typename": "Todo", "id": "1", "text": "Go to the shops"}]})),
    ));
    assert_eq!(output.results.len(), 2);
    assert!(exchange.store().layer_owners().is_empty());
}

#[test]
fn network_errors_release_the_layer() {
    init_logging();
    let mut exchange = CacheExchange::new(CacheConfig::default());

    let first = exchange.dispatch(query(1, "{ todos { id } }")).forward.remove(0);
    let second = exchange.dispatch(query(2, "{ author { id } }")).forward.remove(0);

    let output = exchange.receive(NetworkResult::network_error(first, "connection reset"));
    assert_eq!(output.results.len(), 1);
    let error = output.results[0].error.as_ref().unwrap();
    assert_eq!(error.network_error.as_deref(), Some("connection reset"));
    assert_eq!(output.results[0].data, None);

    exchange.receive(NetworkResult::data(
        second,
        object(json!({"author": {"__typename": "Author", "id": "1"}})),
    ));
    assert!(exchange.store().layer_owners().is_empty());
}

#[test]
fn teardown_forgets_the_operation() {
    init_logging();
    let mut exchange = CacheExchange::new(CacheConfig::default());

    let operation = query(1, "{ todos { id } }");
    exchange.dispatch(operation.clone());
    assert!(exchange.dependencies(OperationKey(1)).is_some());

    let output = exchange.dispatch(operation.teardown());
    assert_eq!(output.forward.len(), 1);
    assert_eq!(output.forward[0].kind, OperationKind::Teardown);
    assert!(exchange.dependencies(OperationKey(1)).is_none());
    assert!(exchange.store().layer_owners().is_empty());
}

#[test]
fn hits_are_not_forwarded() {
    init_logging();
    let mut exchange = CacheExchange::new(CacheConfig::default());

    let forwarded = exchange.dispatch(query(1, "{ todos { id } }")).forward.remove(0);
    exchange.receive(NetworkResult::data(
        forwarded,
        object(json!({"todos": [{"__typename": "Todo", "id": "1"}]})),
    ));

    for _ in 0..2 {
        let output = exchange.dispatch(query(1, "{ todos { id } }"));
        assert!(output.forward.is_empty());
        assert_eq!(output.results[0].cache_outcome(), Some(CacheOutcome::Hit));
        assert!(!output.results[0].stale);
    }

    let output = exchange.dispatch(query(1, "{ todos { id } }").with_policy(RequestPolicy::CacheAndNetwork));
    assert_eq!(output.results[0].cache_outcome(), Some(CacheOutcome::Hit));
    assert!(output.results[0].stale);
    assert_eq!(output.forward[0].context.request_policy, RequestPolicy::NetworkOnly);
}

#[test]
fn graphql_errors_are_passed_through() {
    init_logging();
    let mut exchange = CacheExchange::new(CacheConfig::default());

    let forwarded = exchange.dispatch(query(1, "{ todos { id } }")).forward.remove(0);
    exchange.clear_documents();

    let output = exchange.receive(
        NetworkResult::data(forwarded, object(json!({"todos": []})))
            .with_errors(vec![GraphqlError::new("not allowed")]),
    );

    let error = output.results[0].error.as_ref().unwrap();
    assert_eq!(error.network_error, None);
    assert_eq!(error.graphql_errors, vec![GraphqlError::new("not allowed")]);
    assert_eq!(output.results[0].data, Some(object(json!({"todos": []}))));
}
