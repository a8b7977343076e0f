//! The replay script: a JSON array of steps, run in order.

use std::{fs, path::Path};

use anyhow::anyhow;
use graphcache::{GraphqlError, RequestPolicy, Variables};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Step {
    /// A client dispatching an operation
    Dispatch(Dispatch),
    /// A client losing interest in an operation it dispatched
    Teardown { key: u64 },
    /// The network answering the last forwarded operation with `key`
    Receive(Receive),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct Dispatch {
    pub key: u64,
    pub query: String,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub request_policy: RequestPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct Receive {
    pub key: u64,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
    #[serde(default)]
    pub network_error: Option<String>,
    #[serde(default)]
    pub extensions: Option<Map<String, Value>>,
}

pub(crate) fn load(path: &Path) -> anyhow::Result<Vec<Step>> {
    let source = fs::read_to_string(path).map_err(|e| anyhow!("error loading script:\n{e}"))?;
    parse(&source)
}

pub(crate) fn parse(source: &str) -> anyhow::Result<Vec<Step>> {
    serde_json::from_str(source).map_err(|e| anyhow!("invalid script: {e}"))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn parses_every_step() {
        let steps = parse(indoc! {r#"
            [
                {"dispatch": {"key": 1, "query": "{ todos { id } }", "requestPolicy": "cache-and-network"}},
                {"receive": {"key": 1, "data": {"todos": []}}},
                {"receive": {"key": 2, "networkError": "offline"}},
                {"teardown": {"key": 1}}
            ]
        "#})
        .unwrap();

        insta::assert_debug_snapshot!(steps, @r#"
        [
            Dispatch(
                Dispatch {
                    key: 1,
                    query: "{ todos { id } }",
                    variables: {},
                    request_policy: CacheAndNetwork,
                },
            ),
            Receive(
                Receive {
                    key: 1,
                    data: Some(
                        {
                            "todos": Array [],
                        },
                    ),
                    errors: [],
                    network_error: None,
                    extensions: None,
                },
            ),
            Receive(
                Receive {
                    key: 2,
                    data: None,
                    errors: [],
                    network_error: Some(
                        "offline",
                    ),
                    extensions: None,
                },
            ),
            Teardown {
                key: 1,
            },
        ]
        "#);
    }

    #[test]
    fn rejects_unknown_steps() {
        let error = parse(r#"[{"refetch": {"key": 1}}]"#).unwrap_err();

        assert!(error.to_string().starts_with("invalid script: unknown variant `refetch`"));
    }
}
