use std::collections::HashMap;

use anyhow::anyhow;
use graphcache::{
    CacheConfig, CacheExchange, Document, ExchangeOutput, NetworkResult, Operation, OperationKey, OperationKind,
};
use serde::Serialize;

use crate::script::{Dispatch, Receive, Step};

/// One line of output
#[derive(Serialize)]
pub(crate) struct Line<'a> {
    pub step: usize,
    #[serde(flatten)]
    pub output: &'a ExchangeOutput,
}

/// Plays the client and the network around a [`CacheExchange`]
pub(crate) struct Replay {
    exchange: CacheExchange,
    dispatched: HashMap<OperationKey, Operation>,
    forwarded: HashMap<OperationKey, Operation>,
}

impl Replay {
    pub fn new(config: CacheConfig) -> Self {
        Replay {
            exchange: CacheExchange::new(config),
            dispatched: HashMap::new(),
            forwarded: HashMap::new(),
        }
    }

    pub fn exchange(&self) -> &CacheExchange {
        &self.exchange
    }

    pub fn step(&mut self, step: Step) -> anyhow::Result<ExchangeOutput> {
        let output = match step {
            Step::Dispatch(Dispatch {
                key,
                query,
                variables,
                request_policy,
            }) => {
                let document = Document::parse(&query)?;
                let operation = Operation::new(OperationKey(key), document, variables).with_policy(request_policy);

                self.dispatched.insert(operation.key, operation.clone());
                self.exchange.dispatch(operation)
            }
            Step::Teardown { key } => {
                let operation = self
                    .dispatched
                    .remove(&OperationKey(key))
                    .ok_or_else(|| anyhow!("operation {key} was never dispatched"))?;

                self.forwarded.remove(&operation.key);
                self.exchange.dispatch(operation.teardown())
            }
            Step::Receive(Receive {
                key,
                data,
                errors,
                network_error,
                extensions,
            }) => {
                let operation = self
                    .forwarded
                    .get(&OperationKey(key))
                    .cloned()
                    .ok_or_else(|| anyhow!("operation {key} was never forwarded"))?;

                self.exchange.receive(NetworkResult {
                    operation,
                    data,
                    errors,
                    network_error,
                    extensions,
                })
            }
        };

        for operation in &output.forward {
            if operation.kind != OperationKind::Teardown {
                self.forwarded.insert(operation.key, operation.clone());
            }
        }

        Ok(output)
    }
}
