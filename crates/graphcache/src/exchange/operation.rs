use serde::Serializer;

use crate::{
    ast::{OperationType, SharedDocument, Variables},
    keys::OperationKey,
    response::CacheOutcome,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
    Teardown,
}

impl From<OperationType> for OperationKind {
    fn from(value: OperationType) -> Self {
        match value {
            OperationType::Query => OperationKind::Query,
            OperationType::Mutation => OperationKind::Mutation,
            OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

/// How a query uses the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestPolicy {
    /// Served from the cache when complete, forwarded otherwise
    #[default]
    CacheFirst,
    /// Never forwarded, a miss is emitted as `null` data
    CacheOnly,
    /// Always forwarded without reading the cache
    NetworkOnly,
    /// Served from the cache when possible and forwarded anyway
    CacheAndNetwork,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMeta {
    /// Set on results served at least partly from the cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_outcome: Option<CacheOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
    #[serde(default)]
    pub request_policy: RequestPolicy,
    #[serde(default)]
    pub meta: OperationMeta,
}

/// An operation passing through the exchange
#[derive(Debug, Clone, serde::Serialize)]
pub struct Operation {
    pub key: OperationKey,
    pub kind: OperationKind,
    #[serde(rename = "query", serialize_with = "print_document")]
    pub document: SharedDocument,
    pub variables: Variables,
    pub context: OperationContext,
}

impl Operation {
    /// An operation of the kind its document declares
    pub fn new(key: OperationKey, document: impl Into<SharedDocument>, variables: Variables) -> Self {
        let document = document.into();
        let kind = document
            .operation_type()
            .map(OperationKind::from)
            .unwrap_or(OperationKind::Query);

        Operation {
            key,
            kind,
            document,
            variables,
            context: OperationContext::default(),
        }
    }

    pub fn with_policy(mut self, request_policy: RequestPolicy) -> Self {
        self.context.request_policy = request_policy;
        self
    }

    /// The teardown of this operation
    pub fn teardown(&self) -> Self {
        Operation {
            kind: OperationKind::Teardown,
            context: OperationContext::default(),
            ..self.clone()
        }
    }

    pub(crate) fn with_document(mut self, document: SharedDocument, variables: Variables) -> Self {
        self.document = document;
        self.variables = variables;
        self
    }

    pub(crate) fn with_outcome(mut self, outcome: Option<CacheOutcome>) -> Self {
        self.context.meta.cache_outcome = outcome;
        self
    }
}

fn print_document<S: Serializer>(document: &SharedDocument, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(document)
}
