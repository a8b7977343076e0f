//! Normalizing results into the store and reading them back out.

mod invalidate;
mod read;
mod selections;
mod write;

use serde_json::{Map, Value};

pub(crate) use self::{
    invalidate::invalidate,
    read::{read_fragment, read_query, read_root},
    selections::FieldCollector,
    write::{write_fragment, write_query},
};
use crate::{
    keys::Dependencies,
    response::{CacheOutcome, GraphqlError},
};

/// The result of reading a selection set out of the store
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    pub data: Option<Map<String, Value>>,
    pub outcome: CacheOutcome,
    /// Everything the read looked at, including what it did not find
    pub dependencies: Dependencies,
    /// Errors raised by resolvers
    pub errors: Vec<GraphqlError>,
}

impl ReadResult {
    pub(crate) fn miss(dependencies: Dependencies) -> Self {
        ReadResult {
            data: None,
            outcome: CacheOutcome::Miss,
            dependencies,
            errors: vec![],
        }
    }
}
