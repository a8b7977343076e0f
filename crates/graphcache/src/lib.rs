//! A normalized, layered cache for GraphQL responses.
//!
//! Results are split into entities keyed by their typename and id, and
//! queries are answered by walking those entities instead of replaying whole
//! responses.  The crate is side effect free: the [`CacheExchange`] is handed
//! operations and network results and says what to emit and what to send to
//! the network, so the integrating crate stays in charge of transport.
//!
//! Handling an operation goes through a few steps:
//!
//! 1. The document gets `__typename` added to every selection set, so results
//!    can be keyed.  Formatted documents are memoized.
//! 2. Queries are read out of the store, which classifies them as a hit, a
//!    partial hit or a miss.  Anything that isn't a hit is forwarded.
//! 3. Network results are written into a layer owned by their operation.
//!    Layers are squashed into the base in dispatch order, so results can
//!    arrive in any order and the store converges on the same state.
//! 4. Update functions run for mutation and subscription fields, and every
//!    query that read something that changed is read again.

mod ast;
mod cache;
mod config;
mod documents;
mod error;
mod exchange;
mod keys;
mod operations;
mod resolvers;
mod response;
mod schema;
mod store;
mod updates;

pub use self::{
    ast::{
        Argument, Directive, Document, DocumentHash, Field, FragmentDefinition, FragmentSpread, InlineFragment,
        InputValue, OperationDefinition, OperationType, Selection, SelectionSet, SharedDocument, VariableDefinition,
        Variables,
    },
    cache::{CacheReader, CacheWriter},
    config::{CacheConfig, CacheConfigBuilder, CacheSettings, RootTypes},
    documents::DocumentCache,
    error::{ConfigError, DocumentError, KeyingError, ResolverError, SchemaError, SchemaMismatch, UpdateError},
    exchange::{
        CacheExchange, CombinedError, ExchangeOutput, NetworkResult, Operation, OperationContext, OperationKind,
        OperationMeta, OperationResult, RequestPolicy,
    },
    keys::{stable_stringify, Dependencies, DependencyKey, EntityKey, FieldKey, KeyRegistry, KeyResolver, OperationKey},
    resolvers::{MergeMode, ResolveInfo, Resolver, ResolverRegistry, SimplePagination},
    response::{CacheOutcome, GraphqlError, PathSegment},
    schema::SchemaPredicates,
    store::{FieldInfo, LayerState, Link, Store, WriteTarget},
    updates::{MutationState, OptimisticRegistry, OptimisticResolver, UpdateRegistry, UpdateResolver},
};
