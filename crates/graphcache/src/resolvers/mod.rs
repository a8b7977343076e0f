//! Field resolvers run when data is read out of the cache.

mod pagination;

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::{Map, Value};

pub use self::pagination::{MergeMode, SimplePagination};
use crate::{
    ast::Variables,
    cache::CacheReader,
    error::ResolverError,
    keys::{EntityKey, FieldKey},
    response::PathSegment,
};

/// Where in a read or update a function is being called
#[derive(Debug)]
pub struct ResolveInfo<'a> {
    pub parent_typename: &'a str,
    pub parent_key: &'a EntityKey,
    pub parent_field_key: &'a FieldKey,
    pub field_name: &'a str,
    pub variables: &'a Variables,
    pub path: &'a [PathSegment],
}

/// Computes the value of a field on read.
///
/// `parent` holds the fields read so far on the parent object, including
/// whatever the cache has stored for this field.  Returning `Ok(None)` means
/// the value is unknown, which the reader treats like a missing field.
///
/// For fields that select sub-fields the value may be an entity key, an
/// object (keyable or embedded), a list of those, or `null`.
pub trait Resolver: Send + Sync {
    fn resolve(
        &self,
        parent: &Map<String, Value>,
        arguments: &Map<String, Value>,
        cache: &CacheReader<'_>,
        info: &ResolveInfo<'_>,
    ) -> Result<Option<Value>, ResolverError>;
}

impl<F> Resolver for F
where
    F: Fn(&Map<String, Value>, &Map<String, Value>, &CacheReader<'_>, &ResolveInfo<'_>) -> Result<Option<Value>, ResolverError>
        + Send
        + Sync,
{
    fn resolve(
        &self,
        parent: &Map<String, Value>,
        arguments: &Map<String, Value>,
        cache: &CacheReader<'_>,
        info: &ResolveInfo<'_>,
    ) -> Result<Option<Value>, ResolverError> {
        self(parent, arguments, cache, info)
    }
}

/// Resolvers by typename and field name
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<String, HashMap<String, Arc<dyn Resolver>>>,
}

impl ResolverRegistry {
    pub(crate) fn insert(&mut self, typename: String, field: String, resolver: Arc<dyn Resolver>) {
        self.resolvers.entry(typename).or_default().insert(field, resolver);
    }

    pub fn get(&self, typename: &str, field: &str) -> Option<&dyn Resolver> {
        self.resolvers.get(typename)?.get(field).map(Arc::as_ref)
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.resolvers.iter().flat_map(|(typename, fields)| {
            fields
                .keys()
                .map(move |field| (typename.as_str(), field.as_str()))
        })
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields()).finish()
    }
}
