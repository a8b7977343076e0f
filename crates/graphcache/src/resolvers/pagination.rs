use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{ResolveInfo, Resolver};
use crate::{cache::CacheReader, error::ResolverError};

/// The order pages are merged in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Pages with a higher offset come first
    Before,
    /// Pages with a higher offset come last
    #[default]
    After,
}

/// A resolver for offset/limit paginated list fields.
///
/// Every cached page of the field is merged into a single list, as long as
/// its arguments other than the offset and limit match the ones being read.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimplePagination {
    pub offset_argument: String,
    pub limit_argument: String,
    pub merge_mode: MergeMode,
}

impl Default for SimplePagination {
    fn default() -> Self {
        SimplePagination {
            offset_argument: "skip".into(),
            limit_argument: "limit".into(),
            merge_mode: MergeMode::After,
        }
    }
}

impl SimplePagination {
    fn same_page_arguments(&self, left: &Map<String, Value>, right: &Map<String, Value>) -> bool {
        let filter = |arguments: &Map<String, Value>| {
            arguments
                .iter()
                .filter(|(name, _)| **name != self.offset_argument && **name != self.limit_argument)
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect::<Map<_, _>>()
        };

        filter(left) == filter(right)
    }
}

impl Resolver for SimplePagination {
    fn resolve(
        &self,
        _parent: &Map<String, Value>,
        arguments: &Map<String, Value>,
        cache: &CacheReader<'_>,
        info: &ResolveInfo<'_>,
    ) -> Result<Option<Value>, ResolverError> {
        if cache.resolve(info.parent_key, info.field_name, Some(arguments)).is_none() {
            return Ok(None);
        }

        let mut pages = Vec::new();
        for field in cache.inspect_fields(info.parent_key) {
            if field.field_name != info.field_name {
                continue;
            }

            let page_arguments = field.arguments.clone().unwrap_or_default();
            if !self.same_page_arguments(&page_arguments, arguments) {
                continue;
            }

            let Some(Value::Array(items)) = cache.resolve(info.parent_key, info.field_name, field.arguments.as_ref())
            else {
                continue;
            };

            let offset = page_arguments
                .get(&self.offset_argument)
                .and_then(Value::as_i64)
                .unwrap_or(0);

            pages.push((offset, items));
        }

        pages.sort_by_key(|(offset, _)| *offset);
        if self.merge_mode == MergeMode::Before {
            pages.reverse();
        }

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for (_, items) in pages {
            for item in items {
                let is_new = match &item {
                    Value::String(key) => seen.insert(key.clone()),
                    _ => true,
                };
                if is_new {
                    merged.push(item);
                }
            }
        }

        Ok(Some(Value::Array(merged)))
    }
}
