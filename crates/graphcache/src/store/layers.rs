use std::collections::HashMap;

use indexmap::IndexMap;

use super::Link;
use crate::keys::{Dependencies, EntityKey, FieldKey, OperationKey};

/// A field in an overlay: either a value or a marker that hides lower layers
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot<T> {
    Present(T),
    Removed,
}

pub(crate) type FieldMap<T> = HashMap<EntityKey, IndexMap<FieldKey, T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerState {
    /// Reserved for a forwarded operation, waiting on its result
    Pending,
    /// Holds a real result, waits for every layer below it to settle
    Settled,
    /// Holds a mutation's predicted result
    Optimistic,
}

/// An overlay above the base owned by a single operation
#[derive(Debug)]
pub(crate) struct Layer {
    pub owner: OperationKey,
    pub state: LayerState,
    pub records: FieldMap<Slot<serde_json::Value>>,
    pub links: FieldMap<Slot<Link>>,
    /// Everything written into this layer
    pub dependencies: Dependencies,
}

impl Layer {
    pub fn new(owner: OperationKey) -> Self {
        Layer {
            owner,
            state: LayerState::Pending,
            records: FieldMap::default(),
            links: FieldMap::default(),
            dependencies: Dependencies::default(),
        }
    }

    /// Drops the content of the layer, returning what it had written
    pub fn clear(&mut self) -> Dependencies {
        self.records.clear();
        self.links.clear();
        std::mem::take(&mut self.dependencies)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.links.is_empty()
    }
}

/// Looks `field` up in one map of a layer, `Some(None)` is a removed marker
pub(crate) fn lookup<'a, T>(map: &'a FieldMap<Slot<T>>, entity: &EntityKey, field: &FieldKey) -> Option<Option<&'a T>> {
    match map.get(entity)?.get(field)? {
        Slot::Present(value) => Some(Some(value)),
        Slot::Removed => Some(None),
    }
}

/// Writes the slots of an overlay into the base
pub(crate) fn merge_into<T>(base: &mut FieldMap<T>, overlay: FieldMap<Slot<T>>) {
    for (entity, fields) in overlay {
        for (field, slot) in fields {
            match slot {
                Slot::Present(value) => {
                    base.entry(entity.clone()).or_default().insert(field, value);
                }
                Slot::Removed => remove_from(base, &entity, &field),
            }
        }
    }
}

pub(crate) fn remove_from<T>(map: &mut FieldMap<T>, entity: &EntityKey, field: &FieldKey) {
    if let Some(fields) = map.get_mut(entity) {
        fields.shift_remove(field);
        if fields.is_empty() {
            map.remove(entity);
        }
    }
}
