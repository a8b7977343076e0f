//! The normalized store and its layer stack.
//!
//! All data lives in a base layer.  Operations that are in flight own an
//! overlay in an ordered stack above it, bottom to top in dispatch order.
//! Reads look at the stack top down before falling back to the base, and
//! settled overlays are squashed into the base strictly from the bottom, so a
//! result that arrives early never overtakes an operation dispatched before it.

mod layers;
mod link;

use indexmap::IndexSet;
use serde_json::{Map, Value};

pub use self::{layers::LayerState, link::Link};
use self::layers::{lookup, merge_into, remove_from, FieldMap, Layer, Slot};
use crate::keys::{Dependencies, DependencyKey, EntityKey, FieldKey, OperationKey};

/// Where a write lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Base,
    Layer(OperationKey),
}

/// A field found by [`Store::inspect_fields`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub field_key: FieldKey,
    pub field_name: String,
    pub arguments: Option<Map<String, Value>>,
}

#[derive(Debug)]
pub struct Store {
    query_root: EntityKey,
    records: FieldMap<Value>,
    links: FieldMap<Link>,
    layers: Vec<Layer>,
}

impl Store {
    pub fn new(query_root: &str) -> Self {
        Store {
            query_root: EntityKey::new(query_root),
            records: FieldMap::default(),
            links: FieldMap::default(),
            layers: Vec::new(),
        }
    }

    pub fn query_root(&self) -> &EntityKey {
        &self.query_root
    }

    /// The dependency a read or write of `field` on `entity` is tracked under
    pub fn dependency_key(&self, entity: &EntityKey, field: &FieldKey) -> DependencyKey {
        if *entity == self.query_root {
            DependencyKey::root_field(entity, field)
        } else {
            DependencyKey::entity(entity)
        }
    }

    pub fn read_record(&self, entity: &EntityKey, field: &FieldKey) -> Option<&Value> {
        for layer in self.layers.iter().rev() {
            if let Some(slot) = lookup(&layer.records, entity, field) {
                return slot;
            }
        }

        self.records.get(entity)?.get(field)
    }

    pub fn read_link(&self, entity: &EntityKey, field: &FieldKey) -> Option<&Link> {
        for layer in self.layers.iter().rev() {
            if let Some(slot) = lookup(&layer.links, entity, field) {
                return slot;
            }
        }

        self.links.get(entity)?.get(field)
    }

    /// The typename recorded for an entity
    pub fn typename_of(&self, entity: &EntityKey) -> Option<&str> {
        self.read_record(entity, &FieldKey::new("__typename", None))
            .and_then(Value::as_str)
    }

    pub fn write_record(
        &mut self,
        target: WriteTarget,
        entity: &EntityKey,
        field: &FieldKey,
        value: Value,
    ) -> DependencyKey {
        let dependency = self.dependency_key(entity, field);
        match self.layer_mut(target) {
            Some(layer) => {
                write_slot(&mut layer.records, entity, field, Slot::Present(value));
                layer.dependencies.insert(dependency.clone());
            }
            None => {
                self.records
                    .entry(entity.clone())
                    .or_default()
                    .insert(field.clone(), value);
            }
        }
        dependency
    }

    pub fn write_link(&mut self, target: WriteTarget, entity: &EntityKey, field: &FieldKey, link: Link) -> DependencyKey {
        let dependency = self.dependency_key(entity, field);
        match self.layer_mut(target) {
            Some(layer) => {
                write_slot(&mut layer.links, entity, field, Slot::Present(link));
                layer.dependencies.insert(dependency.clone());
            }
            None => {
                self.links.entry(entity.clone()).or_default().insert(field.clone(), link);
            }
        }
        dependency
    }

    /// Removes a field, both its record and its link
    pub fn remove_field(&mut self, target: WriteTarget, entity: &EntityKey, field: &FieldKey) -> DependencyKey {
        let dependency = self.dependency_key(entity, field);
        match self.layer_mut(target) {
            Some(layer) => {
                write_slot(&mut layer.records, entity, field, Slot::Removed);
                write_slot(&mut layer.links, entity, field, Slot::Removed);
                layer.dependencies.insert(dependency.clone());
            }
            None => {
                remove_from(&mut self.records, entity, field);
                remove_from(&mut self.links, entity, field);
            }
        }
        dependency
    }

    /// Every visible field of an entity, across the base and all layers
    pub fn inspect_fields(&self, entity: &EntityKey) -> Vec<FieldInfo> {
        let mut candidates = IndexSet::<&FieldKey>::new();
        if let Some(fields) = self.records.get(entity) {
            candidates.extend(fields.keys());
        }
        if let Some(fields) = self.links.get(entity) {
            candidates.extend(fields.keys());
        }
        for layer in &self.layers {
            if let Some(fields) = layer.records.get(entity) {
                candidates.extend(fields.keys());
            }
            if let Some(fields) = layer.links.get(entity) {
                candidates.extend(fields.keys());
            }
        }

        candidates
            .into_iter()
            .filter(|field| self.read_record(entity, field).is_some() || self.read_link(entity, field).is_some())
            .map(|field| FieldInfo {
                field_key: field.clone(),
                field_name: field.field_name().to_string(),
                arguments: field.arguments(),
            })
            .collect()
    }

    /// Whether any of `dependencies` is currently written by an optimistic layer
    pub fn depends_on_optimistic(&self, dependencies: &Dependencies) -> bool {
        self.layers
            .iter()
            .filter(|layer| layer.state == LayerState::Optimistic)
            .any(|layer| dependencies.iter().any(|key| layer.dependencies.contains(key)))
    }

    pub fn layer_state(&self, owner: OperationKey) -> Option<LayerState> {
        self.position(owner).map(|index| self.layers[index].state)
    }

    /// The owners of the layer stack, bottom to top
    pub fn layer_owners(&self) -> Vec<OperationKey> {
        self.layers.iter().map(|layer| layer.owner).collect()
    }

    /// Reserves a layer at the top of the stack for a forwarded operation.
    ///
    /// An existing layer of the operation is moved to the top instead, unless
    /// it holds an optimistic prediction.
    pub fn reserve_layer(&mut self, owner: OperationKey) {
        match self.position(owner) {
            Some(index) if self.layers[index].state == LayerState::Optimistic => {}
            Some(index) => {
                let mut layer = self.layers.remove(index);
                layer.state = LayerState::Pending;
                self.layers.push(layer);
            }
            None => self.layers.push(Layer::new(owner)),
        }
        tracing::debug!("reserved layer for operation {owner}, stack is {:?}", self.layer_owners());
    }

    /// Turns the operation's layer into an empty optimistic layer, returning
    /// what the previous content had written.
    pub fn begin_optimistic(&mut self, owner: OperationKey) -> (WriteTarget, Dependencies) {
        let index = match self.position(owner) {
            Some(index) => index,
            None => {
                self.layers.push(Layer::new(owner));
                self.layers.len() - 1
            }
        };

        let layer = &mut self.layers[index];
        let touched = layer.clear();
        layer.state = LayerState::Optimistic;

        (WriteTarget::Layer(owner), touched)
    }

    /// Prepares the operation's layer for its real result.
    ///
    /// Optimistic content is cleared and reported as touched.  An operation
    /// without a layer writes to the base while the stack is empty, and to a
    /// new layer on top otherwise.  With `move_to_top` an existing layer is
    /// moved to the top of the stack first.
    pub fn begin_result(&mut self, owner: OperationKey, move_to_top: bool) -> (WriteTarget, Dependencies) {
        let Some(mut index) = self.position(owner) else {
            if self.layers.is_empty() {
                return (WriteTarget::Base, Dependencies::default());
            }
            self.layers.push(Layer::new(owner));
            return (WriteTarget::Layer(owner), Dependencies::default());
        };

        if move_to_top && index != self.layers.len() - 1 {
            let layer = self.layers.remove(index);
            self.layers.push(layer);
            index = self.layers.len() - 1;
        }

        let layer = &mut self.layers[index];
        let touched = match layer.state {
            LayerState::Optimistic => layer.clear(),
            LayerState::Pending | LayerState::Settled => Dependencies::default(),
        };
        layer.state = LayerState::Pending;

        (WriteTarget::Layer(owner), touched)
    }

    /// Marks the operation's layer as settled and squashes what can be squashed
    pub fn settle(&mut self, owner: OperationKey) {
        if let Some(index) = self.position(owner) {
            self.layers[index].state = LayerState::Settled;
        }
        self.squash();
    }

    /// Discards the operation's layer, returning what it had written
    pub fn remove_layer(&mut self, owner: OperationKey) -> Dependencies {
        let touched = match self.position(owner) {
            Some(index) => self.layers.remove(index).dependencies,
            None => Dependencies::default(),
        };
        self.squash();
        touched
    }

    /// Releases the layer of an operation that went away.
    ///
    /// Optimistic layers are discarded.  Pending layers are settled so they no
    /// longer hold back the layers above them.
    pub fn teardown(&mut self, owner: OperationKey) -> Dependencies {
        let Some(index) = self.position(owner) else {
            return Dependencies::default();
        };

        match self.layers[index].state {
            LayerState::Optimistic => self.remove_layer(owner),
            LayerState::Pending | LayerState::Settled => {
                self.settle(owner);
                Dependencies::default()
            }
        }
    }

    /// Merges settled layers at the bottom of the stack into the base
    fn squash(&mut self) {
        while self
            .layers
            .first()
            .is_some_and(|layer| layer.state == LayerState::Settled)
        {
            let layer = self.layers.remove(0);
            if layer.is_empty() {
                tracing::debug!("dropping empty layer of operation {}", layer.owner);
                continue;
            }

            tracing::debug!("squashing layer of operation {} into the base", layer.owner);
            merge_into(&mut self.records, layer.records);
            merge_into(&mut self.links, layer.links);
        }
    }

    fn position(&self, owner: OperationKey) -> Option<usize> {
        self.layers.iter().position(|layer| layer.owner == owner)
    }

    fn layer_mut(&mut self, target: WriteTarget) -> Option<&mut Layer> {
        let WriteTarget::Layer(owner) = target else {
            return None;
        };

        let index = self.position(owner);
        if index.is_none() {
            tracing::debug!("operation {owner} has no layer anymore, writing to the base");
        }

        index.map(|index| &mut self.layers[index])
    }
}

fn write_slot<T>(map: &mut FieldMap<Slot<T>>, entity: &EntityKey, field: &FieldKey, slot: Slot<T>) {
    map.entry(entity.clone()).or_default().insert(field.clone(), slot);
}

#[cfg(test)]
mod tests;
