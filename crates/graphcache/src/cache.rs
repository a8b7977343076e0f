//! Handles on the store that are passed to user functions.

use std::cell::RefCell;

use serde_json::{Map, Value};

use crate::{
    ast::{Document, Variables},
    config::CacheConfig,
    error::DocumentError,
    keys::{Dependencies, EntityKey, FieldKey},
    operations,
    store::{FieldInfo, Link, Store, WriteTarget},
};

/// Read-only access to the cache, as seen by resolvers and optimistic
/// predictors.  Everything read through it counts as a dependency of the
/// operation being read.
pub struct CacheReader<'a> {
    store: &'a Store,
    config: &'a CacheConfig,
    dependencies: RefCell<Dependencies>,
}

impl<'a> CacheReader<'a> {
    pub(crate) fn new(store: &'a Store, config: &'a CacheConfig) -> Self {
        CacheReader {
            store,
            config,
            dependencies: RefCell::new(Dependencies::default()),
        }
    }

    pub(crate) fn into_dependencies(self) -> Dependencies {
        self.dependencies.into_inner()
    }

    /// The key of an object, or `None` if it is embedded
    pub fn key_of_entity(&self, data: &Map<String, Value>) -> Option<EntityKey> {
        self.config.keys().key_of_entity(None, data)
    }

    /// The stored value of a field.  Links come back as entity key strings.
    pub fn resolve(&self, entity: &EntityKey, field_name: &str, arguments: Option<&Map<String, Value>>) -> Option<Value> {
        let field_key = FieldKey::new(field_name, arguments);
        self.dependencies
            .borrow_mut()
            .insert(self.store.dependency_key(entity, &field_key));

        resolve(self.store, entity, &field_key)
    }

    pub fn inspect_fields(&self, entity: &EntityKey) -> Vec<FieldInfo> {
        let fields = self.store.inspect_fields(entity);
        let mut dependencies = self.dependencies.borrow_mut();
        for field in &fields {
            dependencies.insert(self.store.dependency_key(entity, &field.field_key));
        }
        fields
    }

    pub fn read_query(
        &self,
        document: &Document,
        variables: &Variables,
    ) -> Result<Option<Map<String, Value>>, DocumentError> {
        let result = operations::read_query(self.store, self.config, document, variables)?;
        self.dependencies.borrow_mut().extend(result.dependencies);
        Ok(result.data)
    }

    /// Reads a fragment of an entity, given either as a key string or as an
    /// object with its key fields
    pub fn read_fragment(
        &self,
        document: &Document,
        entity: &Value,
        variables: &Variables,
        fragment_name: Option<&str>,
    ) -> Result<Option<Map<String, Value>>, DocumentError> {
        let result = operations::read_fragment(self.store, self.config, document, entity, variables, fragment_name)?;
        self.dependencies.borrow_mut().extend(result.dependencies);
        Ok(result.data)
    }
}

/// Read and write access to the cache, as seen by update functions.
///
/// Writes land in the layer of the operation whose result is being handled.
pub struct CacheWriter<'a> {
    store: &'a mut Store,
    config: &'a CacheConfig,
    target: WriteTarget,
    touched: Dependencies,
}

impl<'a> CacheWriter<'a> {
    pub(crate) fn new(store: &'a mut Store, config: &'a CacheConfig, target: WriteTarget) -> Self {
        CacheWriter {
            store,
            config,
            target,
            touched: Dependencies::default(),
        }
    }

    pub(crate) fn into_touched(self) -> Dependencies {
        self.touched
    }

    pub fn key_of_entity(&self, data: &Map<String, Value>) -> Option<EntityKey> {
        self.config.keys().key_of_entity(None, data)
    }

    pub fn resolve(&self, entity: &EntityKey, field_name: &str, arguments: Option<&Map<String, Value>>) -> Option<Value> {
        resolve(self.store, entity, &FieldKey::new(field_name, arguments))
    }

    pub fn inspect_fields(&self, entity: &EntityKey) -> Vec<FieldInfo> {
        self.store.inspect_fields(entity)
    }

    pub fn read_query(
        &self,
        document: &Document,
        variables: &Variables,
    ) -> Result<Option<Map<String, Value>>, DocumentError> {
        Ok(operations::read_query(self.store, self.config, document, variables)?.data)
    }

    pub fn read_fragment(
        &self,
        document: &Document,
        entity: &Value,
        variables: &Variables,
        fragment_name: Option<&str>,
    ) -> Result<Option<Map<String, Value>>, DocumentError> {
        Ok(operations::read_fragment(self.store, self.config, document, entity, variables, fragment_name)?.data)
    }

    pub fn write_query(
        &mut self,
        document: &Document,
        variables: &Variables,
        data: &Map<String, Value>,
    ) -> Result<(), DocumentError> {
        let touched = operations::write_query(self.store, self.config, self.target, document, variables, data)?;
        self.touched.extend(touched);
        Ok(())
    }

    /// Reads a query, passes the data to `updater` and writes back what it returns.
    ///
    /// Nothing is written when `updater` returns `None`.
    pub fn update_query(
        &mut self,
        document: &Document,
        variables: &Variables,
        updater: impl FnOnce(Option<Map<String, Value>>) -> Option<Map<String, Value>>,
    ) -> Result<(), DocumentError> {
        let data = self.read_query(document, variables)?;
        if let Some(data) = updater(data) {
            self.write_query(document, variables, &data)?;
        }
        Ok(())
    }

    pub fn write_fragment(
        &mut self,
        document: &Document,
        data: &Map<String, Value>,
        variables: &Variables,
        fragment_name: Option<&str>,
    ) -> Result<(), DocumentError> {
        let touched = operations::write_fragment(
            self.store,
            self.config,
            self.target,
            document,
            data,
            variables,
            fragment_name,
        )?;
        self.touched.extend(touched);
        Ok(())
    }

    /// Points a field of an entity at other entities
    pub fn link(&mut self, entity: &EntityKey, field_name: &str, arguments: Option<&Map<String, Value>>, link: Link) {
        let field_key = FieldKey::new(field_name, arguments);
        let dependency = self.store.write_link(self.target, entity, &field_key, link);
        self.touched.insert(dependency);
    }

    /// Removes a field of an entity, or the entire entity when `field` is `None`
    pub fn invalidate(&mut self, entity: &EntityKey, field: Option<(&str, Option<&Map<String, Value>>)>) {
        let field_key = field.map(|(name, arguments)| FieldKey::new(name, arguments));
        let touched = operations::invalidate(self.store, self.target, entity, field_key.as_ref());
        self.touched.extend(touched);
    }
}

fn resolve(store: &Store, entity: &EntityKey, field_key: &FieldKey) -> Option<Value> {
    store
        .read_record(entity, field_key)
        .cloned()
        .or_else(|| store.read_link(entity, field_key).map(Link::to_json))
}
