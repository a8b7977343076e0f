use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    ast::OperationType,
    error::ConfigError,
    keys::{FieldListKey, KeyRegistry, KeyResolver},
    resolvers::{Resolver, ResolverRegistry},
    schema::SchemaPredicates,
    updates::{OptimisticRegistry, OptimisticResolver, UpdateRegistry, UpdateResolver},
};

/// Settings of a cache that can be loaded from a file
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// If `__typename` should be added to every selection set of a document
    /// before it's forwarded.  On by default, keying needs typenames.
    pub add_typenames: bool,
    /// The maximum number of formatted documents that are kept around.
    /// 1000 by default.
    pub document_cache_limit: u64,
    /// Names of the root types, ignored when a schema is configured
    pub root_types: RootTypes,
    /// Types that never have a key of their own
    pub embedded_types: Vec<String>,
    /// Fields that make up the key of a type, instead of `id` or `_id`
    pub key_fields: BTreeMap<String, Vec<String>>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            add_typenames: true,
            document_cache_limit: 1000,
            root_types: RootTypes::default(),
            embedded_types: vec![],
            key_fields: BTreeMap::new(),
        }
    }
}

impl CacheSettings {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootTypes {
    pub query: String,
    pub mutation: String,
    pub subscription: String,
}

impl Default for RootTypes {
    fn default() -> Self {
        Self {
            query: String::from("Query"),
            mutation: String::from("Mutation"),
            subscription: String::from("Subscription"),
        }
    }
}

/// The complete, validated configuration of a cache
pub struct CacheConfig {
    settings: CacheSettings,
    root_types: RootTypes,
    keys: KeyRegistry,
    resolvers: ResolverRegistry,
    updates: UpdateRegistry,
    optimistic: OptimisticRegistry,
    schema: Option<SchemaPredicates>,
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    pub fn updates(&self) -> &UpdateRegistry {
        &self.updates
    }

    pub fn optimistic(&self) -> &OptimisticRegistry {
        &self.optimistic
    }

    pub fn schema(&self) -> Option<&SchemaPredicates> {
        self.schema.as_ref()
    }

    pub fn root_typename(&self, operation_type: OperationType) -> &str {
        match operation_type {
            OperationType::Query => &self.root_types.query,
            OperationType::Mutation => &self.root_types.mutation,
            OperationType::Subscription => &self.root_types.subscription,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let settings = CacheSettings::default();
        CacheConfig {
            root_types: settings.root_types.clone(),
            settings,
            keys: KeyRegistry::default(),
            resolvers: ResolverRegistry::default(),
            updates: UpdateRegistry::default(),
            optimistic: OptimisticRegistry::default(),
            schema: None,
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("settings", &self.settings)
            .field("keys", &self.keys)
            .field("resolvers", &self.resolvers)
            .field("updates", &self.updates)
            .field("optimistic", &self.optimistic)
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct CacheConfigBuilder {
    settings: CacheSettings,
    schema: Option<SchemaPredicates>,
    keys: Vec<(String, Arc<dyn KeyResolver>)>,
    resolvers: Vec<(String, String, Arc<dyn Resolver>)>,
    updates: Vec<(String, String, Arc<dyn UpdateResolver>)>,
    optimistic: Vec<(String, Arc<dyn OptimisticResolver>)>,
}

impl CacheConfigBuilder {
    pub fn settings(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn schema(mut self, schema: SchemaPredicates) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Registers a keying function for a type, overriding `id`/`_id`
    pub fn key(mut self, typename: impl Into<String>, resolver: impl KeyResolver + 'static) -> Self {
        self.keys.push((typename.into(), Arc::new(resolver)));
        self
    }

    pub fn resolver(
        mut self,
        typename: impl Into<String>,
        field: impl Into<String>,
        resolver: impl Resolver + 'static,
    ) -> Self {
        self.resolvers.push((typename.into(), field.into(), Arc::new(resolver)));
        self
    }

    /// Registers an update function for a field of a root type
    pub fn update(
        mut self,
        typename: impl Into<String>,
        field: impl Into<String>,
        updater: impl UpdateResolver + 'static,
    ) -> Self {
        self.updates.push((typename.into(), field.into(), Arc::new(updater)));
        self
    }

    /// Registers an optimistic predictor for a mutation field
    pub fn optimistic(mut self, field: impl Into<String>, predictor: impl OptimisticResolver + 'static) -> Self {
        self.optimistic.push((field.into(), Arc::new(predictor)));
        self
    }

    pub fn build(self) -> Result<CacheConfig, ConfigError> {
        let CacheConfigBuilder {
            settings,
            schema,
            keys: key_resolvers,
            resolvers: field_resolvers,
            updates: updaters,
            optimistic: predictors,
        } = self;

        if settings.document_cache_limit == 0 {
            return Err(ConfigError::InvalidSetting(
                "document_cache_limit must be greater than zero".into(),
            ));
        }

        let root_types = match &schema {
            Some(schema) => RootTypes {
                query: schema.query_type().to_string(),
                mutation: schema.mutation_type().unwrap_or("Mutation").to_string(),
                subscription: schema.subscription_type().unwrap_or("Subscription").to_string(),
            },
            None => settings.root_types.clone(),
        };

        for (kind, name) in [
            ("query", &root_types.query),
            ("mutation", &root_types.mutation),
            ("subscription", &root_types.subscription),
        ] {
            if name.is_empty() {
                return Err(ConfigError::InvalidSetting(format!("the {kind} root type name is empty")));
            }
        }

        let validator = Validator { schema: schema.as_ref() };

        let mut keys = KeyRegistry::default();
        for typename in &settings.embedded_types {
            keys.insert(typename.clone(), Arc::new(FieldListKey(vec![])));
        }
        for (typename, fields) in &settings.key_fields {
            keys.insert(typename.clone(), Arc::new(FieldListKey(fields.clone())));
        }
        for (typename, resolver) in key_resolvers {
            keys.insert(typename, resolver);
        }
        for typename in keys.typenames() {
            validator.check_type("keying function", typename)?;
        }

        let mut resolvers = ResolverRegistry::default();
        for (typename, field, resolver) in field_resolvers {
            validator.check_field("resolver", &typename, &field)?;
            resolvers.insert(typename, field, resolver);
        }

        let mut updates = UpdateRegistry::default();
        for (typename, field, updater) in updaters {
            validator.check_field("update", &typename, &field)?;
            updates.insert(typename, field, updater);
        }

        let mut optimistic = OptimisticRegistry::default();
        for (field, predictor) in predictors {
            validator.check_field("optimistic update", &root_types.mutation, &field)?;
            optimistic.insert(field, predictor);
        }

        Ok(CacheConfig {
            settings,
            root_types,
            keys,
            resolvers,
            updates,
            optimistic,
            schema,
        })
    }
}

struct Validator<'a> {
    schema: Option<&'a SchemaPredicates>,
}

impl Validator<'_> {
    fn check_type(&self, kind: &'static str, typename: &str) -> Result<(), ConfigError> {
        match self.schema {
            Some(schema) if !schema.has_type(typename) => Err(ConfigError::UnknownType {
                kind,
                typename: typename.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn check_field(&self, kind: &'static str, typename: &str, field: &str) -> Result<(), ConfigError> {
        self.check_type(kind, typename)?;
        match self.schema {
            Some(schema) if !schema.field_exists(typename, field) => Err(ConfigError::UnknownField {
                kind,
                typename: typename.to_string(),
                field: field.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn default_settings() {
        let settings = CacheSettings::from_toml("").unwrap();

        assert_eq!(settings, CacheSettings::default());
        assert!(settings.add_typenames);
        assert_eq!(settings.document_cache_limit, 1000);
        assert_eq!(settings.root_types.query, "Query");
    }

    #[test]
    fn settings_from_toml() {
        let settings = CacheSettings::from_toml(indoc! {r#"
            add_typenames = false
            document_cache_limit = 10
            embedded_types = ["Point"]

            [root_types]
            query = "QueryRoot"

            [key_fields]
            Repository = ["owner", "name"]
        "#})
        .unwrap();

        assert!(!settings.add_typenames);
        assert_eq!(settings.document_cache_limit, 10);
        assert_eq!(settings.embedded_types, vec!["Point".to_string()]);
        assert_eq!(settings.root_types.query, "QueryRoot");
        assert_eq!(settings.root_types.mutation, "Mutation");
        assert_eq!(settings.key_fields["Repository"], vec!["owner".to_string(), "name".to_string()]);
    }

    #[test]
    fn unknown_settings_are_rejected() {
        let error = CacheSettings::from_toml("ttl = 10").unwrap_err();
        assert!(matches!(error, ConfigError::Toml(_)));
    }

    #[test]
    fn zero_document_cache_limit_is_rejected() {
        let settings = CacheSettings {
            document_cache_limit: 0,
            ..Default::default()
        };
        let error = CacheConfig::builder().settings(settings).build().unwrap_err();

        assert!(matches!(error, ConfigError::InvalidSetting(_)));
    }

    #[test]
    fn root_types_come_from_settings_without_a_schema() {
        let settings = CacheSettings::from_toml(indoc! {r#"
            [root_types]
            query = "QueryRoot"
            mutation = "MutationRoot"
        "#})
        .unwrap();
        let config = CacheConfig::builder().settings(settings).build().unwrap();

        assert_eq!(config.root_typename(OperationType::Query), "QueryRoot");
        assert_eq!(config.root_typename(OperationType::Mutation), "MutationRoot");
        assert_eq!(config.root_typename(OperationType::Subscription), "Subscription");
    }

    #[test]
    fn settings_register_keys() {
        let settings = CacheSettings::from_toml(indoc! {r#"
            embedded_types = ["Point"]

            [key_fields]
            Repository = ["owner", "name"]
        "#})
        .unwrap();
        let config = CacheConfig::builder().settings(settings).build().unwrap();

        let point = serde_json::json!({"__typename": "Point", "id": "1"});
        assert_eq!(config.keys().key_of_entity(None, point.as_object().unwrap()), None);

        let repository = serde_json::json!({"__typename": "Repository", "owner": "a", "name": "b"});
        assert_eq!(
            config
                .keys()
                .key_of_entity(None, repository.as_object().unwrap())
                .unwrap()
                .as_str(),
            "Repository:a:b"
        );
    }
}
