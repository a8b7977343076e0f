/// Errors produced while parsing or lowering a document
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("could not parse document: {0}")]
    Parse(String),
    #[error("the document contains neither an operation nor a fragment")]
    Empty,
    #[error("the document does not contain an operation")]
    NoOperation,
    #[error("the document does not contain a fragment")]
    NoFragment,
    #[error("the document does not contain a fragment named {0}")]
    UnknownFragment(String),
    #[error("the fragment {0} is defined more than once")]
    DuplicateFragment(String),
}

/// Errors found while building a [`crate::CacheConfig`]
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{kind} registered for unknown type {typename}")]
    UnknownType { kind: &'static str, typename: String },
    #[error("{kind} registered for unknown field {typename}.{field}")]
    UnknownField {
        kind: &'static str,
        typename: String,
        field: String,
    },
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("could not parse settings: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors loading an introspection schema
#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("could not deserialize introspection result: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid introspection result: {0}")]
    Introspection(String),
}

/// A keying function could not produce a key for an object
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct KeyingError(pub String);

/// A resolver failed, the field it was resolving reads as `null`
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ResolverError(pub String);

/// An update or optimistic function failed
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct UpdateError(pub String);

/// Data that does not agree with the schema the cache was configured with
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("the field {typename}.{field} does not exist in the schema")]
pub struct SchemaMismatch {
    pub typename: String,
    pub field: String,
}

impl KeyingError {
    pub fn new(message: impl Into<String>) -> Self {
        KeyingError(message.into())
    }
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        ResolverError(message.into())
    }
}

impl UpdateError {
    pub fn new(message: impl Into<String>) -> Self {
        UpdateError(message.into())
    }
}

impl From<DocumentError> for ResolverError {
    fn from(error: DocumentError) -> Self {
        ResolverError(error.to_string())
    }
}

impl From<DocumentError> for UpdateError {
    fn from(error: DocumentError) -> Self {
        UpdateError(error.to_string())
    }
}
