use serde_json::Value;

use crate::keys::EntityKey;

/// The value of a field that selects sub-fields.
///
/// Links point at entities by key rather than holding them, so cycles in the
/// entity graph need no special handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Null,
    Entity(EntityKey),
    List(Vec<Link>),
}

impl Link {
    /// The JSON form handed to resolvers and updaters: entity keys as strings
    pub fn to_json(&self) -> Value {
        match self {
            Link::Null => Value::Null,
            Link::Entity(key) => Value::String(key.as_str().to_string()),
            Link::List(links) => Value::Array(links.iter().map(Link::to_json).collect()),
        }
    }

    /// Parses the JSON form of a link.  Anything other than strings, lists and
    /// `null` is not a link.
    pub fn from_json(value: &Value) -> Option<Link> {
        match value {
            Value::Null => Some(Link::Null),
            Value::String(key) => Some(Link::Entity(EntityKey::new(key.as_str()))),
            Value::Array(items) => items.iter().map(Link::from_json).collect::<Option<Vec<_>>>().map(Link::List),
            _ => None,
        }
    }
}

impl From<EntityKey> for Link {
    fn from(key: EntityKey) -> Self {
        Link::Entity(key)
    }
}
