//! Schema awareness, derived from an introspection result.
//!
//! With a schema the cache can tell which fields are nullable, which lets it
//! serve partial results, and it can match fragments on interfaces and unions
//! exactly rather than heuristically.

use std::collections::{HashMap, HashSet};

use cynic_introspection::{IntrospectionQuery, Schema, Type};

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldNullability {
    nullable: bool,
    /// Only set for list fields
    list_items_nullable: Option<bool>,
}

#[derive(Debug, Default)]
struct TypeInfo {
    fields: HashMap<String, FieldNullability>,
    possible_types: HashSet<String>,
}

/// Answers the questions the cache asks about the schema
#[derive(Debug)]
pub struct SchemaPredicates {
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    types: HashMap<String, TypeInfo>,
}

impl SchemaPredicates {
    /// Loads the schema from the JSON of an introspection query result.
    ///
    /// Both the full response (`{"data": {"__schema": ...}}`) and its data
    /// (`{"__schema": ...}`) are accepted.
    pub fn from_introspection_json(json: &str) -> Result<Self, SchemaError> {
        let mut value = serde_json::from_str::<serde_json::Value>(json)?;
        if let Some(data) = value.get_mut("data") {
            value = data.take();
        }

        let query = serde_json::from_value::<IntrospectionQuery>(value)?;
        let schema = query
            .into_schema()
            .map_err(|error| SchemaError::Introspection(error.to_string()))?;

        Ok(SchemaPredicates::from_schema(schema))
    }

    pub fn from_schema(schema: Schema) -> Self {
        let mut types = HashMap::<String, TypeInfo>::new();
        let mut implementations = Vec::new();

        for ty in schema.types {
            let name = ty.name().to_string();
            let info = match ty {
                Type::Object(object) => {
                    implementations.extend(
                        object
                            .interfaces
                            .into_iter()
                            .map(|interface| (interface, object.name.clone())),
                    );
                    TypeInfo {
                        fields: field_nullability(object.fields),
                        possible_types: HashSet::new(),
                    }
                }
                Type::Interface(interface) => TypeInfo {
                    fields: field_nullability(interface.fields),
                    possible_types: interface.possible_types.into_iter().collect(),
                },
                Type::Union(union) => TypeInfo {
                    fields: HashMap::new(),
                    possible_types: union.possible_types.into_iter().collect(),
                },
                Type::Scalar(_) | Type::Enum(_) | Type::InputObject(_) => TypeInfo::default(),
            };
            types.insert(name, info);
        }

        // possibleTypes may be incomplete, objects list their interfaces too
        for (interface, object) in implementations {
            if let Some(info) = types.get_mut(&interface) {
                info.possible_types.insert(object);
            }
        }

        SchemaPredicates {
            query_type: schema.query_type,
            mutation_type: schema.mutation_type,
            subscription_type: schema.subscription_type,
            types,
        }
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    pub fn has_type(&self, typename: &str) -> bool {
        self.types.contains_key(typename)
    }

    pub fn field_exists(&self, typename: &str, field_name: &str) -> bool {
        field_name.starts_with("__")
            || self
                .types
                .get(typename)
                .is_some_and(|info| info.fields.contains_key(field_name))
    }

    /// Whether `field_name` on `typename` may be `null`.  Unknown fields are not.
    pub fn is_field_nullable(&self, typename: &str, field_name: &str) -> bool {
        self.field(typename, field_name)
            .is_some_and(|nullability| nullability.nullable)
    }

    /// Whether the items of the list field `field_name` may be `null`
    pub fn is_list_nullable(&self, typename: &str, field_name: &str) -> bool {
        self.field(typename, field_name)
            .and_then(|nullability| nullability.list_items_nullable)
            .unwrap_or(false)
    }

    /// Whether a fragment on `type_condition` applies to an object of `typename`
    pub fn is_interface_of_type(&self, type_condition: &str, typename: &str) -> bool {
        type_condition == typename
            || self
                .types
                .get(type_condition)
                .is_some_and(|info| info.possible_types.contains(typename))
    }

    fn field(&self, typename: &str, field_name: &str) -> Option<FieldNullability> {
        self.types.get(typename)?.fields.get(field_name).copied()
    }
}

fn field_nullability(fields: Vec<cynic_introspection::Field>) -> HashMap<String, FieldNullability> {
    fields
        .into_iter()
        .map(|field| (field.name, parse_nullability(&field.ty.to_string())))
        .collect()
}

/// Reads nullability out of a printed type such as `[Todo!]!`
fn parse_nullability(ty: &str) -> FieldNullability {
    let (nullable, inner) = match ty.strip_suffix('!') {
        Some(inner) => (false, inner),
        None => (true, ty),
    };

    let list_items_nullable = inner
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .map(|item| !item.ends_with('!'));

    FieldNullability {
        nullable,
        list_items_nullable,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::nullable("Todo", true, None)]
    #[case::non_null("Todo!", false, None)]
    #[case::nullable_list("[Todo]", true, Some(true))]
    #[case::non_null_items("[Todo!]", true, Some(false))]
    #[case::non_null_list("[Todo!]!", false, Some(false))]
    #[case::nested_list("[[Todo!]]!", false, Some(true))]
    fn nullability(#[case] ty: &str, #[case] nullable: bool, #[case] list_items_nullable: Option<bool>) {
        assert_eq!(
            parse_nullability(ty),
            FieldNullability {
                nullable,
                list_items_nullable
            }
        );
    }
}
