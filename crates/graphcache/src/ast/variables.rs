use serde_json::{Map, Value};

use super::{Argument, InputValue, OperationDefinition};

/// Variables of an operation, as sent alongside it
pub type Variables = Map<String, Value>;

/// Applies the operation's variable defaults to `variables`.
///
/// Only declared variables are kept.  Documents without an operation keep
/// their variables as-is.
pub(crate) fn normalize_variables(operation: Option<&OperationDefinition>, variables: &Variables) -> Variables {
    let Some(operation) = operation else {
        return variables.clone();
    };

    let mut normalized = Variables::new();
    for definition in &operation.variables {
        let value = match variables.get(&definition.name) {
            Some(value) => Some(value.clone()),
            None => definition
                .default_value
                .as_ref()
                .and_then(|default| default.to_json(variables)),
        };

        if let Some(value) = value {
            normalized.insert(definition.name.clone(), value);
        }
    }

    normalized
}

/// Resolves field arguments against variables.
///
/// Arguments referring to variables that were not provided are dropped.
/// Returns `None` when no arguments remain.
pub(crate) fn resolve_arguments(arguments: &[Argument], variables: &Variables) -> Option<Map<String, Value>> {
    let resolved = arguments
        .iter()
        .filter_map(|argument| Some((argument.name.clone(), argument.value.to_json(variables)?)))
        .collect::<Map<_, _>>();

    (!resolved.is_empty()).then_some(resolved)
}

impl InputValue {
    /// Converts this value to JSON, returning `None` for an unset variable.
    pub fn to_json(&self, variables: &Variables) -> Option<Value> {
        Some(match self {
            InputValue::Variable(name) => return variables.get(name).cloned(),
            InputValue::Int(value) => Value::from(*value),
            InputValue::Float(value) => Value::from(*value),
            InputValue::String(value) | InputValue::Enum(value) => Value::String(value.clone()),
            InputValue::Boolean(value) => Value::Bool(*value),
            InputValue::Null => Value::Null,
            InputValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json(variables).unwrap_or(Value::Null))
                    .collect(),
            ),
            InputValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .filter_map(|(name, value)| Some((name.clone(), value.to_json(variables)?)))
                    .collect(),
            ),
        })
    }
}
