use serde_json::Value;

use super::{Directive, Variables};

/// Evaluates `@include` and `@skip` on a selection.
///
/// `@include(if:)` requires a truthy value, so an unset variable excludes the
/// selection.  `@skip(if:)` only excludes on `true`.
pub(crate) fn should_include(directives: &[Directive], variables: &Variables) -> bool {
    for directive in directives {
        let condition = directive
            .arguments
            .iter()
            .find(|argument| argument.name == "if")
            .and_then(|argument| argument.value.to_json(variables));

        match directive.name.as_str() {
            "include" if !is_truthy(condition.as_ref()) => return false,
            "skip" if condition == Some(Value::Bool(true)) => return false,
            _ => {}
        }
    }

    true
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(value)) => *value,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|number| number != 0.0),
        Some(Value::String(string)) => !string.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}
