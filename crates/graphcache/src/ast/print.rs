//! Printing of documents back into GraphQL text.
//!
//! The printed form is what gets forwarded to the network and what the
//! document hash is computed from, so it must be deterministic.

use std::fmt;

use super::{Argument, Directive, Document, InputValue, Selection, SelectionSet};

macro_rules! write_indent {
    ($f:expr, $level:expr) => {
        write!($f, "{:indent$}", "", indent = $level * 2)
    };
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut needs_separator = false;

        if let Some(operation) = &self.operation {
            write!(f, "{}", operation.operation_type.as_str())?;
            if let Some(name) = &operation.name {
                write!(f, " {name}")?;
            }

            if !operation.variables.is_empty() {
                write!(f, "(")?;
                for (index, variable) in operation.variables.iter().enumerate() {
                    let prefix = if index != 0 { ", " } else { "" };
                    write!(f, "{prefix}${}: {}", variable.name, variable.ty)?;
                    if let Some(default) = &variable.default_value {
                        write!(f, " = {default}")?;
                    }
                }
                write!(f, ")")?;
            }

            writeln!(
                f,
                "{} {}",
                DirectivesDisplay(&operation.directives),
                SelectionSetDisplay {
                    selections: &operation.selection_set,
                    indent_level: 0
                }
            )?;
            needs_separator = true;
        }

        for fragment in self.fragments.values() {
            if needs_separator {
                writeln!(f)?;
            }
            writeln!(
                f,
                "fragment {} on {}{} {}",
                fragment.name,
                fragment.type_condition,
                DirectivesDisplay(&fragment.directives),
                SelectionSetDisplay {
                    selections: &fragment.selection_set,
                    indent_level: 0
                }
            )?;
            needs_separator = true;
        }

        Ok(())
    }
}

struct SelectionSetDisplay<'a> {
    selections: &'a SelectionSet,
    indent_level: usize,
}

impl fmt::Display for SelectionSetDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.selections.is_empty() {
            return Ok(());
        }
        writeln!(f, "{{")?;
        for selection in self.selections {
            writeln!(
                f,
                "{}",
                SelectionDisplay {
                    selection,
                    indent_level: self.indent_level + 1
                }
            )?;
        }
        write_indent!(f, self.indent_level)?;
        write!(f, "}}")
    }
}

struct SelectionDisplay<'a> {
    selection: &'a Selection,
    indent_level: usize,
}

impl<'a> SelectionDisplay<'a> {
    fn wrap_set(&self, selections: &'a SelectionSet) -> SelectionSetDisplay<'a> {
        SelectionSetDisplay {
            selections,
            indent_level: self.indent_level,
        }
    }
}

impl fmt::Display for SelectionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_indent!(f, self.indent_level)?;
        match self.selection {
            Selection::Field(field) => {
                if let Some(alias) = &field.alias {
                    write!(f, "{alias}: ")?;
                }

                let space = if field.selection_set.is_empty() { "" } else { " " };

                write!(
                    f,
                    "{}{}{}{space}{}",
                    field.name,
                    ArgumentsDisplay(&field.arguments),
                    DirectivesDisplay(&field.directives),
                    self.wrap_set(&field.selection_set)
                )
            }
            Selection::InlineFragment(fragment) => {
                write!(f, "...")?;

                if let Some(on_type) = &fragment.type_condition {
                    write!(f, " on {on_type}")?;
                }

                write!(
                    f,
                    "{} {}",
                    DirectivesDisplay(&fragment.directives),
                    self.wrap_set(&fragment.selection_set)
                )
            }
            Selection::FragmentSpread(spread) => {
                write!(f, "...{}{}", spread.fragment_name, DirectivesDisplay(&spread.directives))
            }
        }
    }
}

struct ArgumentsDisplay<'a>(&'a [Argument]);

impl fmt::Display for ArgumentsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (index, argument) in self.0.iter().enumerate() {
            let prefix = if index != 0 { ", " } else { "" };
            write!(f, "{prefix}{}: {}", argument.name, argument.value)?;
        }
        write!(f, ")")
    }
}

struct DirectivesDisplay<'a>(&'a [Directive]);

impl fmt::Display for DirectivesDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for directive in self.0 {
            write!(f, " @{}{}", directive.name, ArgumentsDisplay(&directive.arguments))?;
        }
        Ok(())
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::Variable(name) => write!(f, "${name}"),
            InputValue::Int(value) => write!(f, "{value}"),
            InputValue::Float(value) => write!(f, "{value:?}"),
            InputValue::String(value) => {
                // JSON string escaping is a valid GraphQL string literal
                let escaped = serde_json::Value::String(value.clone());
                write!(f, "{escaped}")
            }
            InputValue::Boolean(value) => write!(f, "{value}"),
            InputValue::Null => write!(f, "null"),
            InputValue::Enum(value) => write!(f, "{value}"),
            InputValue::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    let prefix = if index != 0 { ", " } else { "" };
                    write!(f, "{prefix}{item}")?;
                }
                write!(f, "]")
            }
            InputValue::Object(fields) => {
                write!(f, "{{")?;
                for (index, (name, value)) in fields.iter().enumerate() {
                    let prefix = if index != 0 { ", " } else { "" };
                    write!(f, "{prefix}{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
