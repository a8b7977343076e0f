use cynic_parser::{
    common::OperationType as ParsedOperationType,
    executable::{self as parsed, Iter},
    ConstValue, ExecutableDocument, Value,
};

use super::{
    Argument, Directive, Document, Field, FragmentDefinition, FragmentSpread, Fragments, InlineFragment, InputValue,
    OperationDefinition, OperationType, Selection, SelectionSet, VariableDefinition,
};
use crate::error::DocumentError;

pub(super) fn lower_document(document: &ExecutableDocument) -> Result<Document, DocumentError> {
    let operation = document.operations().next().map(lower_operation);

    let mut fragments = Fragments::default();
    for fragment in document.fragments() {
        let name = fragment.name().to_string();
        if fragments.contains_key(&name) {
            return Err(DocumentError::DuplicateFragment(name));
        }
        fragments.insert(
            name.clone(),
            FragmentDefinition {
                name,
                type_condition: fragment.type_condition().to_string(),
                directives: lower_directives(fragment.directives()),
                selection_set: lower_selection_set(fragment.selection_set()),
            },
        );
    }

    Document::new(operation, fragments)
}

fn lower_operation(operation: parsed::OperationDefinition<'_>) -> OperationDefinition {
    let operation_type = match operation.operation_type() {
        ParsedOperationType::Query => OperationType::Query,
        ParsedOperationType::Mutation => OperationType::Mutation,
        ParsedOperationType::Subscription => OperationType::Subscription,
    };

    OperationDefinition {
        operation_type,
        name: operation.name().map(str::to_string),
        variables: operation
            .variable_definitions()
            .map(|definition| VariableDefinition {
                name: definition.name().to_string(),
                ty: definition.ty().to_string(),
                default_value: definition.default_value().map(lower_const_value),
            })
            .collect(),
        directives: lower_directives(operation.directives()),
        selection_set: lower_selection_set(operation.selection_set()),
    }
}

fn lower_selection_set(selections: Iter<'_, parsed::Selection<'_>>) -> SelectionSet {
    selections
        .map(|selection| match selection {
            parsed::Selection::Field(field) => Selection::Field(Field {
                alias: field.alias().map(str::to_string),
                name: field.name().to_string(),
                arguments: lower_arguments(field.arguments()),
                directives: lower_directives(field.directives()),
                selection_set: lower_selection_set(field.selection_set()),
            }),
            parsed::Selection::InlineFragment(fragment) => Selection::InlineFragment(InlineFragment {
                type_condition: fragment.type_condition().map(str::to_string),
                directives: lower_directives(fragment.directives()),
                selection_set: lower_selection_set(fragment.selection_set()),
            }),
            parsed::Selection::FragmentSpread(spread) => Selection::FragmentSpread(FragmentSpread {
                fragment_name: spread.fragment_name().to_string(),
                directives: lower_directives(spread.directives()),
            }),
        })
        .collect()
}

fn lower_directives(directives: Iter<'_, parsed::Directive<'_>>) -> Vec<Directive> {
    directives
        .map(|directive| Directive {
            name: directive.name().to_string(),
            arguments: lower_arguments(directive.arguments()),
        })
        .collect()
}

fn lower_arguments(arguments: Iter<'_, parsed::Argument<'_>>) -> Vec<Argument> {
    arguments
        .map(|argument| Argument {
            name: argument.name().to_string(),
            value: lower_value(argument.value()),
        })
        .collect()
}

fn lower_value(value: Value<'_>) -> InputValue {
    match value {
        Value::Variable(variable) => InputValue::Variable(variable.name().to_string()),
        Value::Int(int) => InputValue::Int(int.as_i64()),
        Value::Float(float) => InputValue::Float(float.as_f64()),
        Value::String(string) => InputValue::String(string.as_str().to_string()),
        Value::Boolean(boolean) => InputValue::Boolean(boolean.value()),
        Value::Null(_) => InputValue::Null,
        Value::Enum(value) => InputValue::Enum(value.name().to_string()),
        Value::List(list) => InputValue::List(list.items().map(lower_value).collect()),
        Value::Object(object) => InputValue::Object(
            object
                .fields()
                .map(|field| (field.name().to_string(), lower_value(field.value())))
                .collect(),
        ),
    }
}

fn lower_const_value(value: ConstValue<'_>) -> InputValue {
    match value {
        ConstValue::Int(int) => InputValue::Int(int.as_i64()),
        ConstValue::Float(float) => InputValue::Float(float.as_f64()),
        ConstValue::String(string) => InputValue::String(string.as_str().to_string()),
        ConstValue::Boolean(boolean) => InputValue::Boolean(boolean.value()),
        ConstValue::Null(_) => InputValue::Null,
        ConstValue::Enum(value) => InputValue::Enum(value.name().to_string()),
        ConstValue::List(list) => InputValue::List(list.items().map(lower_const_value).collect()),
        ConstValue::Object(object) => InputValue::Object(
            object
                .fields()
                .map(|field| (field.name().to_string(), lower_const_value(field.value())))
                .collect(),
        ),
    }
}
