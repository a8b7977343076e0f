use crate::{
    ast::{should_include, Field, Fragments, Selection, SelectionSet, Variables},
    schema::SchemaPredicates,
};

/// Flattens selection sets into the fields that apply to one object.
///
/// Fragments are matched against the object's typename: exactly, through the
/// schema when there is one, and otherwise heuristically by checking that
/// every field the fragment selects is present.
pub(crate) struct FieldCollector<'a> {
    fragments: &'a Fragments,
    variables: &'a Variables,
    schema: Option<&'a SchemaPredicates>,
}

impl<'a> FieldCollector<'a> {
    pub fn new(fragments: &'a Fragments, variables: &'a Variables, schema: Option<&'a SchemaPredicates>) -> Self {
        FieldCollector {
            fragments,
            variables,
            schema,
        }
    }

    pub fn variables(&self) -> &'a Variables {
        self.variables
    }

    /// The fields of `selection_set` that apply to an object of `typename`.
    ///
    /// `is_present` tells whether a field has data, for heuristic matching.
    pub fn collect<'s>(
        &self,
        selection_set: &'s SelectionSet,
        typename: Option<&str>,
        is_present: &dyn Fn(&Field) -> bool,
    ) -> Vec<&'s Field>
    where
        'a: 's,
    {
        let mut fields = Vec::new();
        self.collect_into(selection_set, typename, is_present, &mut fields);
        fields
    }

    fn collect_into<'s>(
        &self,
        selection_set: &'s SelectionSet,
        typename: Option<&str>,
        is_present: &dyn Fn(&Field) -> bool,
        fields: &mut Vec<&'s Field>,
    ) where
        'a: 's,
    {
        for selection in selection_set {
            match selection {
                Selection::Field(field) => {
                    if should_include(&field.directives, self.variables) {
                        fields.push(field);
                    }
                }
                Selection::InlineFragment(fragment) => {
                    if !should_include(&fragment.directives, self.variables) {
                        continue;
                    }
                    let matches = match &fragment.type_condition {
                        Some(type_condition) => {
                            self.matches(type_condition, typename, &fragment.selection_set, is_present)
                        }
                        None => true,
                    };
                    if matches {
                        self.collect_into(&fragment.selection_set, typename, is_present, fields);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !should_include(&spread.directives, self.variables) {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(&spread.fragment_name) else {
                        tracing::warn!("the fragment {} is not defined in the document", spread.fragment_name);
                        continue;
                    };
                    if self.matches(&fragment.type_condition, typename, &fragment.selection_set, is_present) {
                        self.collect_into(&fragment.selection_set, typename, is_present, fields);
                    }
                }
            }
        }
    }

    fn matches(
        &self,
        type_condition: &str,
        typename: Option<&str>,
        selection_set: &SelectionSet,
        is_present: &dyn Fn(&Field) -> bool,
    ) -> bool {
        if typename == Some(type_condition) {
            return true;
        }

        if let (Some(schema), Some(typename)) = (self.schema, typename) {
            return schema.is_interface_of_type(type_condition, typename);
        }

        let matches = selection_set.iter().all(|selection| match selection {
            Selection::Field(field) => {
                field.name == "__typename" || !should_include(&field.directives, self.variables) || is_present(field)
            }
            Selection::InlineFragment(_) | Selection::FragmentSpread(_) => true,
        });

        if matches {
            tracing::warn!(
                "heuristic fragment matching: a fragment on {type_condition} was matched against {}, configure a schema to match fragments exactly",
                typename.unwrap_or("an object without a typename")
            );
        }

        matches
    }
}
