use super::{Field, Selection, SelectionSet};

const TYPENAME: &str = "__typename";

/// Adds a `__typename` selection to `selection_set` (when `include_self` is set)
/// and to every nested selection set.
///
/// The operation root never needs one, its typename is the root type.
pub(super) fn add_typenames(selection_set: &mut SelectionSet, include_self: bool) {
    for selection in selection_set.iter_mut() {
        match selection {
            Selection::Field(field) if field.is_composite() => add_typenames(&mut field.selection_set, true),
            Selection::InlineFragment(fragment) => add_typenames(&mut fragment.selection_set, include_self),
            Selection::Field(_) | Selection::FragmentSpread(_) => {}
        }
    }

    if include_self && !selects_typename(selection_set) {
        selection_set.push(Selection::Field(Field::leaf(TYPENAME)));
    }
}

fn selects_typename(selection_set: &SelectionSet) -> bool {
    selection_set.iter().any(|selection| {
        matches!(
            selection,
            Selection::Field(field) if field.name == TYPENAME && field.alias.is_none()
        )
    })
}
