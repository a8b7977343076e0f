use crate::{
    keys::{Dependencies, EntityKey, FieldKey},
    store::{Store, WriteTarget},
};

/// Removes one field of an entity, or the whole entity when no field is given
pub(crate) fn invalidate(
    store: &mut Store,
    target: WriteTarget,
    entity: &EntityKey,
    field: Option<&FieldKey>,
) -> Dependencies {
    let fields = match field {
        Some(field) => vec![field.clone()],
        None => store
            .inspect_fields(entity)
            .into_iter()
            .map(|info| info.field_key)
            .collect(),
    };

    tracing::debug!("invalidating {} field(s) of {entity}", fields.len());

    fields
        .iter()
        .map(|field| store.remove_field(target, entity, field))
        .collect()
}
