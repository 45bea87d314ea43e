use crate::db::{
    path::FieldPath,
    update::{FieldUpdate, ParentUpdate},
};
use serde_json::Value;
use std::collections::BTreeMap;

///
/// CascadeSpec
///
/// Static description of where an entity's projection lives inside the
/// parents that reference it.
///
/// - `map_field`: map in the parent keyed by entity id, holding the projection.
/// - `additional_delete_fields`: other maps keyed by the same id, cleared on delete.
/// - `array_removal_fields`: arrays of ids the entity is removed from on delete.
///
/// Every name is a single top-level field; dots are not path separators.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CascadeSpec {
    pub map_field: &'static str,
    pub additional_delete_fields: &'static [&'static str],
    pub array_removal_fields: &'static [&'static str],
}

impl CascadeSpec {
    #[must_use]
    pub const fn new(map_field: &'static str) -> Self {
        Self {
            map_field,
            additional_delete_fields: &[],
            array_removal_fields: &[],
        }
    }

    #[must_use]
    pub const fn with_additional_delete_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.additional_delete_fields = fields;
        self
    }

    #[must_use]
    pub const fn with_array_removal_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.array_removal_fields = fields;
        self
    }
}

/// Updates that write `meta` into every parent's `<map_field>.<entity_id>`.
///
/// Pure: the projection and field names arrive as arguments. One update is
/// returned per input id, in input order.
#[must_use]
pub fn build_saved_updates(
    entity_id: &str,
    meta: &Value,
    parent_ids: &[String],
    spec: &CascadeSpec,
) -> Vec<ParentUpdate> {
    let field = FieldPath::keyed(spec.map_field, entity_id);

    parent_ids
        .iter()
        .map(|parent_id| ParentUpdate {
            parent_id: parent_id.clone(),
            update: FieldUpdate {
                fields_to_set: BTreeMap::from([(field.clone(), meta.clone())]),
                ..FieldUpdate::default()
            },
        })
        .collect()
}

/// Updates that strip every trace of `entity_id` from each parent.
#[must_use]
pub fn build_deleted_updates(
    entity_id: &str,
    parent_ids: &[String],
    spec: &CascadeSpec,
) -> Vec<ParentUpdate> {
    let fields_to_delete = std::iter::once(spec.map_field)
        .chain(spec.additional_delete_fields.iter().copied())
        .map(|map_field| FieldPath::keyed(map_field, entity_id))
        .collect::<Vec<_>>();
    let array_field_removals = spec
        .array_removal_fields
        .iter()
        .map(|field| (FieldPath::new([*field]), Value::String(entity_id.to_string())))
        .collect::<BTreeMap<_, _>>();

    parent_ids
        .iter()
        .map(|parent_id| ParentUpdate {
            parent_id: parent_id.clone(),
            update: FieldUpdate {
                fields_to_set: BTreeMap::new(),
                fields_to_delete: fields_to_delete.clone(),
                array_field_removals: array_field_removals.clone(),
            },
        })
        .collect()
}

///
/// TESTS
///
