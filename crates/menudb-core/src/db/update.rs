use crate::{db::path::FieldPath, serialize::Document};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

///
/// FieldOp
///
/// One field mutation inside a partial document update.
/// `Delete` and `ArrayRemove` are the datastore's sentinel values.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FieldOp {
    Set(Value),
    Delete,
    ArrayRemove(Vec<Value>),
}

/// Partial update: field path to the operation applied there.
pub type UpdateOps = BTreeMap<FieldPath, FieldOp>;

///
/// FieldUpdate
///
/// Batched mutation for one parent document.
///
/// Applying it is idempotent: sets overwrite, deleting an absent field is a
/// no-op, and removing an absent array element is a no-op.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldUpdate {
    pub fields_to_set: BTreeMap<FieldPath, Value>,
    pub fields_to_delete: Vec<FieldPath>,
    pub array_field_removals: BTreeMap<FieldPath, Value>,
}

impl FieldUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields_to_set.is_empty()
            && self.fields_to_delete.is_empty()
            && self.array_field_removals.is_empty()
    }

    /// Lower into the datastore's partial-update form.
    #[must_use]
    pub fn to_ops(&self) -> UpdateOps {
        let mut ops = UpdateOps::new();

        for (field, value) in &self.fields_to_set {
            ops.insert(field.clone(), FieldOp::Set(value.clone()));
        }
        for field in &self.fields_to_delete {
            ops.insert(field.clone(), FieldOp::Delete);
        }
        for (field, value) in &self.array_field_removals {
            ops.insert(field.clone(), FieldOp::ArrayRemove(vec![value.clone()]));
        }

        ops
    }
}

///
/// ParentUpdate
///
/// The field update owed to one discovered parent document.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ParentUpdate {
    pub parent_id: String,
    pub update: FieldUpdate,
}

/// Apply partial-update ops to a document body.
pub fn apply_ops(document: &mut Document, ops: &UpdateOps) {
    for (field, op) in ops {
        match op {
            FieldOp::Set(value) => set_field(document, field, value.clone()),
            FieldOp::Delete => delete_field(document, field),
            FieldOp::ArrayRemove(values) => remove_array_values(document, field, values),
        }
    }
}

// Set a nested field, creating (or replacing non-object) intermediate maps.
fn set_field(document: &mut Document, field: &FieldPath, value: Value) {
    let Some((last, parents)) = field.segments().split_last() else {
        return;
    };

    let mut current = document;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(next) => next,
            _ => return,
        };
    }

    current.insert(last.clone(), value);
}

fn delete_field(document: &mut Document, field: &FieldPath) {
    let Some((last, parents)) = field.segments().split_last() else {
        return;
    };

    if let Some(map) = nested_map_mut(document, parents) {
        map.remove(last);
    }
}

fn remove_array_values(document: &mut Document, field: &FieldPath, values: &[Value]) {
    let Some((last, parents)) = field.segments().split_last() else {
        return;
    };

    if let Some(Value::Array(items)) =
        nested_map_mut(document, parents).and_then(|map| map.get_mut(last))
    {
        items.retain(|item| !values.contains(item));
    }
}

fn nested_map_mut<'a>(document: &'a mut Document, path: &[String]) -> Option<&'a mut Document> {
    let mut current = document;
    for segment in path {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    Some(current)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("test document must be an object: {other}"),
        }
    }

    fn cascade_delete_update(id: &str) -> FieldUpdate {
        FieldUpdate {
            fields_to_set: BTreeMap::new(),
            fields_to_delete: vec![FieldPath::keyed("products", id)],
            array_field_removals: BTreeMap::from([(
                FieldPath::parse("productDisplayOrder"),
                json!(id),
            )]),
        }
    }

    #[test]
    fn set_creates_missing_intermediate_maps() {
        let mut category = doc(json!({ "name": "Mains" }));
        let mut ops = UpdateOps::new();
        ops.insert(
            FieldPath::keyed("products", "p1"),
            FieldOp::Set(json!({ "name": "Burger" })),
        );

        apply_ops(&mut category, &ops);

        assert_eq!(
            Value::Object(category),
            json!({ "name": "Mains", "products": { "p1": { "name": "Burger" } } })
        );
    }

    #[test]
    fn delete_and_array_remove_clear_entity_traces() {
        let mut category = doc(json!({
            "products": { "p1": { "name": "Burger" }, "p2": { "name": "Fries" } },
            "productDisplayOrder": ["p1", "p2", "p1"]
        }));

        apply_ops(&mut category, &cascade_delete_update("p1").to_ops());

        assert_eq!(
            Value::Object(category),
            json!({
                "products": { "p2": { "name": "Fries" } },
                "productDisplayOrder": ["p2"]
            })
        );
    }

    #[test]
    fn removals_against_absent_fields_are_noops() {
        let original = doc(json!({ "name": "Empty" }));
        let mut category = original.clone();

        apply_ops(&mut category, &cascade_delete_update("p1").to_ops());

        assert_eq!(category, original);
    }

    #[test]
    fn empty_update_reports_empty() {
        assert!(FieldUpdate::default().is_empty());
        assert!(FieldUpdate::default().to_ops().is_empty());
        assert!(!cascade_delete_update("p1").is_empty());
    }

    fn arb_id() -> impl Strategy<Value = String> {
        prop_oneof![Just("p1".to_string()), Just("p2".to_string()), Just("p3".to_string())]
    }

    fn arb_category() -> impl Strategy<Value = Document> {
        prop::collection::vec(arb_id(), 0..4).prop_map(|order| {
            let products = order
                .iter()
                .map(|id| (id.clone(), json!({ "name": id })))
                .collect::<Map<_, _>>();
            doc(json!({ "products": products, "productDisplayOrder": order }))
        })
    }

    fn arb_update() -> impl Strategy<Value = FieldUpdate> {
        (arb_id(), any::<bool>()).prop_map(|(id, delete)| {
            if delete {
                cascade_delete_update(&id)
            } else {
                FieldUpdate {
                    fields_to_set: BTreeMap::from([(
                        FieldPath::keyed("products", &id),
                        json!({ "name": "renamed" }),
                    )]),
                    ..FieldUpdate::default()
                }
            }
        })
    }

    proptest! {
        #[test]
        fn applying_an_update_twice_equals_applying_once(
            category in arb_category(),
            update in arb_update(),
        ) {
            let ops = update.to_ops();

            let mut once = category.clone();
            apply_ops(&mut once, &ops);

            let mut twice = category;
            apply_ops(&mut twice, &ops);
            apply_ops(&mut twice, &ops);

            prop_assert_eq!(once, twice);
        }
    }
}
