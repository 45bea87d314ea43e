use crate::{
    db::{
        path::CollectionPath,
        predicate::Predicate,
        relation::{
            CascadePlan, RelationshipHandler,
            builder::{CascadeSpec, build_deleted_updates, build_saved_updates},
        },
        store::{Query, Transaction},
    },
    error::InternalError,
    serialize::to_value,
    traits::{EntityKind, EntityRef},
    types::TenantId,
};
use serde::Serialize;
use tracing::{debug, trace};

///
/// CascadeHandler
///
/// Keeps the projection of `T` current inside every parent document that
/// references it. Parents are discovered by querying one collection with
/// one predicate; nothing about the relationship is stored on `T` itself.
///

pub struct CascadeHandler<T, M> {
    spec: CascadeSpec,
    parent_collection: fn(&TenantId) -> CollectionPath,
    parent_predicate: fn(&T) -> Predicate,
    project: fn(&T) -> M,
}

impl<T, M> CascadeHandler<T, M> {
    #[must_use]
    pub const fn new(
        spec: CascadeSpec,
        parent_collection: fn(&TenantId) -> CollectionPath,
        parent_predicate: fn(&T) -> Predicate,
        project: fn(&T) -> M,
    ) -> Self {
        Self {
            spec,
            parent_collection,
            parent_predicate,
            project,
        }
    }
}

impl<T, M> CascadeHandler<T, M>
where
    T: EntityKind,
{
    fn view<'a>(&self, entity: &'a dyn EntityRef) -> Result<&'a T, InternalError> {
        entity.view::<T>().ok_or_else(|| {
            InternalError::cascade_invariant(format!(
                "cascade handler for '{}' cannot view entity of type '{}'",
                T::TYPE.name,
                entity.entity_type().name
            ))
        })
    }

    // Ids of every parent currently referencing `entity`, ordered by id.
    fn discover(
        &self,
        entity: &T,
        tenant: &TenantId,
        tx: &mut dyn Transaction,
    ) -> Result<(CollectionPath, Vec<String>), InternalError> {
        let collection = (self.parent_collection)(tenant);
        let query = Query::filter(collection.clone(), (self.parent_predicate)(entity));
        let mut parent_ids = tx
            .query(&query)?
            .into_iter()
            .map(|snapshot| snapshot.id)
            .collect::<Vec<_>>();
        // one update per parent document
        parent_ids.sort_unstable();
        parent_ids.dedup();

        trace!(
            entity = T::TYPE.name,
            id = entity.id(),
            %collection,
            parents = parent_ids.len(),
            "discovered cascade parents"
        );

        Ok((collection, parent_ids))
    }
}

impl<T, M> RelationshipHandler for CascadeHandler<T, M>
where
    T: EntityKind,
    M: Serialize + 'static,
{
    fn prepare_set(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
        tx: &mut dyn Transaction,
    ) -> Result<CascadePlan, InternalError> {
        let entity = self.view(entity)?;
        let (collection, parent_ids) = self.discover(entity, tenant, tx)?;
        if parent_ids.is_empty() {
            return Ok(CascadePlan::default());
        }

        let meta = to_value(&(self.project)(entity))?;
        let updates = build_saved_updates(entity.id(), &meta, &parent_ids, &self.spec);
        debug!(
            entity = T::TYPE.name,
            id = entity.id(),
            map_field = self.spec.map_field,
            parents = updates.len(),
            "cascading saved projection"
        );

        Ok(CascadePlan::new(collection, updates))
    }

    fn prepare_delete(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
        tx: &mut dyn Transaction,
    ) -> Result<CascadePlan, InternalError> {
        let entity = self.view(entity)?;
        let (collection, parent_ids) = self.discover(entity, tenant, tx)?;
        if parent_ids.is_empty() {
            return Ok(CascadePlan::default());
        }

        let updates = build_deleted_updates(entity.id(), &parent_ids, &self.spec);
        debug!(
            entity = T::TYPE.name,
            id = entity.id(),
            map_field = self.spec.map_field,
            parents = updates.len(),
            "cascading delete"
        );

        Ok(CascadePlan::new(collection, updates))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            path::FieldPath,
            store::{DocumentStore, MemoryStore},
        },
        error::ErrorOrigin,
        serialize::Document,
        test_support::{BaseMeta, BaseRecord, DerivedRecord, UnrelatedRecord, base_meta},
    };
    use serde_json::{Value, json};

    const GROUP_RECORDS: CascadeSpec = CascadeSpec::new("records")
        .with_additional_delete_fields(&["recordNotes"])
        .with_array_removal_fields(&["recordOrder"]);

    fn groups(tenant: &TenantId) -> CollectionPath {
        CollectionPath::tenant(tenant, ["groups"])
    }

    fn handler() -> CascadeHandler<BaseRecord, BaseMeta> {
        CascadeHandler::new(
            GROUP_RECORDS,
            groups,
            |record: &BaseRecord| {
                Predicate::array_contains(FieldPath::parse("recordOrder"), record.id.clone())
            },
            base_meta,
        )
    }

    fn group(order: &[&str]) -> Document {
        let Value::Object(doc) = json!({
            "name": "Group",
            "recordOrder": order,
            "records": {},
            "recordNotes": { "b1": "note" },
        }) else {
            unreachable!("literal is an object")
        };

        doc
    }

    fn seeded_store(tenant: &TenantId) -> MemoryStore {
        let store = MemoryStore::default();
        store.insert(groups(tenant).doc("g1"), group(&["b1", "b2"]));
        store.insert(groups(tenant).doc("g2"), group(&["b1"]));
        store.insert(groups(tenant).doc("g3"), group(&["b2"]));
        store
    }

    #[test]
    fn save_writes_projection_into_referencing_parents_only() {
        let tenant = TenantId::from("biz");
        let store = seeded_store(&tenant);
        let record = BaseRecord::new("b1", "Burger");

        let written = store
            .run_transaction(|tx| handler().on_set(&record, &tenant, tx))
            .expect("cascade should commit");
        assert_eq!(written, 2);

        for id in ["g1", "g2"] {
            let doc = store
                .document(&groups(&tenant).doc(id))
                .expect("parent should exist");
            assert_eq!(
                doc["records"]["b1"],
                json!({ "name": "Burger", "isActive": true })
            );
        }
        let untouched = store
            .document(&groups(&tenant).doc("g3"))
            .expect("parent should exist");
        assert_eq!(untouched["records"], json!({}));
    }

    #[test]
    fn delete_strips_map_entry_extra_fields_and_array_element() {
        let tenant = TenantId::from("biz");
        let store = seeded_store(&tenant);
        let record = BaseRecord::new("b1", "Burger");
        store
            .run_transaction(|tx| handler().on_set(&record, &tenant, tx))
            .expect("save cascade should commit");

        let written = store
            .run_transaction(|tx| handler().on_delete(&record, &tenant, tx))
            .expect("delete cascade should commit");
        assert_eq!(written, 2);

        let g1 = store
            .document(&groups(&tenant).doc("g1"))
            .expect("parent should exist");
        assert_eq!(g1["recordOrder"], json!(["b2"]));
        assert_eq!(g1["records"], json!({}));
        assert_eq!(g1["recordNotes"], json!({}));
        assert_eq!(g1["name"], json!("Group"));
    }

    #[test]
    fn no_parents_means_empty_plan_and_no_writes() {
        let tenant = TenantId::from("biz");
        let store = seeded_store(&tenant);
        let record = BaseRecord::new("b9", "Lonely");

        let plan = store
            .run_transaction(|tx| handler().prepare_set(&record, &tenant, tx))
            .expect("prepare should succeed");

        assert!(plan.is_empty());
    }

    #[test]
    fn derived_entity_cascades_through_base_view() {
        let tenant = TenantId::from("biz");
        let store = seeded_store(&tenant);
        let derived = DerivedRecord::new("b2", "Fries");

        let written = store
            .run_transaction(|tx| handler().on_set(&derived, &tenant, tx))
            .expect("cascade should commit");

        assert_eq!(written, 2);
        let g3 = store
            .document(&groups(&tenant).doc("g3"))
            .expect("parent should exist");
        assert_eq!(g3["records"]["b2"]["name"], json!("Fries"));
    }

    #[test]
    fn unrelated_entity_is_rejected() {
        let tenant = TenantId::from("biz");
        let store = seeded_store(&tenant);
        let unrelated = UnrelatedRecord::new("u1");

        let err = store
            .run_transaction(|tx| handler().on_set(&unrelated, &tenant, tx))
            .expect_err("unrelated entity should not be viewable");

        assert_eq!(err.origin, ErrorOrigin::Cascade);
    }
}
