use super::*;
use crate::{
    db::{
        meta::ProjectionRule,
        relation::{CascadeHandler, CascadeSpec},
        store::MemoryStore,
    },
    error::{ErrorClass, ErrorDetail, ErrorOrigin, StoreError},
    obs::{MetricsEvent, metrics_report, metrics_reset_all},
    serialize::Document,
    test_support::{BASE_TYPE, BaseMeta, BaseRecord, DerivedRecord, base_meta, base_rule},
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------

const GROUP_RECORDS: CascadeSpec =
    CascadeSpec::new("records").with_array_removal_fields(&["recordOrder"]);

fn tenant() -> TenantId {
    TenantId::from("biz")
}

fn groups(tenant: &TenantId) -> CollectionPath {
    CollectionPath::tenant(tenant, ["groups"])
}

fn group_handler() -> Arc<dyn RelationshipHandler> {
    Arc::new(CascadeHandler::<BaseRecord, BaseMeta>::new(
        GROUP_RECORDS,
        groups,
        |record: &BaseRecord| {
            Predicate::array_contains(FieldPath::parse("recordOrder"), record.id.clone())
        },
        base_meta,
    ))
}

fn root_links(record: &BaseRecord, tenant: &TenantId) -> Vec<MetaLink> {
    vec![MetaLink::new(
        DocPath::tenant_root(tenant),
        FieldPath::keyed("records", &record.id),
    )]
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(doc) => doc,
        other => panic!("fixture should be an object: {other}"),
    }
}

fn seed_group(store: &MemoryStore, tenant: &TenantId, id: &str, order: &[&str]) {
    store.insert(
        groups(tenant).doc(id),
        object(json!({ "name": id, "recordOrder": order, "records": {} })),
    );
}

fn group(store: &MemoryStore, tenant: &TenantId, id: &str) -> Document {
    store
        .document(&groups(tenant).doc(id))
        .expect("group should exist")
}

// ---------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------

#[test]
fn set_then_get_round_trips() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries);
    let tenant = tenant();

    let record = BaseRecord::new("b1", "Burger");
    repo.set(&record, &tenant).expect("set should succeed");

    assert_eq!(
        repo.get(&tenant, "b1").expect("get should succeed"),
        Some(record)
    );
    assert!(repo.exists(&tenant, "b1").expect("exists should succeed"));
    assert_eq!(repo.get(&tenant, "missing").expect("get should succeed"), None);
}

#[test]
fn tenants_are_isolated() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries);

    repo.set(&BaseRecord::new("b1", "Burger"), &TenantId::from("a"))
        .expect("set should succeed");

    assert_eq!(
        repo.get(&TenantId::from("b"), "b1").expect("get should succeed"),
        None
    );
}

#[test]
fn list_is_ordered_by_id() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries);
    let tenant = tenant();

    for id in ["b3", "b1", "b2"] {
        repo.set(&BaseRecord::new(id, id), &tenant)
            .expect("set should succeed");
    }

    let ids = repo
        .list(&tenant)
        .expect("list should succeed")
        .into_iter()
        .map(|record| record.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["b1", "b2", "b3"]);
}

#[test]
fn find_by_external_reference_returns_single_match() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries);
    let tenant = tenant();
    let records = Repository::<BaseRecord, MemoryStore>::collection(&tenant);

    store.insert(
        records.doc("b1"),
        object(json!({
            "id": "b1", "name": "Burger", "isActive": true,
            "linkedObjects": { "square": { "id": "sq-1" } },
        })),
    );
    store.insert(
        records.doc("b2"),
        object(json!({
            "id": "b2", "name": "Fries", "isActive": true,
            "linkedObjects": { "square": { "id": "sq-2" } },
        })),
    );

    let found = repo
        .find_by_external_reference(&tenant, "sq-2", "square")
        .expect("lookup should succeed")
        .expect("record should be found");
    assert_eq!(found.id, "b2");

    assert_eq!(
        repo.find_by_external_reference(&tenant, "sq-1", "toast")
            .expect("lookup should succeed"),
        None
    );
}

#[test]
fn find_by_external_reference_rejects_duplicates() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries);
    let tenant = tenant();
    let records = Repository::<BaseRecord, MemoryStore>::collection(&tenant);

    for id in ["b2", "b1"] {
        store.insert(
            records.doc(id),
            object(json!({
                "id": id, "name": id, "isActive": true,
                "linkedObjects": { "square": { "id": "sq-1" } },
            })),
        );
    }

    let err = repo
        .find_by_external_reference(&tenant, "sq-1", "square")
        .expect_err("duplicate links should fail");

    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert_eq!(err.origin, ErrorOrigin::Repository);
    assert!(err.message.contains("b1") && err.message.contains("b2"));
    assert!(matches!(
        err.detail,
        Some(ErrorDetail::Store(StoreError::DuplicateExternalReference { ref ids, .. }))
            if ids == &["b1".to_string(), "b2".to_string()]
    ));
}

// ---------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------

#[test]
fn delete_of_missing_id_opens_no_transaction() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries).with_handler(group_handler());

    repo.delete(&tenant(), "missing")
        .expect("deleting a missing id should succeed");

    assert_eq!(store.transactions_started(), 0);
}

#[test]
fn unregistered_type_writes_only_its_own_document() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries);
    let tenant = tenant();
    seed_group(&store, &tenant, "g1", &["b1"]);

    repo.set(&BaseRecord::new("b1", "Burger"), &tenant)
        .expect("set should succeed");
    assert_eq!(group(&store, &tenant, "g1")["records"], json!({}));

    repo.delete(&tenant, "b1").expect("delete should succeed");
    assert_eq!(store.len(), 1);
    assert_eq!(group(&store, &tenant, "g1")["recordOrder"], json!(["b1"]));
}

#[test]
fn direct_handler_cascades_save_and_delete() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries).with_handler(group_handler());
    let tenant = tenant();
    seed_group(&store, &tenant, "g1", &["b1", "b2"]);
    seed_group(&store, &tenant, "g2", &["b2"]);

    repo.set(&BaseRecord::new("b1", "Burger"), &tenant)
        .expect("set should succeed");

    let g1 = group(&store, &tenant, "g1");
    assert_eq!(
        g1["records"]["b1"],
        json!({ "name": "Burger", "isActive": true })
    );
    assert_eq!(group(&store, &tenant, "g2")["records"], json!({}));

    repo.delete(&tenant, "b1").expect("delete should succeed");

    let g1 = group(&store, &tenant, "g1");
    assert_eq!(g1["records"], json!({}));
    assert_eq!(g1["recordOrder"], json!(["b2"]));
    assert_eq!(repo.get(&tenant, "b1").expect("get should succeed"), None);
}

#[test]
fn registered_handler_resolves_for_subtype() {
    let store = MemoryStore::default();
    let mut registries = Registries::new();
    registries.handlers.register(&BASE_TYPE, group_handler());
    let repo = Repository::<DerivedRecord, _>::new(&store, &registries);
    let tenant = tenant();
    seed_group(&store, &tenant, "g1", &["d1"]);

    repo.set(&DerivedRecord::new("d1", "Combo"), &tenant)
        .expect("set should succeed");

    assert_eq!(
        group(&store, &tenant, "g1")["records"]["d1"]["name"],
        json!("Combo")
    );
}

#[test]
fn meta_links_follow_save_and_delete() {
    let store = MemoryStore::default();
    let mut registries = Registries::new();
    registries
        .metadata
        .register::<BaseRecord, _>(base_rule().with_links(root_links))
        .expect("registration should succeed");
    let repo = Repository::<BaseRecord, _>::new(&store, &registries);
    let tenant = tenant();
    let root = DocPath::tenant_root(&tenant);
    store.insert(root.clone(), object(json!({ "name": "Biz" })));

    repo.set(&BaseRecord::new("b1", "Burger"), &tenant)
        .expect("set should succeed");
    assert_eq!(
        store.document(&root).expect("root should exist")["records"]["b1"],
        json!({ "name": "Burger", "isActive": true })
    );

    let mut renamed = BaseRecord::new("b1", "Cheeseburger");
    renamed.is_active = false;
    repo.set(&renamed, &tenant).expect("re-save should succeed");
    assert_eq!(
        store.document(&root).expect("root should exist")["records"]["b1"],
        json!({ "name": "Cheeseburger", "isActive": false })
    );

    repo.delete(&tenant, "b1").expect("delete should succeed");
    let root_doc = store.document(&root).expect("root should exist");
    assert_eq!(root_doc["records"], json!({}));
    assert_eq!(root_doc["name"], json!("Biz"));
}

#[test]
fn missing_meta_link_target_is_skipped_and_counted() {
    metrics_reset_all();
    let store = MemoryStore::default();
    let mut registries = Registries::new();
    registries
        .metadata
        .register::<BaseRecord, _>(base_rule().with_links(root_links))
        .expect("registration should succeed");
    let repo = Repository::<BaseRecord, _>::new(&store, &registries);
    let tenant = tenant();

    repo.set(&BaseRecord::new("b1", "Burger"), &tenant)
        .expect("set should succeed without a tenant root");

    assert_eq!(store.len(), 1);
    assert!(store.document(&DocPath::tenant_root(&tenant)).is_none());

    let counters = metrics_report(None)
        .counters
        .expect("report should include counters");
    assert_eq!(counters.ops.meta_link_skips, 1);
    assert_eq!(counters.ops.meta_link_writes, 0);
    assert_eq!(counters.entities["BaseRecord"].meta_link_skips, 1);
}

#[test]
fn delete_uses_stored_state_for_meta_links() {
    let store = MemoryStore::default();
    let mut registries = Registries::new();
    registries
        .metadata
        .register::<BaseRecord, _>(ProjectionRule::new(base_meta).with_links(
            |record: &BaseRecord, tenant: &TenantId| {
                vec![MetaLink::new(
                    DocPath::tenant_root(tenant),
                    FieldPath::keyed("byName", &record.name),
                )]
            },
        ))
        .expect("registration should succeed");
    let repo = Repository::<BaseRecord, _>::new(&store, &registries);
    let tenant = tenant();
    let root = DocPath::tenant_root(&tenant);
    store.insert(root.clone(), Document::new());

    repo.set(&BaseRecord::new("b1", "Burger"), &tenant)
        .expect("set should succeed");
    repo.delete(&tenant, "b1").expect("delete should succeed");

    assert_eq!(
        store.document(&root).expect("root should exist")["byName"],
        json!({})
    );
}

#[test]
fn update_skips_projections_and_missing_documents() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries).with_handler(group_handler());
    let tenant = tenant();
    seed_group(&store, &tenant, "g1", &["b1"]);

    repo.update(&BaseRecord::new("b1", "Ghost"), &tenant)
        .expect("update of a missing entity should succeed");
    assert_eq!(repo.get(&tenant, "b1").expect("get should succeed"), None);

    repo.set(&BaseRecord::new("b1", "Burger"), &tenant)
        .expect("set should succeed");
    repo.update(&BaseRecord::new("b1", "Renamed"), &tenant)
        .expect("update should succeed");

    let stored = repo
        .get(&tenant, "b1")
        .expect("get should succeed")
        .expect("record should exist");
    assert_eq!(stored.name, "Renamed");
    assert_eq!(
        group(&store, &tenant, "g1")["records"]["b1"]["name"],
        json!("Burger")
    );
}

// ---------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------

#[test]
fn writes_report_meta_link_and_cascade_counters() {
    metrics_reset_all();
    let store = MemoryStore::default();
    let mut registries = Registries::new();
    registries
        .metadata
        .register::<BaseRecord, _>(base_rule().with_links(root_links))
        .expect("registration should succeed");
    let repo = Repository::<BaseRecord, _>::new(&store, &registries).with_handler(group_handler());
    let tenant = tenant();
    store.insert(DocPath::tenant_root(&tenant), Document::new());
    seed_group(&store, &tenant, "g1", &["b1"]);
    seed_group(&store, &tenant, "g2", &["b1"]);

    repo.set(&BaseRecord::new("b1", "Burger"), &tenant)
        .expect("set should succeed");
    repo.delete(&tenant, "b1").expect("delete should succeed");

    let counters = metrics_report(None)
        .counters
        .expect("report should include counters");
    assert_eq!(counters.ops.save_calls, 1);
    assert_eq!(counters.ops.delete_calls, 1);
    assert_eq!(counters.ops.meta_link_writes, 2);
    assert_eq!(counters.ops.cascade_parent_writes, 4);
    assert_eq!(counters.ops.docs_deleted, 1);
}

static SINK_EVENTS: AtomicU64 = AtomicU64::new(0);

struct CountingSink;

impl MetricsSink for CountingSink {
    fn record(&self, event: MetricsEvent) {
        if matches!(event, MetricsEvent::ExecStart { .. }) {
            SINK_EVENTS.fetch_add(1, Ordering::SeqCst);
        }
    }
}

static COUNTING_SINK: CountingSink = CountingSink;

#[test]
fn metrics_sink_override_receives_events() {
    let store = MemoryStore::default();
    let registries = Registries::new();
    let repo = Repository::<BaseRecord, _>::new(&store, &registries).metrics_sink(&COUNTING_SINK);
    let before = SINK_EVENTS.load(Ordering::SeqCst);

    repo.set(&BaseRecord::new("b1", "Burger"), &tenant())
        .expect("set should succeed");
    repo.get(&tenant(), "b1").expect("get should succeed");

    assert_eq!(SINK_EVENTS.load(Ordering::SeqCst) - before, 2);
}
