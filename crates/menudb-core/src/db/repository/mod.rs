#[cfg(test)]
mod tests;

use crate::{
    db::{
        meta::MetaLink,
        path::{CollectionPath, DocPath, FieldPath},
        predicate::Predicate,
        registry::Registries,
        relation::{CascadePlan, RelationshipHandler},
        store::{DocumentStore, Query, Transaction},
        update::{FieldOp, UpdateOps},
    },
    error::InternalError,
    obs::sink::{ExecKind, MetricsEvent, MetricsSink, Span, record, with_metrics_sink},
    serialize::{from_document, to_document},
    traits::EntityKind,
    types::TenantId,
};
use std::{marker::PhantomData, sync::Arc};
use tracing::{debug, warn};

/// Field holding external-system references, keyed by provider.
pub const LINKED_OBJECTS_FIELD: &str = "linkedObjects";

///
/// Repository
///
/// Per-entity-type data access over a document store.
///
/// `set` and `delete` run as one transaction each. Inside it every read
/// (entity re-read, meta-link targets, cascade discovery) happens before the
/// first write, and the writes land in this order: the entity document,
/// meta-link fields, cascade parent updates.
///

pub struct Repository<'a, E, S> {
    store: &'a S,
    registries: &'a Registries,
    handler: Option<Arc<dyn RelationshipHandler>>,
    metrics: Option<&'static dyn MetricsSink>,
    _marker: PhantomData<fn() -> E>,
}

// Counts produced inside a transaction callback; recorded once it commits.
#[derive(Clone, Copy, Debug, Default)]
struct WriteOutcome {
    meta_links: usize,
    skipped_links: usize,
    parents: usize,
}

impl<'a, E, S> Repository<'a, E, S>
where
    E: EntityKind,
    S: DocumentStore,
{
    #[must_use]
    pub const fn new(store: &'a S, registries: &'a Registries) -> Self {
        Self {
            store,
            registries,
            handler: None,
            metrics: None,
            _marker: PhantomData,
        }
    }

    /// Use `handler` instead of whatever the registry resolves for `E`.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn RelationshipHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Route this repository's metrics events to `sink`.
    #[must_use]
    pub const fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Collection holding `E` documents for `tenant`.
    #[must_use]
    pub fn collection(tenant: &TenantId) -> CollectionPath {
        CollectionPath::tenant(tenant, [E::TYPE.collection])
    }

    fn doc_path(tenant: &TenantId, id: &str) -> DocPath {
        Self::collection(tenant).doc(id)
    }

    fn with_metrics<T>(
        &self,
        f: impl FnOnce() -> Result<T, InternalError>,
    ) -> Result<T, InternalError> {
        if let Some(sink) = self.metrics {
            with_metrics_sink(sink, f)
        } else {
            f()
        }
    }

    fn handler(&self) -> Option<&dyn RelationshipHandler> {
        match &self.handler {
            Some(handler) => Some(handler.as_ref()),
            None => self.registries.handlers.resolve(E::TYPE),
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Load one entity; `None` when the document does not exist.
    pub fn get(&self, tenant: &TenantId, id: &str) -> Result<Option<E>, InternalError> {
        self.with_metrics(|| {
            let mut span = Span::<E>::new(ExecKind::Load);
            let Some(snapshot) = self.store.get(&Self::doc_path(tenant, id))? else {
                return Ok(None);
            };
            span.set_docs(1);

            Ok(Some(from_document(snapshot.data)?))
        })
    }

    pub fn exists(&self, tenant: &TenantId, id: &str) -> Result<bool, InternalError> {
        Ok(self.store.get(&Self::doc_path(tenant, id))?.is_some())
    }

    /// Every entity of the tenant's collection, ordered by id.
    pub fn list(&self, tenant: &TenantId) -> Result<Vec<E>, InternalError> {
        self.with_metrics(|| {
            let mut span = Span::<E>::new(ExecKind::Load);
            let snapshots = self.store.query(&Query::all(Self::collection(tenant)))?;
            span.set_docs(snapshots.len() as u64);

            snapshots
                .into_iter()
                .map(|snapshot| from_document(snapshot.data).map_err(InternalError::from))
                .collect()
        })
    }

    /// Find the entity linked to `external_id` at `provider`.
    ///
    /// More than one match is a data-integrity violation and fails with an
    /// error naming every matching document.
    pub fn find_by_external_reference(
        &self,
        tenant: &TenantId,
        external_id: &str,
        provider: &str,
    ) -> Result<Option<E>, InternalError> {
        self.with_metrics(|| {
            let mut span = Span::<E>::new(ExecKind::Lookup);
            let field = FieldPath::new([LINKED_OBJECTS_FIELD, provider, "id"]);
            let query = Query::filter(Self::collection(tenant), Predicate::eq(field, external_id));
            let mut snapshots = self.store.query(&query)?;
            span.set_docs(snapshots.len() as u64);

            if snapshots.len() > 1 {
                let ids = snapshots.into_iter().map(|s| s.id).collect::<Vec<_>>();
                warn!(
                    entity = E::TYPE.name,
                    tenant = %tenant,
                    provider,
                    external_id,
                    ?ids,
                    "external reference linked to multiple documents"
                );

                return Err(InternalError::duplicate_external_reference(
                    provider,
                    external_id,
                    ids,
                ));
            }

            snapshots
                .pop()
                .map(|snapshot| from_document(snapshot.data))
                .transpose()
                .map_err(InternalError::from)
        })
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Save `entity` and bring every projection of it up to date.
    pub fn set(&self, entity: &E, tenant: &TenantId) -> Result<(), InternalError> {
        self.with_metrics(|| {
            let mut span = Span::<E>::new(ExecKind::Save);
            let path = Self::doc_path(tenant, entity.id());
            let data = to_document(entity)?;
            let meta = self.registries.metadata.metadata(entity)?;
            let links = self.registries.metadata.meta_links(entity, tenant)?;
            let handler = self.handler();

            let outcome = self.store.run_transaction(|tx| {
                let live_links = live_meta_links(tx, &links)?;
                let plan = match handler {
                    Some(handler) => handler.prepare_set(entity, tenant, tx)?,
                    None => CascadePlan::default(),
                };

                tx.set(&path, data.clone())?;
                let meta_links = match &meta {
                    Some(meta) => write_meta_links(tx, &live_links, &FieldOp::Set(meta.clone()))?,
                    None => 0,
                };
                let parents = plan.apply(tx)?;

                Ok(WriteOutcome {
                    meta_links,
                    skipped_links: links.len() - live_links.len(),
                    parents,
                })
            })?;

            span.set_docs(1);
            Self::record_outcome(outcome);
            debug!(
                entity = E::TYPE.name,
                id = entity.id(),
                tenant = %tenant,
                meta_links = outcome.meta_links,
                skipped_links = outcome.skipped_links,
                parents = outcome.parents,
                "entity saved"
            );

            Ok(())
        })
    }

    /// Overwrite the entity's own document only, skipping every projection.
    ///
    /// A missing document is left missing.
    pub fn update(&self, entity: &E, tenant: &TenantId) -> Result<(), InternalError> {
        self.with_metrics(|| {
            let mut span = Span::<E>::new(ExecKind::Update);
            let path = Self::doc_path(tenant, entity.id());
            let data = to_document(entity)?;

            let written = self.store.run_transaction(|tx| {
                if tx.get(&path)?.is_none() {
                    return Ok(false);
                }
                tx.set(&path, data.clone())?;

                Ok(true)
            })?;

            if written {
                span.set_docs(1);
            } else {
                debug!(entity = E::TYPE.name, id = entity.id(), "update of missing entity skipped");
            }

            Ok(())
        })
    }

    /// Delete the entity and strip its projection from everywhere it lives.
    ///
    /// Deleting a missing id is a point read and nothing else.
    pub fn delete(&self, tenant: &TenantId, id: &str) -> Result<(), InternalError> {
        self.with_metrics(|| {
            let mut span = Span::<E>::new(ExecKind::Delete);
            let path = Self::doc_path(tenant, id);
            if self.store.get(&path)?.is_none() {
                debug!(entity = E::TYPE.name, id, "delete of missing entity skipped");
                return Ok(());
            }
            let handler = self.handler();

            let outcome = self.store.run_transaction(|tx| {
                // Meta-links are derived from the stored state, not the caller's copy.
                let Some(snapshot) = tx.get(&path)? else {
                    return Ok(None);
                };
                let entity: E = from_document(snapshot.data)?;
                let links = self.registries.metadata.meta_links(&entity, tenant)?;
                let live_links = live_meta_links(tx, &links)?;
                let plan = match handler {
                    Some(handler) => handler.prepare_delete(&entity, tenant, tx)?,
                    None => CascadePlan::default(),
                };

                tx.delete(&path)?;
                let meta_links = write_meta_links(tx, &live_links, &FieldOp::Delete)?;
                let parents = plan.apply(tx)?;

                Ok(Some(WriteOutcome {
                    meta_links,
                    skipped_links: links.len() - live_links.len(),
                    parents,
                }))
            })?;

            let Some(outcome) = outcome else {
                debug!(entity = E::TYPE.name, id, "entity vanished before delete");
                return Ok(());
            };

            span.set_docs(1);
            Self::record_outcome(outcome);
            debug!(
                entity = E::TYPE.name,
                id,
                tenant = %tenant,
                meta_links = outcome.meta_links,
                skipped_links = outcome.skipped_links,
                parents = outcome.parents,
                "entity deleted"
            );

            Ok(())
        })
    }

    fn record_outcome(outcome: WriteOutcome) {
        if outcome.meta_links > 0 {
            record(MetricsEvent::MetaLinkWrites {
                entity_path: E::TYPE.name,
                writes: outcome.meta_links as u64,
            });
        }
        if outcome.skipped_links > 0 {
            record(MetricsEvent::MetaLinkSkips {
                entity_path: E::TYPE.name,
                skipped: outcome.skipped_links as u64,
            });
        }
        if outcome.parents > 0 {
            record(MetricsEvent::CascadeFanout {
                entity_path: E::TYPE.name,
                parents: outcome.parents as u64,
            });
        }
    }
}

// Meta-links whose target document exists. A missing target is skipped:
// there is nothing to keep in sync and a partial update would abort the
// whole transaction.
fn live_meta_links<'l>(
    tx: &mut dyn Transaction,
    links: &'l [MetaLink],
) -> Result<Vec<&'l MetaLink>, InternalError> {
    let mut live = Vec::with_capacity(links.len());

    for link in links {
        if tx.get(&link.doc)?.is_some() {
            live.push(link);
        } else {
            warn!(doc = %link.doc, field = %link.field, "meta-link target missing, skipped");
        }
    }

    Ok(live)
}

fn write_meta_links(
    tx: &mut dyn Transaction,
    links: &[&MetaLink],
    op: &FieldOp,
) -> Result<usize, InternalError> {
    for link in links {
        tx.update(&link.doc, UpdateOps::from([(link.field.clone(), op.clone())]))?;
    }

    Ok(links.len())
}
