//! Relationship handlers.
//!
//! A handler finds the parents that embed an entity's projection and builds
//! the updates that keep them current. Handlers work in two phases: prepare
//! (reads only, producing a `CascadePlan`) and apply (writes only), so the
//! repository can finish every transactional read before its first write.

mod builder;
mod cascade;

pub use builder::{CascadeSpec, build_deleted_updates, build_saved_updates};
pub use cascade::CascadeHandler;

use crate::{
    db::{
        path::CollectionPath,
        registry::resolve_in_lineage,
        store::Transaction,
        update::ParentUpdate,
    },
    error::InternalError,
    traits::{EntityRef, EntityType},
    types::TenantId,
};
use std::{collections::HashMap, sync::Arc};

///
/// RelationshipHandler
///

pub trait RelationshipHandler: Send + Sync {
    /// Discover parents and build the updates owed after a save.
    fn prepare_set(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
        tx: &mut dyn Transaction,
    ) -> Result<CascadePlan, InternalError>;

    /// Discover parents and build the updates owed after a delete.
    fn prepare_delete(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
        tx: &mut dyn Transaction,
    ) -> Result<CascadePlan, InternalError>;

    fn on_set(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
        tx: &mut dyn Transaction,
    ) -> Result<usize, InternalError> {
        self.prepare_set(entity, tenant, tx)?.apply(tx)
    }

    fn on_delete(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
        tx: &mut dyn Transaction,
    ) -> Result<usize, InternalError> {
        self.prepare_delete(entity, tenant, tx)?.apply(tx)
    }
}

///
/// CascadeStep
///
/// Parent updates that all target one collection.
///

#[derive(Clone, Debug, PartialEq)]
pub struct CascadeStep {
    pub collection: CollectionPath,
    pub updates: Vec<ParentUpdate>,
}

///
/// CascadePlan
///
/// Writes a handler prepared but has not issued yet.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CascadePlan {
    pub steps: Vec<CascadeStep>,
}

impl CascadePlan {
    #[must_use]
    pub fn new(collection: CollectionPath, updates: Vec<ParentUpdate>) -> Self {
        if updates.is_empty() {
            return Self::default();
        }

        Self {
            steps: vec![CascadeStep {
                collection,
                updates,
            }],
        }
    }

    /// Append another plan's steps after this one's.
    pub fn merge(&mut self, other: Self) {
        self.steps.extend(other.steps);
    }

    /// Number of parent updates in the plan.
    #[must_use]
    pub fn parents(&self) -> usize {
        self.steps.iter().map(|step| step.updates.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(|step| step.updates.is_empty())
    }

    /// Issue every non-empty update; returns the parent documents written.
    pub fn apply(&self, tx: &mut dyn Transaction) -> Result<usize, InternalError> {
        let mut written = 0;

        for step in &self.steps {
            for parent in &step.updates {
                if parent.update.is_empty() {
                    continue;
                }
                tx.update(&step.collection.doc(&parent.parent_id), parent.update.to_ops())?;
                written += 1;
            }
        }

        Ok(written)
    }
}

///
/// HandlerSet
///
/// Several handlers for one entity type, run in registration order.
/// Every handler prepares before any plan is applied.
///

#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: Vec<Arc<dyn RelationshipHandler>>,
}

impl HandlerSet {
    pub fn push(&mut self, handler: Arc<dyn RelationshipHandler>) {
        self.handlers.push(handler);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl RelationshipHandler for HandlerSet {
    fn prepare_set(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
        tx: &mut dyn Transaction,
    ) -> Result<CascadePlan, InternalError> {
        let mut plan = CascadePlan::default();
        for handler in &self.handlers {
            plan.merge(handler.prepare_set(entity, tenant, tx)?);
        }

        Ok(plan)
    }

    fn prepare_delete(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
        tx: &mut dyn Transaction,
    ) -> Result<CascadePlan, InternalError> {
        let mut plan = CascadePlan::default();
        for handler in &self.handlers {
            plan.merge(handler.prepare_delete(entity, tenant, tx)?);
        }

        Ok(plan)
    }
}

///
/// RelationshipHandlerRegistry
///
/// Entity type to handler, resolved through the type's lineage like the
/// metadata registry. A second registration for a type composes with the
/// first instead of replacing it.
///

#[derive(Default)]
pub struct RelationshipHandlerRegistry {
    handlers: HashMap<&'static str, HandlerSet>,
}

impl RelationshipHandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, ty: &'static EntityType, handler: Arc<dyn RelationshipHandler>) {
        self.handlers.entry(ty.name).or_default().push(handler);
    }

    /// Handlers for `ty` or its nearest registered ancestor.
    #[must_use]
    pub fn resolve(&self, ty: &'static EntityType) -> Option<&dyn RelationshipHandler> {
        resolve_in_lineage(&self.handlers, ty).map(|(_, set)| set as &dyn RelationshipHandler)
    }

    /// True when a handler is registered for exactly this type.
    #[must_use]
    pub fn contains(&self, ty: &EntityType) -> bool {
        self.handlers.contains_key(ty.name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

///
/// TESTS
///
