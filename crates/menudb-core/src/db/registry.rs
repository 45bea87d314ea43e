use crate::{
    db::{meta::MetadataRegistry, relation::RelationshipHandlerRegistry},
    error::InternalError,
    traits::EntityType,
};
use std::collections::HashMap;
use thiserror::Error as ThisError;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("a {registry} is already registered for entity type '{entity}'")]
    AlreadyRegistered {
        registry: &'static str,
        entity: &'static str,
    },

    #[error("rule registered for '{registered}' cannot view entity of type '{entity}'")]
    TypeMismatch {
        registered: &'static str,
        entity: &'static str,
    },
}

impl From<RegistryError> for InternalError {
    fn from(err: RegistryError) -> Self {
        Self::registry_invariant(err.to_string())
    }
}

///
/// Registries
///
/// Every rule and handler the repositories consult, assembled once at
/// process start and then shared read-only.
///

#[derive(Default)]
pub struct Registries {
    pub metadata: MetadataRegistry,
    pub handlers: RelationshipHandlerRegistry,
}

impl Registries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every registration (test isolation).
    pub fn clear(&mut self) {
        self.metadata.clear();
        self.handlers.clear();
    }
}

/// Resolve the entry for `ty` or its nearest registered ancestor.
pub(crate) fn resolve_in_lineage<'a, V>(
    entries: &'a HashMap<&'static str, V>,
    ty: &'static EntityType,
) -> Option<(&'static EntityType, &'a V)> {
    ty.lineage()
        .find_map(|candidate| entries.get(candidate.name).map(|entry| (candidate, entry)))
}
