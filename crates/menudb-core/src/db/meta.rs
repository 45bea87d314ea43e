use crate::{
    db::{
        path::{DocPath, FieldPath},
        registry::{RegistryError, resolve_in_lineage},
    },
    error::InternalError,
    serialize::to_value,
    traits::{EntityKind, EntityRef, EntityType},
    types::TenantId,
};
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, marker::PhantomData, sync::Arc};

///
/// MetaLink
///
/// A declared location (document + field) that must always hold the
/// entity's current projection.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetaLink {
    pub doc: DocPath,
    pub field: FieldPath,
}

impl MetaLink {
    #[must_use]
    pub const fn new(doc: DocPath, field: FieldPath) -> Self {
        Self { doc, field }
    }
}

///
/// MetaRule
///
/// Projection rule for one entity type. `metadata` recomputes the whole
/// projection from the entity; it is never patched from a diff.
///

pub trait MetaRule<T: EntityKind>: Send + Sync + 'static {
    type Meta: Serialize;

    fn metadata(&self, entity: &T) -> Self::Meta;

    /// Static locations of this entity's projection. Relationships found by
    /// querying belong to a relationship handler instead.
    fn meta_links(&self, _entity: &T, _tenant: &TenantId) -> Vec<MetaLink> {
        Vec::new()
    }
}

///
/// ProjectionRule
///
/// Function-pointer `MetaRule`, the usual way wiring code declares one.
///

pub struct ProjectionRule<T, M> {
    project: fn(&T) -> M,
    links: fn(&T, &TenantId) -> Vec<MetaLink>,
}

impl<T, M> ProjectionRule<T, M> {
    #[must_use]
    pub const fn new(project: fn(&T) -> M) -> Self {
        Self {
            project,
            links: no_links::<T>,
        }
    }

    #[must_use]
    pub const fn with_links(mut self, links: fn(&T, &TenantId) -> Vec<MetaLink>) -> Self {
        self.links = links;
        self
    }
}

fn no_links<T>(_: &T, _: &TenantId) -> Vec<MetaLink> {
    Vec::new()
}

impl<T, M> MetaRule<T> for ProjectionRule<T, M>
where
    T: EntityKind,
    M: Serialize + 'static,
{
    type Meta = M;

    fn metadata(&self, entity: &T) -> M {
        (self.project)(entity)
    }

    fn meta_links(&self, entity: &T, tenant: &TenantId) -> Vec<MetaLink> {
        (self.links)(entity, tenant)
    }
}

///
/// ErasedMetaRule
///
/// Type-erased `MetaRule` as stored in the registry.
///

pub trait ErasedMetaRule: Send + Sync {
    /// Type the rule was registered for.
    fn target(&self) -> &'static EntityType;

    fn metadata(&self, entity: &dyn EntityRef) -> Result<Value, InternalError>;

    fn meta_links(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
    ) -> Result<Vec<MetaLink>, InternalError>;
}

struct TypedMetaRule<T, R> {
    rule: R,
    _marker: PhantomData<fn(&T)>,
}

impl<T, R> TypedMetaRule<T, R>
where
    T: EntityKind,
{
    fn view<'a>(&self, entity: &'a dyn EntityRef) -> Result<&'a T, InternalError> {
        entity.view::<T>().ok_or_else(|| {
            RegistryError::TypeMismatch {
                registered: T::TYPE.name,
                entity: entity.entity_type().name,
            }
            .into()
        })
    }
}

impl<T, R> ErasedMetaRule for TypedMetaRule<T, R>
where
    T: EntityKind,
    R: MetaRule<T>,
{
    fn target(&self) -> &'static EntityType {
        T::TYPE
    }

    fn metadata(&self, entity: &dyn EntityRef) -> Result<Value, InternalError> {
        let entity = self.view(entity)?;

        Ok(to_value(&self.rule.metadata(entity))?)
    }

    fn meta_links(
        &self,
        entity: &dyn EntityRef,
        tenant: &TenantId,
    ) -> Result<Vec<MetaLink>, InternalError> {
        let entity = self.view(entity)?;

        Ok(self.rule.meta_links(entity, tenant))
    }
}

///
/// MetadataRegistry
///
/// Entity type to projection rule, resolved through the type's lineage.
/// Lookups are total: an unregistered type simply has no projection.
///

#[derive(Default)]
pub struct MetadataRegistry {
    rules: HashMap<&'static str, Arc<dyn ErasedMetaRule>>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the projection rule for `T`.
    pub fn register<T, R>(&mut self, rule: R) -> Result<(), InternalError>
    where
        T: EntityKind,
        R: MetaRule<T>,
    {
        if self.rules.contains_key(T::TYPE.name) {
            return Err(RegistryError::AlreadyRegistered {
                registry: "metadata rule",
                entity: T::TYPE.name,
            }
            .into());
        }

        self.rules.insert(
            T::TYPE.name,
            Arc::new(TypedMetaRule {
                rule,
                _marker: PhantomData,
            }),
        );
        Ok(())
    }

    /// Resolve the rule for `ty` or its nearest registered ancestor.
    #[must_use]
    pub fn resolve(&self, ty: &'static EntityType) -> Option<&dyn ErasedMetaRule> {
        resolve_in_lineage(&self.rules, ty).map(|(_, rule)| rule.as_ref())
    }

    /// Projection of `entity`, or `None` when its lineage has no rule.
    pub fn metadata<E: EntityKind>(&self, entity: &E) -> Result<Option<Value>, InternalError> {
        self.resolve(E::TYPE)
            .map(|rule| rule.metadata(entity))
            .transpose()
    }

    /// Declared meta-links of `entity`; empty when its lineage has no rule.
    pub fn meta_links<E: EntityKind>(
        &self,
        entity: &E,
        tenant: &TenantId,
    ) -> Result<Vec<MetaLink>, InternalError> {
        match self.resolve(E::TYPE) {
            Some(rule) => rule.meta_links(entity, tenant),
            None => Ok(Vec::new()),
        }
    }

    /// True when a rule is registered for exactly this type.
    #[must_use]
    pub fn contains(&self, ty: &EntityType) -> bool {
        self.rules.contains_key(ty.name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }
}

///
/// TESTS
///
