use serde::{Serialize, de::DeserializeOwned};
use std::{any::Any, fmt};

// ============================================================================
// ENTITY LINEAGE
// ============================================================================
//
// Entities form a static single-parent lineage. Registries resolve rules by
// walking it most-derived first, so a rule registered for an ancestor covers
// every descendant that has no rule of its own.
//

///
/// EntityType
///
/// Static lineage node for one entity type.
///

pub struct EntityType {
    pub name: &'static str,
    pub collection: &'static str,
    pub parent: Option<&'static Self>,
}

impl EntityType {
    /// Declare a type with no ancestor.
    #[must_use]
    pub const fn root(name: &'static str, collection: &'static str) -> Self {
        Self {
            name,
            collection,
            parent: None,
        }
    }

    /// Declare a type that specialises `parent`.
    #[must_use]
    pub const fn child(
        name: &'static str,
        collection: &'static str,
        parent: &'static Self,
    ) -> Self {
        Self {
            name,
            collection,
            parent: Some(parent),
        }
    }

    /// Iterate this type and its ancestors, most-derived first.
    pub fn lineage(&'static self) -> impl Iterator<Item = &'static Self> {
        std::iter::successors(Some(self), |ty| ty.parent)
    }

    /// True when `other` is this type or one of its ancestors.
    #[must_use]
    pub fn is_a(&'static self, other: &Self) -> bool {
        self.lineage().any(|ty| ty == other)
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntityType {}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("collection", &self.collection)
            .field("parent", &self.parent.map(|parent| parent.name))
            .finish()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ============================================================================
// ENTITY CONTRACTS
// ============================================================================

///
/// EntityKind
///
/// A persisted aggregate stored as one document in its type's collection.
///
/// `ancestor` hands out the value that represents this entity as one of
/// its ancestor types. The default covers the entity's own type; types that
/// embed their parent's struct override it to expose that embedded value.
///

pub trait EntityKind: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TYPE: &'static EntityType;

    fn id(&self) -> &str;

    fn ancestor(&self, ty: &EntityType) -> Option<&dyn Any> {
        (ty == Self::TYPE).then_some(self as &dyn Any)
    }
}

///
/// EntityRef
///
/// Object-safe view of an entity used by registries and handlers, which
/// store rules for many types side by side.
///

pub trait EntityRef {
    fn entity_type(&self) -> &'static EntityType;

    fn entity_id(&self) -> &str;

    fn ancestor_any(&self, ty: &EntityType) -> Option<&dyn Any>;
}

impl<E> EntityRef for E
where
    E: EntityKind,
{
    fn entity_type(&self) -> &'static EntityType {
        E::TYPE
    }

    fn entity_id(&self) -> &str {
        self.id()
    }

    fn ancestor_any(&self, ty: &EntityType) -> Option<&dyn Any> {
        self.ancestor(ty)
    }
}

impl dyn EntityRef + '_ {
    /// Borrow the entity as `T`, which must be its own type or an ancestor.
    #[must_use]
    pub fn view<T: EntityKind>(&self) -> Option<&T> {
        self.ancestor_any(T::TYPE)?.downcast_ref::<T>()
    }
}

///
/// TESTS
///
