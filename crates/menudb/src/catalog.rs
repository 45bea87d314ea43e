use crate::{
    entity::{
        CATEGORY, Category, LOCATION, Location, MENU, MENU_GROUP, Menu, MenuGroup, MenuOption,
        OPTION, OPTION_SET, OptionSet, PRODUCT, Product, category, location, menu, menu_group,
        option, option_set, product,
    },
    error::Error,
};
use menudb_core::{
    db::{DocumentStore, Registries, RelationshipHandler, Repository},
    error::InternalError,
    traits::EntityKind,
    types::TenantId,
};
use std::sync::Arc;
use tracing::info;

/// Build every projection rule and cascade handler for the catalog.
///
/// Called once at process start; the result is shared read-only.
pub fn registries() -> Result<Registries, Error> {
    let mut registries = Registries::new();
    register_all(&mut registries)?;

    info!(
        rules = registries.metadata.len(),
        handlers = registries.handlers.len(),
        "catalog registries built"
    );

    Ok(registries)
}

fn register_all(registries: &mut Registries) -> Result<(), InternalError> {
    let metadata = &mut registries.metadata;
    metadata.register::<Product, _>(product::rule())?;
    metadata.register::<MenuOption, _>(option::rule())?;
    metadata.register::<OptionSet, _>(option_set::rule())?;
    metadata.register::<Category, _>(category::rule())?;
    metadata.register::<MenuGroup, _>(menu_group::rule())?;
    metadata.register::<Menu, _>(menu::rule())?;
    metadata.register::<Location, _>(location::rule())?;

    let handlers = &mut registries.handlers;
    handlers.register(&PRODUCT, Arc::new(product::handler()));
    handlers.register(&OPTION, Arc::new(option::handler()));
    handlers.register(&OPTION_SET, Arc::new(option_set::handler()));
    handlers.register(&CATEGORY, Arc::new(category::handler()));
    handlers.register(&MENU_GROUP, Arc::new(menu_group::handler()));
    handlers.register(&MENU, Arc::new(menu::handler()));

    // locations are linked statically, never by query
    debug_assert!(!handlers.contains(&LOCATION));

    Ok(())
}

///
/// Catalog
///
/// A store plus the catalog registries: the entry point callers use to
/// get a repository for one entity type.
///

pub struct Catalog<S> {
    store: S,
    registries: Registries,
}

impl<S: DocumentStore> Catalog<S> {
    pub fn new(store: S) -> Result<Self, Error> {
        Ok(Self {
            store,
            registries: registries()?,
        })
    }

    /// Use caller-built registries instead of the catalog wiring.
    pub const fn with_registries(store: S, registries: Registries) -> Self {
        Self { store, registries }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn registries(&self) -> &Registries {
        &self.registries
    }

    #[must_use]
    pub const fn repo<E: EntityKind>(&self) -> CatalogRepo<'_, E, S> {
        CatalogRepo {
            inner: Repository::new(&self.store, &self.registries),
        }
    }
}

///
/// CatalogRepo
///
/// Repository for one entity type, reporting the public error type.
///

pub struct CatalogRepo<'a, E, S> {
    inner: Repository<'a, E, S>,
}

impl<E, S> CatalogRepo<'_, E, S>
where
    E: EntityKind,
    S: DocumentStore,
{
    /// Bypass the registry and cascade through `handler` instead.
    #[must_use]
    pub fn with_handler(self, handler: Arc<dyn RelationshipHandler>) -> Self {
        Self {
            inner: self.inner.with_handler(handler),
        }
    }

    pub fn get(&self, tenant: &TenantId, id: &str) -> Result<Option<E>, Error> {
        self.inner.get(tenant, id).map_err(Error::from)
    }

    pub fn exists(&self, tenant: &TenantId, id: &str) -> Result<bool, Error> {
        self.inner.exists(tenant, id).map_err(Error::from)
    }

    pub fn list(&self, tenant: &TenantId) -> Result<Vec<E>, Error> {
        self.inner.list(tenant).map_err(Error::from)
    }

    pub fn find_by_external_reference(
        &self,
        tenant: &TenantId,
        external_id: &str,
        provider: &str,
    ) -> Result<Option<E>, Error> {
        self.inner
            .find_by_external_reference(tenant, external_id, provider)
            .map_err(Error::from)
    }

    pub fn set(&self, entity: &E, tenant: &TenantId) -> Result<(), Error> {
        self.inner.set(entity, tenant).map_err(Error::from)
    }

    pub fn update(&self, entity: &E, tenant: &TenantId) -> Result<(), Error> {
        self.inner.update(entity, tenant).map_err(Error::from)
    }

    pub fn delete(&self, tenant: &TenantId, id: &str) -> Result<(), Error> {
        self.inner.delete(tenant, id).map_err(Error::from)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ORDER;
    use menudb_core::db::MemoryStore;

    #[test]
    fn registries_cover_the_catalog() {
        let registries = registries().expect("catalog wiring should succeed");

        for ty in [&PRODUCT, &OPTION, &OPTION_SET, &CATEGORY, &MENU_GROUP, &MENU, &LOCATION] {
            assert!(registries.metadata.contains(ty), "{ty} should have a rule");
        }
        for ty in [&PRODUCT, &OPTION, &OPTION_SET, &CATEGORY, &MENU_GROUP, &MENU] {
            assert!(registries.handlers.contains(ty), "{ty} should have a handler");
        }

        assert!(registries.metadata.resolve(&ORDER).is_none());
        assert!(registries.handlers.resolve(&ORDER).is_none());
        assert!(registries.handlers.resolve(&LOCATION).is_none());
    }

    #[test]
    fn option_uses_its_own_rule_over_product() {
        let registries = registries().expect("catalog wiring should succeed");

        let rule = registries
            .metadata
            .resolve(&OPTION)
            .expect("option should resolve a rule");
        assert_eq!(rule.target(), &OPTION);
    }

    #[test]
    fn registering_twice_fails() {
        let mut registries = registries().expect("catalog wiring should succeed");

        let err = register_all(&mut registries).expect_err("duplicate rules should be rejected");
        assert_eq!(Error::from(err).origin, crate::error::ErrorOrigin::Registry);
    }

    #[test]
    fn empty_registries_save_without_cascading() {
        let catalog = Catalog::with_registries(MemoryStore::default(), Registries::new());
        let tenant = TenantId::from("biz-1");

        catalog
            .repo::<Category>()
            .set(&Category::new("c1", "Mains").with_product("p1"), &tenant)
            .expect("category save should succeed");
        catalog
            .repo::<Product>()
            .set(&Product::new("p1", "Burger", 1200), &tenant)
            .expect("product save should succeed");

        let category = catalog
            .repo::<Category>()
            .get(&tenant, "c1")
            .expect("category load should succeed")
            .expect("category should exist");
        assert!(category.products.is_empty());
        assert!(catalog.registries().metadata.is_empty());
    }
}
