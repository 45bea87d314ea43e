use crate::entity::{Audit, Menu, MenuMeta};
use menudb_core::{
    db::{DocPath, FieldPath, MetaLink, ProjectionRule},
    traits::{EntityKind, EntityType},
    types::TenantId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub static LOCATION: EntityType = EntityType::root("Location", "locations");

/// Field on the tenant root document listing every location.
pub const TENANT_LOCATIONS_FIELD: &str = "locations";

///
/// Location
///
/// A physical store. Its menus are embedded by projection; adding an entry
/// to `menus` is what links a menu to the location.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub timezone: String,

    #[serde(default)]
    pub menus: BTreeMap<String, MenuMeta>,

    #[serde(flatten)]
    pub audit: Audit,
}

impl Location {
    pub fn new(id: impl Into<String>, name: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_active: true,
            timezone: timezone.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_menu(mut self, menu: &Menu) -> Self {
        self.menus.insert(menu.id.clone(), menu.meta());
        self
    }

    #[must_use]
    pub fn meta(&self) -> LocationMeta {
        LocationMeta {
            name: self.name.clone(),
            is_active: self.is_active,
            timezone: self.timezone.clone(),
        }
    }
}

impl EntityKind for Location {
    const TYPE: &'static EntityType = &LOCATION;

    fn id(&self) -> &str {
        &self.id
    }
}

///
/// LocationMeta
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMeta {
    pub name: String,
    pub is_active: bool,
    pub timezone: String,
}

/// Locations are not discoverable by query; the tenant root lists each one
/// under `locations.<id>`.
#[must_use]
pub const fn rule() -> ProjectionRule<Location, LocationMeta> {
    ProjectionRule::new(Location::meta).with_links(tenant_root_link)
}

fn tenant_root_link(location: &Location, tenant: &TenantId) -> Vec<MetaLink> {
    vec![MetaLink::new(
        DocPath::tenant_root(tenant),
        FieldPath::keyed(TENANT_LOCATIONS_FIELD, &location.id),
    )]
}
