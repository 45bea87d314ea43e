use crate::entity::{Audit, Location, MenuGroupMeta, collection};
use menudb_core::{
    db::{CascadeHandler, CascadeSpec, CollectionPath, FieldPath, Predicate, ProjectionRule},
    traits::{EntityKind, EntityType},
    types::TenantId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub static MENU: EntityType = EntityType::root("Menu", "menus");

///
/// Menu
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: String,
    pub name: String,
    pub is_active: bool,

    #[serde(default)]
    pub menu_group_display_order: Vec<String>,
    #[serde(default)]
    pub menu_groups: BTreeMap<String, MenuGroupMeta>,

    #[serde(flatten)]
    pub audit: Audit,
}

impl Menu {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_active: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_menu_group(mut self, menu_group_id: impl Into<String>) -> Self {
        self.menu_group_display_order.push(menu_group_id.into());
        self
    }

    #[must_use]
    pub fn meta(&self) -> MenuMeta {
        MenuMeta {
            name: self.name.clone(),
            is_active: self.is_active,
        }
    }
}

impl EntityKind for Menu {
    const TYPE: &'static EntityType = &MENU;

    fn id(&self) -> &str {
        &self.id
    }
}

///
/// MenuMeta
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuMeta {
    pub name: String,
    pub is_active: bool,
}

/// Locations carry their menus only as a map, so a location references a
/// menu exactly when `menus.<id>.name` holds a non-empty string.
pub const MENU_IN_LOCATION: CascadeSpec = CascadeSpec::new("menus");

#[must_use]
pub const fn rule() -> ProjectionRule<Menu, MenuMeta> {
    ProjectionRule::new(Menu::meta)
}

#[must_use]
pub const fn handler() -> CascadeHandler<Menu, MenuMeta> {
    CascadeHandler::new(MENU_IN_LOCATION, locations, served_at_location, Menu::meta)
}

fn locations(tenant: &TenantId) -> CollectionPath {
    collection::<Location>(tenant)
}

fn served_at_location(menu: &Menu) -> Predicate {
    Predicate::non_empty_string(FieldPath::new(["menus", menu.id.as_str(), "name"]))
}
