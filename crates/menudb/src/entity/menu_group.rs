use crate::entity::{Audit, CategoryMeta, Menu, collection};
use menudb_core::{
    db::{CascadeHandler, CascadeSpec, CollectionPath, FieldPath, Predicate, ProjectionRule},
    traits::{EntityKind, EntityType},
    types::TenantId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub static MENU_GROUP: EntityType = EntityType::root("MenuGroup", "menuGroups");

///
/// MenuGroup
///
/// A section of a menu ("Lunch", "Drinks").
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuGroup {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub category_display_order: Vec<String>,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryMeta>,

    #[serde(flatten)]
    pub audit: Audit,
}

impl MenuGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_display_order.push(category_id.into());
        self
    }

    #[must_use]
    pub fn meta(&self) -> MenuGroupMeta {
        MenuGroupMeta {
            name: self.name.clone(),
        }
    }
}

impl EntityKind for MenuGroup {
    const TYPE: &'static EntityType = &MENU_GROUP;

    fn id(&self) -> &str {
        &self.id
    }
}

///
/// MenuGroupMeta
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuGroupMeta {
    pub name: String,
}

pub const MENU_GROUP_IN_MENU: CascadeSpec =
    CascadeSpec::new("menuGroups").with_array_removal_fields(&["menuGroupDisplayOrder"]);

#[must_use]
pub const fn rule() -> ProjectionRule<MenuGroup, MenuGroupMeta> {
    ProjectionRule::new(MenuGroup::meta)
}

#[must_use]
pub const fn handler() -> CascadeHandler<MenuGroup, MenuGroupMeta> {
    CascadeHandler::new(MENU_GROUP_IN_MENU, menus, listed_in_menu, MenuGroup::meta)
}

fn menus(tenant: &TenantId) -> CollectionPath {
    collection::<Menu>(tenant)
}

fn listed_in_menu(menu_group: &MenuGroup) -> Predicate {
    Predicate::array_contains(FieldPath::new(["menuGroupDisplayOrder"]), menu_group.id.clone())
}
