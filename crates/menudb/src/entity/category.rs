use crate::entity::{Audit, MenuGroup, ProductMeta, collection};
use menudb_core::{
    db::{CascadeHandler, CascadeSpec, CollectionPath, FieldPath, Predicate, ProjectionRule},
    traits::{EntityKind, EntityType},
    types::TenantId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub static CATEGORY: EntityType = EntityType::root("Category", "categories");

///
/// Category
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub is_active: bool,

    #[serde(default)]
    pub product_display_order: Vec<String>,
    #[serde(default)]
    pub products: BTreeMap<String, ProductMeta>,

    #[serde(flatten)]
    pub audit: Audit,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_active: true,
            ..Self::default()
        }
    }

    /// List `product_id` in display order. Its projection arrives with the
    /// product's next save.
    #[must_use]
    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_display_order.push(product_id.into());
        self
    }

    #[must_use]
    pub fn meta(&self) -> CategoryMeta {
        CategoryMeta {
            name: self.name.clone(),
            is_active: self.is_active,
        }
    }
}

impl EntityKind for Category {
    const TYPE: &'static EntityType = &CATEGORY;

    fn id(&self) -> &str {
        &self.id
    }
}

///
/// CategoryMeta
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMeta {
    pub name: String,
    pub is_active: bool,
}

pub const CATEGORY_IN_MENU_GROUP: CascadeSpec =
    CascadeSpec::new("categories").with_array_removal_fields(&["categoryDisplayOrder"]);

#[must_use]
pub const fn rule() -> ProjectionRule<Category, CategoryMeta> {
    ProjectionRule::new(Category::meta)
}

#[must_use]
pub const fn handler() -> CascadeHandler<Category, CategoryMeta> {
    CascadeHandler::new(
        CATEGORY_IN_MENU_GROUP,
        menu_groups,
        listed_in_menu_group,
        Category::meta,
    )
}

fn menu_groups(tenant: &TenantId) -> CollectionPath {
    collection::<MenuGroup>(tenant)
}

fn listed_in_menu_group(category: &Category) -> Predicate {
    Predicate::array_contains(FieldPath::new(["categoryDisplayOrder"]), category.id.clone())
}
