use crate::entity::{Audit, Category, OptionSetMeta, collection};
use menudb_core::{
    db::{CascadeHandler, CascadeSpec, CollectionPath, FieldPath, Predicate, ProjectionRule},
    traits::{EntityKind, EntityType},
    types::TenantId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub static PRODUCT: EntityType = EntityType::root("Product", "products");

///
/// Product
///
/// A sellable item. Prices are in minor currency units.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    pub is_active: bool,

    #[serde(default)]
    pub option_set_display_order: Vec<String>,
    #[serde(default)]
    pub option_sets: BTreeMap<String, OptionSetMeta>,
    #[serde(default)]
    pub option_set_selections: BTreeMap<String, OptionSetSelection>,

    #[serde(flatten)]
    pub audit: Audit,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            is_active: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn meta(&self) -> ProductMeta {
        ProductMeta {
            name: self.name.clone(),
            is_active: self.is_active,
            price: self.price,
            image_url: self.image_url.clone(),
        }
    }
}

impl EntityKind for Product {
    const TYPE: &'static EntityType = &PRODUCT;

    fn id(&self) -> &str {
        &self.id
    }
}

///
/// OptionSetSelection
///
/// Per-product override of an option set's selection bounds.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSetSelection {
    pub min_selection: Option<u32>,
    pub max_selection: Option<u32>,
}

///
/// ProductMeta
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMeta {
    pub name: String,
    pub is_active: bool,
    pub price: i64,
    pub image_url: Option<String>,
}

/// Categories list their products in `productDisplayOrder`.
pub const PRODUCT_IN_CATEGORY: CascadeSpec =
    CascadeSpec::new("products").with_array_removal_fields(&["productDisplayOrder"]);

#[must_use]
pub const fn rule() -> ProjectionRule<Product, ProductMeta> {
    ProjectionRule::new(Product::meta)
}

#[must_use]
pub const fn handler() -> CascadeHandler<Product, ProductMeta> {
    CascadeHandler::new(
        PRODUCT_IN_CATEGORY,
        categories,
        listed_in_category,
        Product::meta,
    )
}

fn categories(tenant: &TenantId) -> CollectionPath {
    collection::<Category>(tenant)
}

fn listed_in_category(product: &Product) -> Predicate {
    Predicate::array_contains(FieldPath::new(["productDisplayOrder"]), product.id.clone())
}
