use crate::entity::Audit;
use menudb_core::traits::{EntityKind, EntityType};
use serde::{Deserialize, Serialize};

pub static ORDER: EntityType = EntityType::root("Order", "orders");

///
/// Order
///
/// Nothing embeds an order, so it has no projection and no cascade.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub location_id: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub line_items: Vec<LineItem>,

    #[serde(flatten)]
    pub audit: Audit,
}

impl Order {
    pub fn new(id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location_id: location_id.into(),
            ..Self::default()
        }
    }

    /// Sum of line totals in minor currency units.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.line_items.iter().map(LineItem::total).sum()
    }
}

impl EntityKind for Order {
    const TYPE: &'static EntityType = &ORDER;

    fn id(&self) -> &str {
        &self.id
    }
}

///
/// OrderStatus
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    #[default]
    Open,
    Submitted,
    Completed,
    Cancelled,
}

///
/// LineItem
///
/// Snapshot of a product at order time; never refreshed by cascades.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
}

impl LineItem {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

///
/// TESTS
///
