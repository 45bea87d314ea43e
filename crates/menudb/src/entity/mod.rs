//! Catalog entities, their projections, and how each one is embedded in
//! the documents that reference it.

pub mod category;
pub mod common;
pub mod location;
pub mod menu;
pub mod menu_group;
pub mod option;
pub mod option_set;
pub mod order;
pub mod product;

pub use category::{CATEGORY, Category, CategoryMeta};
pub use common::{Audit, LinkedObject, LinkedObjects};
pub use location::{LOCATION, Location, LocationMeta, TENANT_LOCATIONS_FIELD};
pub use menu::{MENU, Menu, MenuMeta};
pub use menu_group::{MENU_GROUP, MenuGroup, MenuGroupMeta};
pub use option::{MenuOption, OPTION, OptionMeta};
pub use option_set::{OPTION_SET, OptionSet, OptionSetMeta};
pub use order::{LineItem, ORDER, Order, OrderStatus};
pub use product::{OptionSetSelection, PRODUCT, Product, ProductMeta};

use menudb_core::{db::CollectionPath, traits::EntityKind, types::TenantId};

/// Collection holding `E` documents for `tenant`.
#[must_use]
pub fn collection<E: EntityKind>(tenant: &TenantId) -> CollectionPath {
    CollectionPath::tenant(tenant, [E::TYPE.collection])
}

///
/// TESTS
///
