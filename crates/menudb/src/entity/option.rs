use crate::entity::{OptionSet, PRODUCT, Product, collection};
use menudb_core::{
    db::{CascadeHandler, CascadeSpec, CollectionPath, FieldPath, Predicate, ProjectionRule},
    traits::{EntityKind, EntityType},
    types::TenantId,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

pub static OPTION: EntityType = EntityType::child("Option", "options", &PRODUCT);

///
/// MenuOption
///
/// A choice inside an option set ("Extra cheese"). It is a product in its
/// own right, stored in its own collection, so it embeds one and can be
/// viewed as one.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuOption {
    #[serde(flatten)]
    pub product: Product,
}

impl MenuOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: i64) -> Self {
        Self {
            product: Product::new(id, name, price),
        }
    }

    #[must_use]
    pub fn meta(&self) -> OptionMeta {
        OptionMeta {
            name: self.product.name.clone(),
            is_active: self.product.is_active,
            price: self.product.price,
        }
    }
}

impl EntityKind for MenuOption {
    const TYPE: &'static EntityType = &OPTION;

    fn id(&self) -> &str {
        &self.product.id
    }

    fn ancestor(&self, ty: &EntityType) -> Option<&dyn Any> {
        if ty == Self::TYPE {
            Some(self as &dyn Any)
        } else {
            self.product.ancestor(ty)
        }
    }
}

///
/// OptionMeta
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionMeta {
    pub name: String,
    pub is_active: bool,
    pub price: i64,
}

/// Option sets list their options in `optionDisplayOrder` and may
/// preselect some of them.
pub const OPTION_IN_OPTION_SET: CascadeSpec = CascadeSpec::new("options")
    .with_array_removal_fields(&["optionDisplayOrder", "preselectedOptionIds"]);

#[must_use]
pub const fn rule() -> ProjectionRule<MenuOption, OptionMeta> {
    ProjectionRule::new(MenuOption::meta)
}

#[must_use]
pub const fn handler() -> CascadeHandler<MenuOption, OptionMeta> {
    CascadeHandler::new(
        OPTION_IN_OPTION_SET,
        option_sets,
        listed_in_option_set,
        MenuOption::meta,
    )
}

fn option_sets(tenant: &TenantId) -> CollectionPath {
    collection::<OptionSet>(tenant)
}

fn listed_in_option_set(option: &MenuOption) -> Predicate {
    Predicate::array_contains(FieldPath::new(["optionDisplayOrder"]), option.product.id.clone())
}
