use crate::entity::{Audit, OptionMeta, Product, collection};
use menudb_core::{
    db::{CascadeHandler, CascadeSpec, CollectionPath, FieldPath, Predicate, ProjectionRule},
    traits::{EntityKind, EntityType},
    types::TenantId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub static OPTION_SET: EntityType = EntityType::root("OptionSet", "optionSets");

///
/// OptionSet
///
/// A group of options with selection bounds ("Choose a side").
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSet {
    pub id: String,
    pub name: String,
    pub min_selection: u32,
    pub max_selection: u32,

    #[serde(default)]
    pub option_display_order: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, OptionMeta>,
    #[serde(default)]
    pub preselected_option_ids: Vec<String>,

    #[serde(flatten)]
    pub audit: Audit,
}

impl OptionSet {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_selection: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn meta(&self) -> OptionSetMeta {
        OptionSetMeta {
            name: self.name.clone(),
            min_selection: self.min_selection,
            max_selection: self.max_selection,
        }
    }
}

impl EntityKind for OptionSet {
    const TYPE: &'static EntityType = &OPTION_SET;

    fn id(&self) -> &str {
        &self.id
    }
}

///
/// OptionSetMeta
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSetMeta {
    pub name: String,
    pub min_selection: u32,
    pub max_selection: u32,
}

/// Products list their option sets in `optionSetDisplayOrder` and keep
/// per-set selection overrides in `optionSetSelections`.
pub const OPTION_SET_IN_PRODUCT: CascadeSpec = CascadeSpec::new("optionSets")
    .with_additional_delete_fields(&["optionSetSelections"])
    .with_array_removal_fields(&["optionSetDisplayOrder"]);

#[must_use]
pub const fn rule() -> ProjectionRule<OptionSet, OptionSetMeta> {
    ProjectionRule::new(OptionSet::meta)
}

#[must_use]
pub const fn handler() -> CascadeHandler<OptionSet, OptionSetMeta> {
    CascadeHandler::new(
        OPTION_SET_IN_PRODUCT,
        products,
        listed_in_product,
        OptionSet::meta,
    )
}

fn products(tenant: &TenantId) -> CollectionPath {
    collection::<Product>(tenant)
}

fn listed_in_product(option_set: &OptionSet) -> Predicate {
    Predicate::array_contains(FieldPath::new(["optionSetDisplayOrder"]), option_set.id.clone())
}
