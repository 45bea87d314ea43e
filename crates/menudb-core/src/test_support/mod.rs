//! Small entity lineage shared by the crate's unit tests.

use crate::{
    db::meta::ProjectionRule,
    traits::{EntityKind, EntityType},
};
use serde::{Deserialize, Serialize};
use std::any::Any;

pub(crate) static BASE_TYPE: EntityType = EntityType::root("BaseRecord", "records");
pub(crate) static DERIVED_TYPE: EntityType =
    EntityType::child("DerivedRecord", "records", &BASE_TYPE);
pub(crate) static UNRELATED_TYPE: EntityType =
    EntityType::root("UnrelatedRecord", "unrelated");

///
/// BaseRecord
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BaseRecord {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) is_active: bool,
}

impl BaseRecord {
    pub(crate) fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            is_active: true,
        }
    }
}

impl EntityKind for BaseRecord {
    const TYPE: &'static EntityType = &BASE_TYPE;

    fn id(&self) -> &str {
        &self.id
    }
}

///
/// DerivedRecord
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DerivedRecord {
    #[serde(flatten)]
    pub(crate) base: BaseRecord,
    pub(crate) extra: u32,
}

impl DerivedRecord {
    pub(crate) fn new(id: &str, name: &str) -> Self {
        Self {
            base: BaseRecord::new(id, name),
            extra: 7,
        }
    }
}

impl EntityKind for DerivedRecord {
    const TYPE: &'static EntityType = &DERIVED_TYPE;

    fn id(&self) -> &str {
        &self.base.id
    }

    fn ancestor(&self, ty: &EntityType) -> Option<&dyn Any> {
        if ty == Self::TYPE {
            Some(self as &dyn Any)
        } else {
            self.base.ancestor(ty)
        }
    }
}

///
/// UnrelatedRecord
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub(crate) struct UnrelatedRecord {
    pub(crate) id: String,
}

impl UnrelatedRecord {
    pub(crate) fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl EntityKind for UnrelatedRecord {
    const TYPE: &'static EntityType = &UNRELATED_TYPE;

    fn id(&self) -> &str {
        &self.id
    }
}

///
/// BaseMeta
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BaseMeta {
    pub(crate) name: String,
    pub(crate) is_active: bool,
}

pub(crate) fn base_meta(record: &BaseRecord) -> BaseMeta {
    BaseMeta {
        name: record.name.clone(),
        is_active: record.is_active,
    }
}

pub(crate) const fn base_rule() -> ProjectionRule<BaseRecord, BaseMeta> {
    ProjectionRule::new(base_meta)
}
