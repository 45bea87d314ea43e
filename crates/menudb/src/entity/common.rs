use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// LinkedObject
///
/// Reference to the same record in an external system (POS, delivery
/// platform). Stored under `linkedObjects.<provider>`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedObject {
    pub id: String,
}

impl LinkedObject {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// External references keyed by provider.
pub type LinkedObjects = BTreeMap<String, LinkedObject>;

///
/// Audit
///
/// Bookkeeping shared by every catalog entity. `is_deleted` is a caller
/// flag; the repository deletes documents outright.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub linked_objects: LinkedObjects,
}

impl Audit {
    #[must_use]
    pub fn now() -> Self {
        let now = Utc::now();

        Self {
            created: now,
            updated: now,
            is_deleted: false,
            linked_objects: LinkedObjects::new(),
        }
    }

    /// Attach (or replace) the reference held at `provider`.
    #[must_use]
    pub fn with_link(mut self, provider: impl Into<String>, external_id: impl Into<String>) -> Self {
        self.linked_objects
            .insert(provider.into(), LinkedObject::new(external_id));
        self
    }
}

impl Default for Audit {
    fn default() -> Self {
        Self::now()
    }
}
