use derive_more::{Deref, Display, From};
use serde::{Deserialize, Serialize};

///
/// TenantId
///
/// Identifier of the business that owns a set of collections.
/// Every collection reference is qualified by one.
///

#[derive(
    Clone,
    Debug,
    Deref,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
