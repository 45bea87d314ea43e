use crate::types::TenantId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root collection holding one document per tenant.
pub const TENANT_ROOT: &str = "businesses";

///
/// CollectionPath
///
/// Tenant-qualified collection reference:
/// `businesses/<tenant>/<collection>[/<doc>/<collection>...]`.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CollectionPath {
    tenant: TenantId,
    segments: Vec<String>,
}

impl CollectionPath {
    /// Build a collection path under `tenant`.
    ///
    /// `segments` alternate collection and document names and must end on a
    /// collection, so their count is odd.
    pub fn tenant<I, S>(tenant: &TenantId, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments.into_iter().map(Into::into).collect::<Vec<_>>();
        debug_assert!(
            segments.len() % 2 == 1,
            "collection paths need an odd number of segments: {segments:?}"
        );

        Self {
            tenant: tenant.clone(),
            segments,
        }
    }

    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        &self.tenant
    }

    /// Reference one document in this collection.
    #[must_use]
    pub fn doc(&self, id: impl Into<String>) -> DocPath {
        DocPath {
            collection: Some(self.clone()),
            tenant: self.tenant.clone(),
            id: id.into(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TENANT_ROOT}/{}", self.tenant)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

///
/// DocPath
///
/// One document reference. A missing collection means the tenant root
/// document itself (`businesses/<tenant>`).
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DocPath {
    collection: Option<CollectionPath>,
    tenant: TenantId,
    id: String,
}

impl DocPath {
    /// Reference the tenant root document.
    #[must_use]
    pub fn tenant_root(tenant: &TenantId) -> Self {
        Self {
            collection: None,
            tenant: tenant.clone(),
            id: tenant.to_string(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        &self.tenant
    }

    #[must_use]
    pub const fn collection(&self) -> Option<&CollectionPath> {
        self.collection.as_ref()
    }

    /// True when this document lives directly in `collection`.
    #[must_use]
    pub fn is_in(&self, collection: &CollectionPath) -> bool {
        self.collection.as_ref() == Some(collection)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collection {
            Some(collection) => write!(f, "{collection}/{}", self.id),
            None => write!(f, "{TENANT_ROOT}/{}", self.tenant),
        }
    }
}

///
/// FieldPath
///
/// Path to a (possibly nested) document field. Built from segments so an
/// entity id containing `.` stays a single segment.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Split a dotted path such as `linkedObjects.square.id`.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        Self::new(dotted.split('.'))
    }

    /// `<map_field>.<key>`: the slot keyed by `key` inside a map field.
    #[must_use]
    pub fn keyed(map_field: &str, key: &str) -> Self {
        Self(vec![map_field.to_string(), key.to_string()])
    }

    /// Append one segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

///
/// TESTS
///
