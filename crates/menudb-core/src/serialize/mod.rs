mod json;

use crate::error::InternalError;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error as ThisError;

/// Document serialization infrastructure.
///
/// Every call produces an owned document, so the stored representation never
/// shares mutable state with the entity it was built from.

///
/// Document
///
/// One stored document body: a JSON object keyed by field name.
///

pub type Document = Map<String, Value>;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("deserialize error: {0}")]
    Deserialize(String),

    #[error("value is not a document object: found {0}")]
    NotAnObject(&'static str),
}

///
/// SerializeErrorKind
///
/// Stable error-kind taxonomy for serializer failures.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SerializeErrorKind {
    Serialize,
    Deserialize,
    NotAnObject,
}

impl SerializeErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serialize => "serialize",
            Self::Deserialize => "deserialize",
            Self::NotAnObject => "not_an_object",
        }
    }
}

impl fmt::Display for SerializeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SerializeError {
    /// Return a stable error kind independent of backend error-message text.
    #[must_use]
    pub const fn kind(&self) -> SerializeErrorKind {
        match self {
            Self::Serialize(_) => SerializeErrorKind::Serialize,
            Self::Deserialize(_) => SerializeErrorKind::Deserialize,
            Self::NotAnObject(_) => SerializeErrorKind::NotAnObject,
        }
    }
}

impl From<SerializeError> for InternalError {
    fn from(err: SerializeError) -> Self {
        match err.kind() {
            SerializeErrorKind::Serialize => Self::serialize_internal(err.to_string()),
            SerializeErrorKind::Deserialize | SerializeErrorKind::NotAnObject => {
                Self::serialize_corruption(err.to_string())
            }
        }
    }
}

/// Serialize a value into a free-standing JSON value (projections, field values).
pub fn to_value<T>(value: &T) -> Result<Value, SerializeError>
where
    T: Serialize,
{
    json::to_value(value)
}

/// Serialize an entity into its stored document form.
pub fn to_document<T>(entity: &T) -> Result<Document, SerializeError>
where
    T: Serialize,
{
    match json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(SerializeError::NotAnObject(json::kind_name(&other))),
    }
}

/// Deserialize an entity from a document produced by [`to_document`].
pub fn from_document<T>(document: Document) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    json::from_value(Value::Object(document))
}

///
/// TESTS
///
