use derive_more::Display;
use menudb_core::error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, ErrorOrigin::Config, message)
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.kind, ErrorKind::Conflict)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match err.class {
            ErrorClass::NotFound => ErrorKind::NotFound,
            ErrorClass::Conflict => ErrorKind::Conflict,
            ErrorClass::InvariantViolation => ErrorKind::Integrity,
            ErrorClass::Corruption => ErrorKind::Corruption,
            ErrorClass::Unsupported => ErrorKind::Unsupported,
            ErrorClass::Internal => ErrorKind::Internal,
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// A document the operation required does not exist.
    NotFound,

    /// The transaction kept conflicting with concurrent writers; retrying
    /// the whole call is safe.
    Conflict,

    /// Stored data breaks an integrity rule, such as one external
    /// reference linked to several documents.
    Integrity,

    /// A stored document does not decode into its entity.
    Corruption,

    /// Invalid configuration or an unsupported request.
    Unsupported,

    /// The caller cannot remediate this.
    Internal,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Cascade,
    Config,
    Registry,
    Repository,
    Serialize,
    Store,
    Transaction,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Cascade => Self::Cascade,
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Registry => Self::Registry,
            CoreErrorOrigin::Repository => Self::Repository,
            CoreErrorOrigin::Serialize => Self::Serialize,
            CoreErrorOrigin::Store => Self::Store,
            CoreErrorOrigin::Transaction => Self::Transaction,
        }
    }
}

///
/// TESTS
///
