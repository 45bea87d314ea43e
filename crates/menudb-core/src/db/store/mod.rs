//! Document-store capability surface.
//!
//! The engine consumes exactly this surface: point reads, single-predicate
//! collection queries, and a transaction that buffers writes and commits
//! them atomically. The store owns isolation and retry.

mod memory;

pub use memory::MemoryStore;

use crate::{
    db::{
        path::{CollectionPath, DocPath},
        predicate::Predicate,
        update::UpdateOps,
    },
    error::InternalError,
    serialize::Document,
};

///
/// Snapshot
///
/// One document as read: its id, full path, and body.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub id: String,
    pub path: DocPath,
    pub data: Document,
}

///
/// Query
///
/// Collection scan with an optional single predicate.
/// Results are ordered by document id.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    pub predicate: Option<Predicate>,
}

impl Query {
    /// Every document in `collection`.
    #[must_use]
    pub const fn all(collection: CollectionPath) -> Self {
        Self {
            collection,
            predicate: None,
        }
    }

    /// Documents in `collection` matching `predicate`.
    #[must_use]
    pub const fn filter(collection: CollectionPath, predicate: Predicate) -> Self {
        Self {
            collection,
            predicate: Some(predicate),
        }
    }

    /// True when the document at `path` belongs to this query's result set.
    #[must_use]
    pub fn matches(&self, path: &DocPath, data: &Document) -> bool {
        path.is_in(&self.collection)
            && self
                .predicate
                .as_ref()
                .is_none_or(|predicate| predicate.matches(data))
    }
}

///
/// Transaction
///
/// Handle passed to a transaction callback.
///
/// All reads must be issued before the first write. Writes are buffered and
/// become visible only when the store commits the whole transaction.
///

pub trait Transaction {
    fn get(&mut self, doc: &DocPath) -> Result<Option<Snapshot>, InternalError>;

    fn query(&mut self, query: &Query) -> Result<Vec<Snapshot>, InternalError>;

    /// Replace the whole document.
    fn set(&mut self, doc: &DocPath, data: Document) -> Result<(), InternalError>;

    /// Apply a partial update; the document must exist at commit time.
    fn update(&mut self, doc: &DocPath, ops: UpdateOps) -> Result<(), InternalError>;

    fn delete(&mut self, doc: &DocPath) -> Result<(), InternalError>;
}

///
/// DocumentStore
///
/// `run_transaction` may invoke its callback more than once when an
/// optimistic commit conflicts. The callback must only mutate state through
/// the transaction handle it receives.
///

pub trait DocumentStore: Send + Sync {
    fn get(&self, doc: &DocPath) -> Result<Option<Snapshot>, InternalError>;

    fn query(&self, query: &Query) -> Result<Vec<Snapshot>, InternalError>;

    fn run_transaction<T, F>(&self, f: F) -> Result<T, InternalError>
    where
        F: FnMut(&mut dyn Transaction) -> Result<T, InternalError>;
}
