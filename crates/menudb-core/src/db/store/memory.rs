use crate::{
    config::StoreConfig,
    db::{
        path::DocPath,
        store::{DocumentStore, Query, Snapshot, Transaction},
        update::{UpdateOps, apply_ops},
    },
    error::InternalError,
    obs::sink::{MetricsEvent, record},
    serialize::Document,
};
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::{trace, warn};

///
/// MemoryStore
///
/// In-process document store with optimistic transactions.
///
/// Every document carries a version. A transaction records the version of
/// each document it read and the membership of each query result; commit
/// re-checks both under the write lock and re-runs the callback when
/// anything moved. Commits are all-or-nothing.
///

pub struct MemoryStore {
    docs: RwLock<BTreeMap<DocPath, StoredDoc>>,
    config: StoreConfig,
    next_version: AtomicU64,
    transactions: AtomicU64,
    attempts: AtomicU64,
}

#[derive(Clone, Debug)]
struct StoredDoc {
    version: u64,
    data: Document,
}

// Versions observed for one query: (document path, version) in result order.
type QueryObservation = Vec<(DocPath, u64)>;

enum CommitOutcome {
    Committed,
    Conflicted,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new(mut config: StoreConfig) -> Self {
        // the callback always runs at least once
        config.max_transaction_attempts = config.max_transaction_attempts.max(1);

        Self {
            docs: RwLock::new(BTreeMap::new()),
            config,
            next_version: AtomicU64::new(1),
            transactions: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
        }
    }

    /// Write a document outside any transaction (seeding, concurrent writers).
    pub fn insert(&self, path: DocPath, data: Document) {
        let version = self.bump_version();
        self.docs.write().insert(path, StoredDoc { version, data });
    }

    /// Remove a document outside any transaction.
    pub fn remove(&self, path: &DocPath) -> Option<Document> {
        self.docs.write().remove(path).map(|doc| doc.data)
    }

    /// Current body of one document.
    #[must_use]
    pub fn document(&self, path: &DocPath) -> Option<Document> {
        self.docs.read().get(path).map(|doc| doc.data.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Number of `run_transaction` calls so far.
    #[must_use]
    pub fn transactions_started(&self) -> u64 {
        self.transactions.load(Ordering::SeqCst)
    }

    /// Number of callback attempts so far, counting retries.
    #[must_use]
    pub fn transaction_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn bump_version(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::SeqCst)
    }

    fn snapshot(path: &DocPath, doc: &StoredDoc) -> Snapshot {
        Snapshot {
            id: path.id().to_string(),
            path: path.clone(),
            data: doc.data.clone(),
        }
    }

    fn run_query(
        docs: &BTreeMap<DocPath, StoredDoc>,
        query: &Query,
    ) -> Vec<(DocPath, StoredDoc)> {
        docs.iter()
            .filter(|(path, doc)| query.matches(path, &doc.data))
            .map(|(path, doc)| (path.clone(), doc.clone()))
            .collect()
    }

    fn commit(&self, tx: MemoryTransaction<'_>) -> Result<CommitOutcome, InternalError> {
        let mut docs = self.docs.write();

        // Validation phase: every read must still be current.
        for (path, seen) in &tx.reads {
            if docs.get(path).map(|doc| doc.version) != *seen {
                trace!(doc = %path, "read set changed before commit");
                return Ok(CommitOutcome::Conflicted);
            }
        }
        for (query, seen) in &tx.queries {
            let current = Self::run_query(&docs, query)
                .into_iter()
                .map(|(path, doc)| (path, doc.version))
                .collect::<QueryObservation>();
            if current != *seen {
                trace!(collection = %query.collection, "query result changed before commit");
                return Ok(CommitOutcome::Conflicted);
            }
        }

        // Staging phase: resolve every buffered write before touching the map.
        let mut staged: BTreeMap<DocPath, Option<Document>> = BTreeMap::new();
        for (path, write) in tx.writes {
            let current = match staged.get(&path) {
                Some(value) => value.clone(),
                None => docs.get(&path).map(|doc| doc.data.clone()),
            };

            let next = match write {
                BufferedWrite::Set(data) => Some(data),
                BufferedWrite::Delete => None,
                BufferedWrite::Update(ops) => {
                    let Some(mut data) = current else {
                        return Err(InternalError::store_not_found(path.to_string()));
                    };
                    apply_ops(&mut data, &ops);
                    Some(data)
                }
            };
            staged.insert(path, next);
        }

        // Apply phase: infallible.
        for (path, next) in staged {
            match next {
                Some(data) => {
                    let version = self.bump_version();
                    docs.insert(path, StoredDoc { version, data });
                }
                None => {
                    docs.remove(&path);
                }
            }
        }

        Ok(CommitOutcome::Committed)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, doc: &DocPath) -> Result<Option<Snapshot>, InternalError> {
        Ok(self
            .docs
            .read()
            .get(doc)
            .map(|stored| Self::snapshot(doc, stored)))
    }

    fn query(&self, query: &Query) -> Result<Vec<Snapshot>, InternalError> {
        let docs = self.docs.read();

        Ok(Self::run_query(&docs, query)
            .iter()
            .map(|(path, doc)| Self::snapshot(path, doc))
            .collect())
    }

    fn run_transaction<T, F>(&self, mut f: F) -> Result<T, InternalError>
    where
        F: FnMut(&mut dyn Transaction) -> Result<T, InternalError>,
    {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        let max_attempts = self.config.max_transaction_attempts;

        for attempt in 1..=max_attempts {
            self.attempts.fetch_add(1, Ordering::SeqCst);

            let mut tx = MemoryTransaction::new(self);
            let value = f(&mut tx)?;

            match self.commit(tx)? {
                CommitOutcome::Committed => return Ok(value),
                CommitOutcome::Conflicted => {
                    warn!(attempt, max_attempts, "transaction commit conflicted");
                    record(MetricsEvent::TransactionRetry { attempt });
                }
            }
        }

        Err(InternalError::transaction_conflict(max_attempts))
    }
}

///
/// MemoryTransaction
///

enum BufferedWrite {
    Set(Document),
    Update(UpdateOps),
    Delete,
}

struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    reads: BTreeMap<DocPath, Option<u64>>,
    queries: Vec<(Query, QueryObservation)>,
    writes: Vec<(DocPath, BufferedWrite)>,
}

impl<'a> MemoryTransaction<'a> {
    const fn new(store: &'a MemoryStore) -> Self {
        Self {
            store,
            reads: BTreeMap::new(),
            queries: Vec::new(),
            writes: Vec::new(),
        }
    }

    fn ensure_no_writes(&self, what: &str) -> Result<(), InternalError> {
        if self.writes.is_empty() {
            Ok(())
        } else {
            Err(InternalError::transaction_invariant(format!(
                "transaction reads must precede writes: {what} issued after {} buffered writes",
                self.writes.len()
            )))
        }
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn get(&mut self, doc: &DocPath) -> Result<Option<Snapshot>, InternalError> {
        self.ensure_no_writes(&format!("get {doc}"))?;

        let docs = self.store.docs.read();
        let stored = docs.get(doc);
        self.reads
            .entry(doc.clone())
            .or_insert_with(|| stored.map(|s| s.version));

        Ok(stored.map(|s| MemoryStore::snapshot(doc, s)))
    }

    fn query(&mut self, query: &Query) -> Result<Vec<Snapshot>, InternalError> {
        self.ensure_no_writes(&format!("query {}", query.collection))?;

        let rows = MemoryStore::run_query(&self.store.docs.read(), query);
        self.queries.push((
            query.clone(),
            rows.iter()
                .map(|(path, doc)| (path.clone(), doc.version))
                .collect(),
        ));

        Ok(rows
            .iter()
            .map(|(path, doc)| MemoryStore::snapshot(path, doc))
            .collect())
    }

    fn set(&mut self, doc: &DocPath, data: Document) -> Result<(), InternalError> {
        self.writes.push((doc.clone(), BufferedWrite::Set(data)));
        Ok(())
    }

    fn update(&mut self, doc: &DocPath, ops: UpdateOps) -> Result<(), InternalError> {
        if ops.keys().any(|field| field.segments().is_empty()) {
            return Err(InternalError::store_invariant(format!(
                "update of {doc} names an empty field path"
            )));
        }

        self.writes.push((doc.clone(), BufferedWrite::Update(ops)));
        Ok(())
    }

    fn delete(&mut self, doc: &DocPath) -> Result<(), InternalError> {
        self.writes.push((doc.clone(), BufferedWrite::Delete));
        Ok(())
    }
}

///
/// TESTS
///
