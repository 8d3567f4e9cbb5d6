use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{MigrationError, MigrationResult};
use crate::types::Document;

use super::{project_out, validate_document, DocumentStore, InsertOutcome, StoreSession, ID_FIELD};

type RejectFn = dyn Fn(&Document) -> bool + Send + Sync;

#[derive(Default)]
struct MemoryState {
    collections: HashMap<(String, String), Vec<Document>>,
    unreachable: bool,
    reject: Option<Arc<RejectFn>>,
    next_id: u64,
    opened: usize,
    closed: usize,
}

/// In-process document store.
///
/// Clones share state, so a test can keep a handle while the pipeline connects through
/// another. Connection counters let callers check that every session was closed.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryStore")
            .field("collections", &state.collections.len())
            .field("unreachable", &state.unreachable)
            .field("opened", &state.opened)
            .field("closed", &state.closed)
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Ignore poisoning: no critical section can leave the state half-updated.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make subsequent `connect` calls fail.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Reject every inserted document matching `predicate`.
    pub fn reject_when<F>(&self, predicate: F)
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        self.lock().reject = Some(Arc::new(predicate));
    }

    /// Stored documents (including `_id`) for `database`/`collection`.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.lock().opened
    }

    /// Sessions closed so far.
    pub fn sessions_closed(&self) -> usize {
        self.lock().closed
    }
}

impl DocumentStore for MemoryStore {
    fn connect(&self, uri: &str, timeout: Duration) -> MigrationResult<Box<dyn StoreSession>> {
        let mut state = self.lock();
        if state.unreachable {
            return Err(MigrationError::StoreUnreachable {
                uri: uri.to_string(),
                message: format!("server selection timed out after {timeout:?}"),
            });
        }
        state.opened += 1;
        Ok(Box::new(MemorySession {
            store: self.clone(),
        }))
    }
}

struct MemorySession {
    store: MemoryStore,
}

impl StoreSession for MemorySession {
    fn ping(&mut self) -> MigrationResult<()> {
        if self.store.lock().unreachable {
            return Err(MigrationError::StoreUnreachable {
                uri: "memory://".to_string(),
                message: "ping failed".to_string(),
            });
        }
        Ok(())
    }

    fn insert_many(
        &mut self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> MigrationResult<InsertOutcome> {
        let mut state = self.store.lock();
        let reject = state.reject.clone();
        let mut outcome = InsertOutcome::default();
        let mut accepted = Vec::with_capacity(documents.len());
        for doc in documents {
            let refused = validate_document(&doc).is_err() || reject.as_ref().is_some_and(|f| f(&doc));
            if refused {
                outcome.rejected += 1;
                continue;
            }
            let mut stored = Document::new();
            if !doc.contains_key(ID_FIELD) {
                state.next_id += 1;
                stored.insert(ID_FIELD.to_string(), serde_json::Value::from(state.next_id));
            }
            stored.extend(doc);
            accepted.push(stored);
            outcome.inserted += 1;
        }
        state
            .collections
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .extend(accepted);
        Ok(outcome)
    }

    fn find_all(
        &mut self,
        database: &str,
        collection: &str,
        exclude_fields: &[&str],
    ) -> MigrationResult<Vec<Document>> {
        Ok(self
            .store
            .documents(database, collection)
            .into_iter()
            .map(|doc| project_out(doc, exclude_fields))
            .collect())
    }

    fn close(self: Box<Self>) -> MigrationResult<()> {
        self.store.lock().closed += 1;
        Ok(())
    }
}
