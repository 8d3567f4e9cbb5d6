//! Document store access.
//!
//! A [`DocumentStore`] opens short-lived [`StoreSession`]s; every logical operation (ping +
//! insert, full collection read) opens its own session and closes it explicitly. Nothing is
//! pooled.
//!
//! Implementations:
//!
//! - [`JsonDirStore`]: `file://<dir>` URIs; databases are directories, collections are
//!   JSON-lines files
//! - [`MemoryStore`]: in-process store with switches for unreachability and document rejection

mod json_dir;
mod memory;

use std::time::Duration;

use crate::error::MigrationResult;
use crate::types::Document;

pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;

/// Identifier field added by the store on insert.
pub const ID_FIELD: &str = "_id";

/// Result of an unordered bulk insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOutcome {
    /// Documents the store accepted.
    pub inserted: usize,
    /// Documents the store rejected; the rest of the batch was still inserted.
    pub rejected: usize,
}

/// Connects to a document store.
pub trait DocumentStore {
    /// Open a session, failing fast if the store cannot be reached within `timeout`.
    fn connect(&self, uri: &str, timeout: Duration) -> MigrationResult<Box<dyn StoreSession>>;
}

/// An open connection to a document store.
pub trait StoreSession {
    /// Verify the store answers.
    fn ping(&mut self) -> MigrationResult<()>;

    /// Unordered bulk insert: a rejected document does not prevent the others from being
    /// inserted. Documents without an [`ID_FIELD`] get one assigned.
    fn insert_many(
        &mut self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> MigrationResult<InsertOutcome>;

    /// Every document in `collection`, with `exclude_fields` projected out.
    fn find_all(
        &mut self,
        database: &str,
        collection: &str,
        exclude_fields: &[&str],
    ) -> MigrationResult<Vec<Document>>;

    /// Release the connection.
    fn close(self: Box<Self>) -> MigrationResult<()>;
}

/// Reason a document is refused by the bundled stores, if any.
///
/// Top-level field names may not start with `$`.
pub(crate) fn validate_document(doc: &Document) -> Result<(), String> {
    match doc.keys().find(|k| k.starts_with('$')) {
        Some(k) => Err(format!("field name '{k}' must not start with '$'")),
        None => Ok(()),
    }
}

pub(crate) fn project_out(mut doc: Document, exclude_fields: &[&str]) -> Document {
    doc.retain(|k, _| !exclude_fields.contains(&k.as_str()));
    doc
}
