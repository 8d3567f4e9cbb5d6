//! Bulk loading into the document store.

use serde::Serialize;

use crate::config::MigrationConfig;
use crate::error::MigrationResult;
use crate::store::{DocumentStore, InsertOutcome};
use crate::types::DataSet;

/// Counts from one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Documents sent to the store.
    pub attempted: usize,
    /// Documents the store reports as inserted.
    pub inserted: usize,
    /// Documents the store rejected.
    pub rejected: usize,
}

/// Insert every record of `dataset` into `collection`.
///
/// Opens a session (failing fast when the store is unreachable), pings, performs one
/// unordered bulk insert, and closes the session whether or not the insert succeeded. An
/// empty dataset is not sent to the store.
pub fn load_dataset(
    store: &dyn DocumentStore,
    config: &MigrationConfig,
    dataset: &DataSet,
    collection: &str,
) -> MigrationResult<LoadReport> {
    let mut session = store.connect(&config.store_uri, config.connect_timeout)?;

    let result = session.ping().and_then(|()| {
        if dataset.is_empty() {
            tracing::info!(collection, "empty dataset, nothing inserted");
            return Ok(InsertOutcome::default());
        }
        session.insert_many(&config.database, collection, dataset.to_documents())
    });

    if let Err(e) = session.close() {
        tracing::warn!(collection, err = %e, "failed to close document store session");
    }

    let outcome = result?;
    Ok(LoadReport {
        attempted: dataset.row_count(),
        inserted: outcome.inserted,
        rejected: outcome.rejected,
    })
}
