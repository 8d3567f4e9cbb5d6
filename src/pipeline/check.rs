//! Post-load quality check: re-read source and target and compare them.

use serde::Serialize;

use crate::config::MigrationConfig;
use crate::error::MigrationResult;
use crate::ingestion::{read_source, EventContext, Reporter, SourceStatus, Stage};
use crate::processing::{compare, Comparison};
use crate::storage::StorageClient;
use crate::store::{DocumentStore, ID_FIELD};
use crate::types::{DataSet, Document};

/// Outcome of a quality check for one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityOutcome {
    /// Both sides were read and compared.
    Compared {
        comparison: Comparison,
        /// How the source read ended; an unreadable source compares as empty.
        source_status: SourceStatus,
    },
    /// The target could not be read.
    TargetUnavailable(String),
    /// The key has no known collection.
    UnknownCollection,
}

/// Quality report for one `(key, collection)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub key: String,
    /// Target collection; `None` for keys outside the collection table.
    pub collection: Option<String>,
    pub outcome: QualityOutcome,
}

/// Re-read the full source (no row limit, no cleaning) and every document of `collection`,
/// then compare them. Read-only.
pub fn check_quality(
    client: &StorageClient,
    store: &dyn DocumentStore,
    config: &MigrationConfig,
    key: &str,
    collection: &str,
    reporter: &Reporter,
) -> QualityReport {
    let source = read_source(client, &config.bucket, key, None, reporter);
    let ctx = EventContext::new(Stage::Reconcile, &config.bucket, key).with_collection(collection);

    let outcome = match read_target(store, config, collection) {
        Ok(docs) => {
            let target = DataSet::from_documents(&docs);
            let comparison = compare(&source.dataset, &target);
            reporter.success(&ctx, comparison.target_rows);
            QualityOutcome::Compared {
                comparison,
                source_status: source.status,
            }
        }
        Err(e) => {
            reporter.failure(&ctx, &e);
            QualityOutcome::TargetUnavailable(e.to_string())
        }
    };

    QualityReport {
        key: key.to_string(),
        collection: Some(collection.to_string()),
        outcome,
    }
}

fn read_target(
    store: &dyn DocumentStore,
    config: &MigrationConfig,
    collection: &str,
) -> MigrationResult<Vec<Document>> {
    let mut session = store.connect(&config.store_uri, config.connect_timeout)?;
    let docs = session.find_all(&config.database, collection, &[ID_FIELD]);
    if let Err(e) = session.close() {
        tracing::warn!(collection, err = %e, "failed to close document store session");
    }
    docs
}
