//! The migration pipeline.
//!
//! For every source key, [`Migrator::migrate_file`] runs read → clean → load and returns a
//! [`FileReport`]. [`Migrator::check_file`] runs the separate quality pass. Failures never
//! propagate: each one ends that file's processing and is recorded in its report, and the
//! batch moves on.
//!
//! ```no_run
//! use s3_doc_migrate::config::MigrationConfig;
//! use s3_doc_migrate::ingestion::MigrationOptions;
//! use s3_doc_migrate::pipeline::{CollectionTable, Migrator, DEFAULT_SOURCE_KEYS};
//! use s3_doc_migrate::storage::StorageClient;
//! use s3_doc_migrate::store::JsonDirStore;
//!
//! # fn main() -> Result<(), s3_doc_migrate::MigrationError> {
//! let config = MigrationConfig::from_env(None)?;
//! let storage = StorageClient::open(&config);
//! let store = JsonDirStore::new();
//! let migrator = Migrator::new(
//!     &config,
//!     &storage,
//!     &store,
//!     CollectionTable::defaults()?,
//!     MigrationOptions::default(),
//! );
//! let summary = migrator.run(&DEFAULT_SOURCE_KEYS);
//! print!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod load;
pub mod naming;

use serde::Serialize;

use crate::config::MigrationConfig;
use crate::error::{MigrationError, MigrationResult};
use crate::ingestion::{read_source, Candidate, EventContext, MigrationOptions, Reporter, SourceStatus, Stage};
use crate::processing::{drop_missing, CleanReport};
use crate::storage::StorageClient;
use crate::store::DocumentStore;

pub use check::{check_quality, QualityOutcome, QualityReport};
pub use load::{load_dataset, LoadReport};
pub use naming::{derive_collection_name, CollectionTable, DEFAULT_SOURCE_KEYS};

/// How processing of one source file ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// The key has no known collection; nothing was read.
    UnknownCollection,
    /// The source could not be fetched or parsed; nothing was loaded.
    Unreadable(SourceStatus),
    /// Every row held a missing value; the load was skipped.
    AllRowsMissing(CleanReport),
    /// Cleaned rows were sent to the store.
    Loaded { clean: CleanReport, load: LoadReport },
    /// The store could not be reached or refused the operation.
    LoadFailed { clean: CleanReport, error: String },
}

/// Report for one source file of the load pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub key: String,
    pub collection: Option<String>,
    /// Detected source format, when the source was parsed.
    pub format: Option<Candidate>,
    pub outcome: FileOutcome,
}

/// Reports of a full run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MigrationSummary {
    pub files: Vec<FileReport>,
    pub quality: Vec<QualityReport>,
}

impl MigrationSummary {
    /// Total documents inserted across files.
    pub fn inserted(&self) -> usize {
        self.files
            .iter()
            .map(|f| match &f.outcome {
                FileOutcome::Loaded { load, .. } => load.inserted,
                _ => 0,
            })
            .sum()
    }
}

/// Source keys stored under `prefix` in the configured bucket, sorted.
pub fn list_source_keys(
    storage: &StorageClient,
    config: &MigrationConfig,
    prefix: &str,
) -> MigrationResult<Vec<String>> {
    let keys = storage.list(&config.bucket, prefix)?;
    tracing::info!(prefix, found = keys.len(), "listed source keys");
    Ok(keys)
}

/// Runs the pipeline against one storage client and one document store.
pub struct Migrator<'a> {
    config: &'a MigrationConfig,
    storage: &'a StorageClient,
    store: &'a dyn DocumentStore,
    collections: CollectionTable,
    options: MigrationOptions,
}

impl<'a> Migrator<'a> {
    pub fn new(
        config: &'a MigrationConfig,
        storage: &'a StorageClient,
        store: &'a dyn DocumentStore,
        collections: CollectionTable,
        options: MigrationOptions,
    ) -> Self {
        Self {
            config,
            storage,
            store,
            collections,
            options,
        }
    }

    fn reporter(&self) -> Reporter {
        self.options.reporter()
    }

    /// Read, clean and load one source file.
    pub fn migrate_file(&self, key: &str) -> FileReport {
        let bucket = &self.config.bucket;
        let reporter = self.reporter();
        let mut report = FileReport {
            key: key.to_string(),
            collection: None,
            format: None,
            outcome: FileOutcome::UnknownCollection,
        };

        let Some(collection) = self.collections.get(key) else {
            tracing::warn!(key, "no collection known for key, skipped");
            return report;
        };
        report.collection = Some(collection.to_string());
        tracing::info!(key, collection, "processing source");

        let source = read_source(self.storage, bucket, key, self.options.limit, &reporter);
        let format = match source.status {
            SourceStatus::Parsed(format) => format,
            other => {
                report.outcome = FileOutcome::Unreadable(other);
                return report;
            }
        };
        report.format = Some(format);

        let ctx = EventContext::new(Stage::Clean, bucket, key).with_collection(collection);
        let (cleaned, clean) = drop_missing(&source.dataset);
        if clean.all_removed() {
            reporter.failure(&ctx, &MigrationError::AllRowsMissing { rows: clean.input_rows });
            report.outcome = FileOutcome::AllRowsMissing(clean);
            return report;
        }
        reporter.success(&ctx, clean.kept());

        let ctx = EventContext {
            stage: Stage::Load,
            ..ctx
        };
        report.outcome = match load_dataset(self.store, self.config, &cleaned, collection) {
            Ok(load) => {
                reporter.success(&ctx, load.inserted);
                FileOutcome::Loaded { clean, load }
            }
            Err(e) => {
                reporter.failure(&ctx, &e);
                FileOutcome::LoadFailed {
                    clean,
                    error: e.to_string(),
                }
            }
        };
        report
    }

    /// Run the quality check for one source file.
    pub fn check_file(&self, key: &str) -> QualityReport {
        match self.collections.get(key) {
            Some(collection) => check_quality(
                self.storage,
                self.store,
                self.config,
                key,
                collection,
                &self.reporter(),
            ),
            None => QualityReport {
                key: key.to_string(),
                collection: None,
                outcome: QualityOutcome::UnknownCollection,
            },
        }
    }

    /// Load pass over `keys`, in order.
    pub fn load_all<S: AsRef<str>>(&self, keys: &[S]) -> Vec<FileReport> {
        keys.iter().map(|k| self.migrate_file(k.as_ref())).collect()
    }

    /// Quality pass over `keys`, in order.
    pub fn check_all<S: AsRef<str>>(&self, keys: &[S]) -> Vec<QualityReport> {
        keys.iter().map(|k| self.check_file(k.as_ref())).collect()
    }

    /// Load pass, then quality pass.
    pub fn run<S: AsRef<str>>(&self, keys: &[S]) -> MigrationSummary {
        let files = self.load_all(keys);
        let quality = self.check_all(keys);
        MigrationSummary { files, quality }
    }
}
