//! Source reads: fetch an object and sniff it.
//!
//! [`read_source`] never fails. A missing object, an unavailable storage client or an
//! unparseable payload all yield an empty [`DataSet`] plus a [`SourceStatus`] saying why, and
//! the failure is reported to the configured observer.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::MigrationError;
use crate::storage::StorageClient;
use crate::types::DataSet;

use super::observability::{EventContext, MigrationObserver, Reporter, Severity, Stage};
use super::sniff::{sniff, Attempt, Candidate, SniffOutcome};

/// Options shared by every pipeline step.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct MigrationOptions {
    /// Read at most this many data rows per source during the load pass.
    pub limit: Option<usize>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn MigrationObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl fmt::Debug for MigrationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationOptions")
            .field("limit", &self.limit)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            limit: None,
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

impl MigrationOptions {
    pub fn reporter(&self) -> Reporter {
        Reporter::new(self.observer.clone(), self.alert_at_or_above)
    }
}

/// How a source read ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Parsed with the given candidate.
    Parsed(Candidate),
    /// No candidate could parse the payload.
    Unparseable(Vec<Attempt>),
    /// The object could not be fetched.
    StorageUnavailable(String),
}

/// A fetched and sniffed source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRead {
    /// Parsed rows; empty unless `status` is `Parsed`.
    pub dataset: DataSet,
    pub status: SourceStatus,
}

impl SourceRead {
    /// `true` when the payload was parsed.
    pub fn is_parsed(&self) -> bool {
        matches!(self.status, SourceStatus::Parsed(_))
    }
}

/// Fetch `bucket`/`key` and detect its format. At most `limit` data rows are read.
pub fn read_source(
    client: &StorageClient,
    bucket: &str,
    key: &str,
    limit: Option<usize>,
    reporter: &Reporter,
) -> SourceRead {
    let ctx = EventContext::new(Stage::Read, bucket, key);

    let bytes = match client.get(bucket, key) {
        Ok(bytes) => bytes,
        Err(e) => {
            reporter.failure(&ctx, &e);
            return SourceRead {
                dataset: DataSet::empty(),
                status: SourceStatus::StorageUnavailable(e.to_string()),
            };
        }
    };

    match sniff(&bytes, limit) {
        SniffOutcome::Parsed {
            dataset,
            format,
            rejected,
        } => {
            tracing::debug!(key, %format, rejected = rejected.len(), rows = dataset.row_count(), "source parsed");
            reporter.success(&ctx, dataset.row_count());
            SourceRead {
                dataset,
                status: SourceStatus::Parsed(format),
            }
        }
        SniffOutcome::Unparseable { attempts } => {
            let reasons = attempts
                .iter()
                .map(|a| format!("{}: {}", a.candidate, a.reason))
                .collect::<Vec<_>>()
                .join("; ");
            reporter.failure(
                &ctx,
                &MigrationError::Unparseable {
                    key: key.to_string(),
                    reasons,
                },
            );
            SourceRead {
                dataset: DataSet::empty(),
                status: SourceStatus::Unparseable(attempts),
            }
        }
    }
}
