//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`read_source`] (from [`source`]) which:
//!
//! - fetches an object through a [`crate::storage::StorageClient`]
//! - detects its format with [`sniff()`] and parses it into an in-memory
//!   [`crate::types::DataSet`]
//! - reports success/failure/alerts to an optional [`MigrationObserver`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`envelope`]

pub mod csv;
pub mod envelope;
pub mod observability;
pub mod sniff;
pub mod source;

pub use observability::{
    CompositeObserver, EventContext, EventStats, FileObserver, MigrationObserver, Reporter, Severity, Stage,
    TracingObserver,
};
pub use sniff::{sniff, Attempt, Candidate, SniffOutcome};
pub use source::{read_source, MigrationOptions, SourceRead, SourceStatus};
