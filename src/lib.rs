//! `s3-doc-migrate` moves tabular exports from object storage into a document store.
//!
//! Sources come in two shapes and are told apart automatically by [`ingestion::sniff()`]:
//!
//! - **Enveloped JSON**: a CSV whose `_airbyte_data` column holds one JSON object per row.
//!   Objects are flattened with dot-joined key paths (`{"a":{"b":1}}` → `a.b = 1`).
//! - **Delimited text**: comma, semicolon or tab separated, tried in that order.
//!
//! ## Quick example: sniff a payload
//!
//! ```rust
//! use s3_doc_migrate::ingestion::{sniff, Candidate};
//! use s3_doc_migrate::ingestion::csv::Delimiter;
//! use s3_doc_migrate::types::Value;
//!
//! let out = sniff(b"a;b\n1;2\n3;4\n", None);
//! assert_eq!(out.format(), Some(Candidate::Delimited(Delimiter::Semicolon)));
//!
//! let ds = out.into_dataset();
//! assert_eq!(ds.row_count(), 2);
//! assert_eq!(ds.rows[1].get("b"), Some(&Value::Int64(4)));
//! ```
//!
//! ## Pipeline
//!
//! A [`pipeline::Migrator`] runs, per source key:
//!
//! 1. read: fetch through a [`storage::StorageClient`] and sniff
//! 2. clean: [`processing::drop_missing()`] drops records holding a null
//! 3. load: unordered bulk insert through a [`store::DocumentStore`]
//!
//! and then a separate quality pass comparing each source with its collection. Every step
//! returns a structured report; [`report`] renders them for the console.
//!
//! ## Modules
//!
//! - [`config`]: process configuration from the environment / `.env`
//! - [`ingestion`]: format detection, CSV and envelope parsing, observers
//! - [`processing`]: cleaning and comparison
//! - [`storage`]: object storage access
//! - [`store`]: document store access
//! - [`pipeline`]: load and quality passes
//! - [`types`]: records and datasets
//! - [`error`]: the shared error type

pub mod config;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod report;
pub mod storage;
pub mod store;
pub mod types;

pub use error::{MigrationError, MigrationResult};
