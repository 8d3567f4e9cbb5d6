//! In-memory dataset transformations.
//!
//! The processing layer operates on [`crate::types::DataSet`] values produced by ingestion and
//! performs no I/O:
//!
//! - [`filter()`]: row filtering by predicate
//! - [`drop_missing()`]: drop records holding a null in any of their own columns
//! - [`compare()`]: source/target comparison (row counts, column sets, null ratios)
//!
//! ## Example: clean, then compare
//!
//! ```rust
//! use s3_doc_migrate::processing::{compare, drop_missing};
//! use s3_doc_migrate::types::{DataSet, Record, Value};
//!
//! let source = DataSet::new(vec![
//!     Record::from_iter([("a", Value::Int64(1)), ("b", Value::Null)]),
//!     Record::from_iter([("a", Value::Int64(2)), ("b", Value::Int64(3))]),
//! ]);
//!
//! let (cleaned, report) = drop_missing(&source);
//! assert_eq!(report.removed, 1);
//!
//! let cmp = compare(&source, &cleaned);
//! assert_eq!((cmp.source_rows, cmp.target_rows), (2, 1));
//! assert!(cmp.columns_equal);
//! ```

pub mod clean;
pub mod filter;
pub mod reconcile;

pub use clean::{drop_missing, CleanReport};
pub use filter::filter;
pub use reconcile::{compare, null_ratios, Comparison, NullRatio};
