//! Format detection for source payloads.
//!
//! [`sniff`] runs an ordered chain of parse candidates over a raw payload and returns the
//! first success:
//!
//! 1. [`Candidate::Envelope`]: enveloped JSON in the `_airbyte_data` column
//! 2. [`Candidate::Delimited`] for comma, semicolon, then tab; a delimiter must split the
//!    header into at least two columns and the table must have data rows
//! 3. [`Candidate::SingleColumn`]: a one-column comma table, unless that column is the
//!    envelope column or its values look like raw JSON
//!
//! Every rejected candidate is recorded with its reason, so callers can tell which
//! candidates were attempted.

use std::fmt;

use serde::Serialize;

use crate::error::{MigrationError, MigrationResult};
use crate::types::{DataSet, Value};

use super::csv::{read_raw_table, type_table, Delimiter, DELIMITER_CANDIDATES};
use super::envelope::{parse_envelope, ENVELOPE_COLUMN};

/// One parse strategy in the detection chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Candidate {
    /// Enveloped JSON export.
    Envelope,
    /// Plain delimited table.
    Delimited(Delimiter),
    /// Headed table with a single column.
    SingleColumn,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidate::Envelope => f.write_str("enveloped json"),
            Candidate::Delimited(d) => write!(f, "{d}-delimited"),
            Candidate::SingleColumn => f.write_str("single column"),
        }
    }
}

/// A rejected candidate and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    /// Candidate that was tried.
    pub candidate: Candidate,
    /// Human-readable rejection reason.
    pub reason: String,
}

/// Result of running the detection chain over one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SniffOutcome {
    /// A candidate produced a non-empty table.
    Parsed {
        dataset: DataSet,
        format: Candidate,
        /// Candidates rejected before `format` succeeded.
        rejected: Vec<Attempt>,
    },
    /// No candidate succeeded.
    Unparseable { attempts: Vec<Attempt> },
}

impl SniffOutcome {
    /// The parsed dataset, or an empty one when nothing matched.
    pub fn into_dataset(self) -> DataSet {
        match self {
            SniffOutcome::Parsed { dataset, .. } => dataset,
            SniffOutcome::Unparseable { .. } => DataSet::empty(),
        }
    }

    /// The detected format, if any.
    pub fn format(&self) -> Option<Candidate> {
        match self {
            SniffOutcome::Parsed { format, .. } => Some(*format),
            SniffOutcome::Unparseable { .. } => None,
        }
    }
}

/// The full candidate chain, in evaluation order.
pub fn candidates() -> impl Iterator<Item = Candidate> {
    std::iter::once(Candidate::Envelope)
        .chain(DELIMITER_CANDIDATES.into_iter().map(Candidate::Delimited))
        .chain(std::iter::once(Candidate::SingleColumn))
}

/// Detect the payload format and parse it. At most `limit` data rows are read.
pub fn sniff(bytes: &[u8], limit: Option<usize>) -> SniffOutcome {
    let mut rejected = Vec::new();
    for candidate in candidates() {
        match try_candidate(candidate, bytes, limit) {
            Ok(dataset) => {
                return SniffOutcome::Parsed {
                    dataset,
                    format: candidate,
                    rejected,
                };
            }
            Err(e) => rejected.push(Attempt {
                candidate,
                reason: e.to_string(),
            }),
        }
    }
    SniffOutcome::Unparseable { attempts: rejected }
}

/// Evaluate a single candidate.
pub fn try_candidate(candidate: Candidate, bytes: &[u8], limit: Option<usize>) -> MigrationResult<DataSet> {
    match candidate {
        Candidate::Envelope => parse_envelope(bytes, limit),
        Candidate::Delimited(delimiter) => {
            let table = read_raw_table(bytes, delimiter.as_byte(), limit)?;
            if table.headers.len() < 2 {
                return Err(MigrationError::Delimited {
                    message: format!("{delimiter} does not split the header"),
                });
            }
            if table.rows.is_empty() {
                return Err(MigrationError::Delimited {
                    message: "no data rows".to_string(),
                });
            }
            Ok(type_table(&table))
        }
        Candidate::SingleColumn => {
            let table = read_raw_table(bytes, b',', limit)?;
            if table.headers.len() != 1 {
                return Err(MigrationError::Delimited {
                    message: format!("expected one column, found {}", table.headers.len()),
                });
            }
            if table.headers[0] == ENVELOPE_COLUMN {
                return Err(MigrationError::Delimited {
                    message: format!("'{ENVELOPE_COLUMN}' holds undecodable payloads"),
                });
            }
            if table.rows.is_empty() {
                return Err(MigrationError::Delimited {
                    message: "no data rows".to_string(),
                });
            }
            let dataset = type_table(&table);
            if dataset.rows.iter().any(|r| r.iter().any(|(_, v)| looks_like_json(v))) {
                return Err(MigrationError::Delimited {
                    message: "single column holds raw json text".to_string(),
                });
            }
            Ok(dataset)
        }
    }
}

fn looks_like_json(v: &Value) -> bool {
    match v {
        Value::Utf8(s) => {
            let t = s.trim_start();
            t.starts_with('{') || t.starts_with('[')
        }
        _ => false,
    }
}
