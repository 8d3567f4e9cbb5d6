//! Missing-value cleaning.

use serde::Serialize;

use crate::types::DataSet;

use super::filter::filter;

/// Counts from a cleaning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Rows before cleaning.
    pub input_rows: usize,
    /// Rows dropped for holding a missing value.
    pub removed: usize,
}

impl CleanReport {
    /// Rows kept.
    pub fn kept(&self) -> usize {
        self.input_rows - self.removed
    }

    /// `true` when the input had rows and every one of them was dropped.
    pub fn all_removed(&self) -> bool {
        self.input_rows > 0 && self.removed == self.input_rows
    }
}

/// Drop every record holding a null among its own columns.
///
/// Columns a record does not carry are not considered missing, so records decoded from
/// heterogeneous JSON payloads are judged on their own shape.
pub fn drop_missing(dataset: &DataSet) -> (DataSet, CleanReport) {
    let cleaned = filter(dataset, |row| !row.has_missing());
    let report = CleanReport {
        input_rows: dataset.row_count(),
        removed: dataset.row_count() - cleaned.row_count(),
    };
    (cleaned, report)
}
