//! Delimited-text ingestion.
//!
//! Cells are typed per column the way dataframe readers usually do it: NA tokens become
//! [`Value::Null`], then a column is `Int64` if every remaining cell parses as an integer,
//! `Float64` if every cell parses as a number, `Bool` if every cell is `true`/`false`, and
//! `Utf8` (raw text) otherwise.

use std::fmt;

use serde::Serialize;

use crate::error::{MigrationError, MigrationResult};
use crate::types::{DataSet, Record, Value};

/// Delimiter candidates tried by the sniffer, in order.
pub const DELIMITER_CANDIDATES: [Delimiter; 3] =
    [Delimiter::Comma, Delimiter::Semicolon, Delimiter::Tab];

/// Cell texts treated as missing values.
pub const NA_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
];

/// A field delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `\t`
    Tab,
}

impl Delimiter {
    /// The delimiter byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
            Delimiter::Tab => "tab",
        };
        f.write_str(name)
    }
}

/// Untyped table: header names and raw cell text per row.
///
/// Short rows are kept short; a missing trailing cell reads as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// Header names in file order.
    pub headers: Vec<String>,
    /// Row-major cell text.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Cell text at (`row`, `col`), `None` when the row is shorter than the header.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    /// Index of a header by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Read a headed delimited table without typing cells.
///
/// At most `limit` data rows are read. A row with more fields than the header is an error.
pub fn read_raw_table(bytes: &[u8], delimiter: u8, limit: Option<usize>) -> MigrationResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(MigrationError::Delimited {
            message: "missing header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        if limit.is_some_and(|n| rows.len() >= n) {
            break;
        }
        let record = result?;
        if record.len() > headers.len() {
            return Err(MigrationError::Delimited {
                message: format!(
                    "row {} has {} fields but the header has {}",
                    // 1-based, header is row 1.
                    row_idx0 + 2,
                    record.len(),
                    headers.len()
                ),
            });
        }
        rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Type every column of `table` and build records carrying all header columns.
pub fn type_table(table: &RawTable) -> DataSet {
    let kinds: Vec<ColumnKind> = (0..table.headers.len())
        .map(|col| infer_column_kind((0..table.rows.len()).map(|row| table.cell(row, col))))
        .collect();

    let rows = (0..table.rows.len())
        .map(|row| {
            table
                .headers
                .iter()
                .zip(kinds.iter())
                .enumerate()
                .map(|(col, (name, kind))| (name.clone(), kind.convert(table.cell(row, col))))
                .collect::<Record>()
        })
        .collect();

    DataSet::with_columns(table.headers.clone(), rows)
}

/// Returns `true` if `raw` is a missing-value token.
pub fn is_na(raw: &str) -> bool {
    NA_TOKENS.contains(&raw.trim())
}

/// Inferred column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int64,
    Float64,
    Bool,
    Utf8,
}

impl ColumnKind {
    fn convert(self, raw: Option<&str>) -> Value {
        let Some(raw) = raw.filter(|r| !is_na(r)) else {
            return Value::Null;
        };
        let trimmed = raw.trim();
        match self {
            ColumnKind::Int64 => trimmed.parse().map(Value::Int64).unwrap_or(Value::Null),
            ColumnKind::Float64 => parse_finite(trimmed).map(Value::Float64).unwrap_or(Value::Null),
            ColumnKind::Bool => parse_bool(trimmed).map(Value::Bool).unwrap_or(Value::Null),
            ColumnKind::Utf8 => Value::Utf8(raw.to_owned()),
        }
    }
}

/// Infer the narrowest kind that fits every non-missing cell. All-missing columns are `Utf8`.
///
/// Cells spelling a non-finite float (`inf`, `-infinity`, `NaN`) do not vote; they read as
/// missing in numeric columns, so a column holding only such cells is `Float64`.
pub fn infer_column_kind<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> ColumnKind {
    let (mut int, mut float, mut boolean) = (true, true, true);
    let (mut seen, mut non_finite) = (false, false);
    for raw in cells.flatten().filter(|r| !is_na(r)) {
        let t = raw.trim();
        if t.parse::<f64>().is_ok_and(|v| !v.is_finite()) {
            non_finite = true;
            continue;
        }
        seen = true;
        int &= t.parse::<i64>().is_ok();
        float &= parse_finite(t).is_some();
        boolean &= parse_bool(t).is_some();
        if !(int || float || boolean) {
            break;
        }
    }

    match (seen, int, float, boolean) {
        (false, ..) if non_finite => ColumnKind::Float64,
        (false, ..) => ColumnKind::Utf8,
        (true, true, _, _) => ColumnKind::Int64,
        (true, false, true, _) => ColumnKind::Float64,
        (true, false, false, true) => ColumnKind::Bool,
        _ => ColumnKind::Utf8,
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
