//! Enveloped-JSON ingestion.
//!
//! Some ingestion pipelines (Airbyte raw tables, for instance) export every source row as a
//! JSON object stored in a single reserved column, next to bookkeeping columns such as
//! `_airbyte_raw_id` or `_airbyte_extracted_at`. Only the reserved column is read here; each
//! object is flattened into a [`Record`] using dot-joined key paths.

use crate::error::{MigrationError, MigrationResult};
use crate::types::{DataSet, Record, Value};

use super::csv::read_raw_table;

/// Reserved column holding one JSON-encoded object per row.
pub const ENVELOPE_COLUMN: &str = "_airbyte_data";

/// Parse an enveloped export into a flattened [`DataSet`].
///
/// Fails if the reserved column is absent, a cell is empty or not a JSON object, or the
/// payload has no data rows.
pub fn parse_envelope(bytes: &[u8], limit: Option<usize>) -> MigrationResult<DataSet> {
    let table = read_raw_table(bytes, b',', limit)?;
    let idx = table
        .column_index(ENVELOPE_COLUMN)
        .ok_or_else(|| MigrationError::Envelope {
            message: format!("missing column '{ENVELOPE_COLUMN}'. headers={:?}", table.headers),
        })?;

    let mut rows = Vec::with_capacity(table.rows.len());
    for row_idx0 in 0..table.rows.len() {
        let user_row = row_idx0 + 2;
        let cell = table.cell(row_idx0, idx).unwrap_or("");
        if cell.trim().is_empty() {
            return Err(MigrationError::Envelope {
                message: format!("row {user_row}: empty '{ENVELOPE_COLUMN}' cell"),
            });
        }

        let decoded: serde_json::Value =
            serde_json::from_str(cell).map_err(|e| MigrationError::Envelope {
                message: format!("row {user_row}: invalid json: {e}"),
            })?;
        match decoded {
            serde_json::Value::Object(obj) => rows.push(flatten_object(&obj)),
            other => {
                return Err(MigrationError::Envelope {
                    message: format!(
                        "row {user_row}: expected a json object, found {}",
                        json_kind(&other)
                    ),
                });
            }
        }
    }

    if rows.is_empty() {
        return Err(MigrationError::Envelope {
            message: "no data rows".to_string(),
        });
    }
    Ok(DataSet::new(rows))
}

/// Flatten a JSON object into a [`Record`] with dot-joined key paths.
///
/// `{"a":{"b":1},"c":2}` becomes `a.b = 1, c = 2`. An empty nested object yields `Null` for
/// its own path; arrays are kept as JSON text. Already-flat objects are returned unchanged.
pub fn flatten_object(obj: &serde_json::Map<String, serde_json::Value>) -> Record {
    let mut record = Record::new();
    flatten_into(&mut record, None, obj);
    record
}

fn flatten_into(
    out: &mut Record,
    prefix: Option<&str>,
    obj: &serde_json::Map<String, serde_json::Value>,
) {
    for (key, value) in obj {
        let path = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            serde_json::Value::Object(inner) if !inner.is_empty() => {
                flatten_into(out, Some(&path), inner)
            }
            serde_json::Value::Object(_) => {
                out.insert(path, Value::Null);
            }
            scalar => {
                out.insert(path, Value::from_json(scalar));
            }
        }
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(v: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match v {
            serde_json::Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn flat_object_is_unchanged() {
        let r = flatten_object(&object(json!({"x": 1})));
        assert_eq!(r, Record::from_iter([("x", Value::Int64(1))]));
    }

    #[test]
    fn nested_objects_use_dot_paths() {
        let r = flatten_object(&object(json!({"a": {"b": {"c": "deep"}}, "d": 2.5})));
        assert_eq!(r.get("a.b.c"), Some(&Value::Utf8("deep".to_string())));
        assert_eq!(r.get("d"), Some(&Value::Float64(2.5)));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn arrays_are_kept_as_json_text_and_empty_objects_as_null() {
        let r = flatten_object(&object(json!({"tags": [1, 2], "meta": {}})));
        assert_eq!(r.get("tags"), Some(&Value::Utf8("[1,2]".to_string())));
        assert_eq!(r.get("meta"), Some(&Value::Null));
    }

    #[test]
    fn flattened_path_colliding_with_dotted_key_keeps_one_column() {
        let r = flatten_object(&object(json!({"a.b": 1, "a": {"b": 2}})));
        assert_eq!(r.len(), 1);
        assert_eq!(r.get("a.b"), Some(&Value::Int64(2)));
    }

    #[test]
    fn extra_bookkeeping_columns_are_ignored() {
        let input = b"_airbyte_raw_id,_airbyte_data\nabc,\"{\"\"t\"\":12.5}\"\n";
        let ds = parse_envelope(input, None).unwrap();
        assert_eq!(ds.columns(), &["t".to_string()]);
        assert_eq!(ds.rows[0].get("t"), Some(&Value::Float64(12.5)));
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = parse_envelope(b"_airbyte_data\n42\n", None).unwrap_err();
        assert!(err.to_string().contains("expected a json object"));
    }

    #[test]
    fn plain_text_cells_are_rejected() {
        let err = parse_envelope(b"_airbyte_data\nhello\n", None).unwrap_err();
        assert!(err.to_string().contains("invalid json"));
    }

    #[test]
    fn missing_column_is_rejected() {
        let err = parse_envelope(b"a,b\n1,2\n", None).unwrap_err();
        assert!(err.to_string().contains("missing column '_airbyte_data'"));
    }
}
