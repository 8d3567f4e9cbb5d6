//! Core data model types.
//!
//! Sources are materialized into an in-memory [`DataSet`]: an ordered list of [`Record`]s,
//! each an ordered column-name → [`Value`] mapping. Records produced from enveloped JSON may
//! carry different column sets, so the dataset also tracks the union of column names in
//! first-appearance order.

use std::collections::BTreeSet;

/// A store-native document (a JSON object).
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A single scalar value in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert a decoded JSON scalar into a [`Value`].
    ///
    /// Arrays and objects are kept as their compact JSON text; callers that want nested objects
    /// expanded should flatten first (see [`crate::ingestion::envelope::flatten_object`]).
    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int64(i)
                } else {
                    n.as_f64().map(Value::Float64).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::Utf8(s.clone()),
            other => Value::Utf8(other.to_string()),
        }
    }

    /// Convert into the store-native JSON form. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int64(v) => serde_json::Value::from(*v),
            Value::Float64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Utf8(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// An ordered column-name → value mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column` to `value`, replacing an existing entry in place.
    ///
    /// Returns the replaced value. A replacement means two source fields share a column name
    /// (a repeated header, or a flattened path colliding with a literal dotted key), so it is
    /// logged.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) -> Option<Value> {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => {
                tracing::warn!(column = %column, "repeated column name, earlier value replaced");
                Some(std::mem::replace(slot, value))
            }
            None => {
                self.fields.push((column, value));
                None
            }
        }
    }

    /// Value for `column`, if the record has it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Column names in record order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// `(column, value)` pairs in record order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, v)| (name.as_str(), v))
    }

    /// Number of columns in this record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `true` if any of the record's own columns holds [`Value::Null`].
    pub fn has_missing(&self) -> bool {
        self.fields.iter().any(|(_, v)| v.is_null())
    }

    /// Convert into a store-native [`Document`].
    pub fn to_document(&self) -> Document {
        self.fields
            .iter()
            .map(|(name, v)| (name.clone(), v.to_json()))
            .collect()
    }

    /// Build a record from a stored document, keeping its key order.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            fields: doc
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// In-memory tabular dataset materialized from one source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    columns: Vec<String>,
    /// Records in source order.
    pub rows: Vec<Record>,
}

impl DataSet {
    /// Create a dataset from records; the column list is the union of record columns.
    pub fn new(rows: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for name in row.columns() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_owned());
                }
            }
        }
        Self { columns, rows }
    }

    /// Create a dataset with an explicit column list (e.g. CSV headers), which may include
    /// columns no record carries.
    pub fn with_columns(columns: Vec<String>, rows: Vec<Record>) -> Self {
        let mut ds = Self::new(rows);
        let mut ordered = columns;
        for c in ds.columns.drain(..) {
            if !ordered.contains(&c) {
                ordered.push(c);
            }
        }
        ds.columns = ordered;
        ds
    }

    /// An empty dataset (no columns, no rows).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Column names in first-appearance order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column names as an order-insensitive set.
    pub fn column_set(&self) -> BTreeSet<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Create a new dataset containing only rows that match `predicate`.
    ///
    /// The returned dataset keeps the original column list.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Record) -> bool,
    {
        let rows = self.rows.iter().filter(|row| predicate(row)).cloned().collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Convert every record into a store-native [`Document`].
    pub fn to_documents(&self) -> Vec<Document> {
        self.rows.iter().map(Record::to_document).collect()
    }

    /// Build a dataset from stored documents.
    pub fn from_documents(docs: &[Document]) -> Self {
        Self::new(docs.iter().map(Record::from_document).collect())
    }
}
