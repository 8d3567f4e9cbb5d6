//! Source/target comparison.

use serde::Serialize;

use crate::types::DataSet;

/// Share of rows missing a value for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NullRatio {
    pub column: String,
    /// Fraction in `[0, 1]`.
    pub ratio: f64,
}

/// Read-only comparison of a source dataset against the documents stored from it.
///
/// The loader only writes cleaned rows, so row counts and null ratios are expected to differ
/// from the raw source whenever cleaning dropped anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Rows in the raw (uncleaned) source.
    pub source_rows: usize,
    /// Documents in the target collection.
    pub target_rows: usize,
    /// Column-name sets are equal, ignoring order.
    pub columns_equal: bool,
    /// Columns only the source has, in source order.
    pub source_only: Vec<String>,
    /// Columns only the target has, in target order.
    pub target_only: Vec<String>,
    /// Per target column, `None` when the target is empty.
    pub null_ratios: Option<Vec<NullRatio>>,
}

/// Compare `source` against `target`.
pub fn compare(source: &DataSet, target: &DataSet) -> Comparison {
    let source_set = source.column_set();
    let target_set = target.column_set();

    Comparison {
        source_rows: source.row_count(),
        target_rows: target.row_count(),
        columns_equal: source_set == target_set,
        source_only: source
            .columns()
            .iter()
            .filter(|c| !target_set.contains(c.as_str()))
            .cloned()
            .collect(),
        target_only: target
            .columns()
            .iter()
            .filter(|c| !source_set.contains(c.as_str()))
            .cloned()
            .collect(),
        null_ratios: null_ratios(target),
    }
}

/// Fraction of rows per column whose value is null or absent. `None` for an empty dataset.
pub fn null_ratios(dataset: &DataSet) -> Option<Vec<NullRatio>> {
    if dataset.is_empty() {
        return None;
    }
    let total = dataset.row_count() as f64;
    Some(
        dataset
            .columns()
            .iter()
            .map(|column| {
                let missing = dataset
                    .rows
                    .iter()
                    .filter(|row| row.get(column).is_none_or(|v| v.is_null()))
                    .count();
                NullRatio {
                    column: column.clone(),
                    ratio: missing as f64 / total,
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Record, Value};

    fn rows(n: i64) -> DataSet {
        DataSet::new(
            (0..n)
                .map(|i| Record::from_iter([("a", Value::Int64(i)), ("b", Value::Int64(i))]))
                .collect(),
        )
    }

    #[test]
    fn empty_target_skips_null_ratios_and_columns_differ() {
        let c = compare(&rows(5), &DataSet::empty());
        assert_eq!(c.source_rows, 5);
        assert_eq!(c.target_rows, 0);
        assert!(!c.columns_equal);
        assert_eq!(c.source_only, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(c.null_ratios, None);
    }

    #[test]
    fn column_sets_compare_order_insensitively() {
        let target = DataSet::new(vec![Record::from_iter([
            ("b", Value::Int64(1)),
            ("a", Value::Int64(1)),
        ])]);
        let c = compare(&rows(2), &target);
        assert!(c.columns_equal);
        assert!(c.source_only.is_empty() && c.target_only.is_empty());
    }

    #[test]
    fn absent_and_null_values_count_as_missing() {
        let target = DataSet::new(vec![
            Record::from_iter([("a", Value::Int64(1)), ("b", Value::Null)]),
            Record::from_iter([("a", Value::Int64(2))]),
            Record::from_iter([("a", Value::Int64(3)), ("b", Value::Int64(4))]),
            Record::from_iter([("a", Value::Null), ("b", Value::Int64(5))]),
        ]);
        let ratios = null_ratios(&target).unwrap();
        assert_eq!(
            ratios,
            vec![
                NullRatio { column: "a".to_string(), ratio: 0.25 },
                NullRatio { column: "b".to_string(), ratio: 0.5 },
            ]
        );
    }
}
