//! Row filtering for [`crate::types::DataSet`].

use crate::types::{DataSet, Record};

/// Returns a new [`DataSet`] containing only rows for which `predicate` returns `true`.
///
/// This is a convenience wrapper around [`DataSet::filter_rows`].
pub fn filter<F>(dataset: &DataSet, predicate: F) -> DataSet
where
    F: FnMut(&Record) -> bool,
{
    dataset.filter_rows(predicate)
}

#[cfg(test)]
mod tests {
    use super::filter;
    use crate::types::{DataSet, Record, Value};

    fn sample_dataset() -> DataSet {
        DataSet::new(vec![
            Record::from_iter([("id", Value::Int64(1)), ("station", Value::Utf8("a".to_string()))]),
            Record::from_iter([("id", Value::Int64(2)), ("station", Value::Utf8("b".to_string()))]),
            Record::from_iter([("id", Value::Int64(3)), ("station", Value::Utf8("c".to_string()))]),
        ])
    }

    #[test]
    fn filter_rows_by_numeric_predicate() {
        let ds = sample_dataset();

        let out = ds.filter_rows(|row| matches!(row.get("id"), Some(Value::Int64(v)) if *v > 1));

        assert_eq!(out.columns(), ds.columns());
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.rows[0].get("station"), Some(&Value::Utf8("b".to_string())));
        // Original unchanged
        assert_eq!(ds.row_count(), 3);
    }

    #[test]
    fn filter_can_return_empty_dataset_with_columns() {
        let ds = sample_dataset();
        let out = filter(&ds, |_| false);
        assert_eq!(out.columns(), ds.columns());
        assert!(out.rows.is_empty());
    }
}
