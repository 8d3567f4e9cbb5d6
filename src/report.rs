//! Console rendering of pipeline reports.
//!
//! Components return structured reports; this module is the only place that turns them into
//! text.

use std::fmt;

use crate::ingestion::SourceStatus;
use crate::pipeline::{FileOutcome, FileReport, MigrationSummary, QualityOutcome, QualityReport};
use crate::processing::NullRatio;

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let collection = self.collection.as_deref().unwrap_or("?");
        writeln!(f, "=== {} -> {} ===", self.key, collection)?;
        if let Some(format) = self.format {
            writeln!(f, "format: {format}")?;
        }
        match &self.outcome {
            FileOutcome::UnknownCollection => {
                writeln!(f, "no collection is defined for {}; skipped", self.key)
            }
            FileOutcome::Unreadable(SourceStatus::StorageUnavailable(reason)) => {
                writeln!(f, "cannot fetch {}: {reason}; skipped", self.key)
            }
            FileOutcome::Unreadable(SourceStatus::Unparseable(attempts)) => {
                writeln!(f, "cannot parse {}; skipped", self.key)?;
                for a in attempts {
                    writeln!(f, "  {}: {}", a.candidate, a.reason)?;
                }
                Ok(())
            }
            FileOutcome::Unreadable(SourceStatus::Parsed(_)) => Ok(()),
            FileOutcome::AllRowsMissing(clean) => writeln!(
                f,
                "all {} rows contain missing values for {collection}; skipped",
                clean.input_rows
            ),
            FileOutcome::Loaded { clean, load } => {
                writeln!(f, "{} rows removed for missing values", clean.removed)?;
                if load.attempted == 0 {
                    writeln!(f, "empty dataset for '{collection}', no document inserted")
                } else {
                    write!(f, "{} documents inserted into '{collection}'", load.inserted)?;
                    if load.rejected > 0 {
                        write!(f, " ({} rejected)", load.rejected)?;
                    }
                    writeln!(f)
                }
            }
            FileOutcome::LoadFailed { clean, error } => {
                writeln!(f, "{} rows removed for missing values", clean.removed)?;
                writeln!(f, "load into '{collection}' failed: {error}")
            }
        }
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let collection = self.collection.as_deref().unwrap_or("?");
        writeln!(f, "=== quality check {collection} ===")?;
        match &self.outcome {
            QualityOutcome::UnknownCollection => {
                writeln!(f, "no collection is defined for {}", self.key)
            }
            QualityOutcome::TargetUnavailable(reason) => {
                writeln!(f, "cannot read '{collection}': {reason}")
            }
            QualityOutcome::Compared {
                comparison,
                source_status,
            } => {
                if !matches!(source_status, SourceStatus::Parsed(_)) {
                    writeln!(f, "source {} could not be read; compared as empty", self.key)?;
                }
                writeln!(
                    f,
                    "source: {} rows | target: {} documents",
                    comparison.source_rows, comparison.target_rows
                )?;
                writeln!(f, "same columns: {}", comparison.columns_equal)?;
                if !comparison.source_only.is_empty() {
                    writeln!(f, "  only in source: {}", comparison.source_only.join(", "))?;
                }
                if !comparison.target_only.is_empty() {
                    writeln!(f, "  only in target: {}", comparison.target_only.join(", "))?;
                }
                if let Some(ratios) = &comparison.null_ratios {
                    writeln!(f, "missing values (%):")?;
                    write_ratios(f, ratios)?;
                }
                Ok(())
            }
        }
    }
}

fn write_ratios(f: &mut fmt::Formatter<'_>, ratios: &[NullRatio]) -> fmt::Result {
    let width = ratios.iter().map(|r| r.column.len()).max().unwrap_or(0);
    for r in ratios {
        writeln!(f, "  {:<width$}  {:>6.2}", r.column, percent(r.ratio))?;
    }
    Ok(())
}

/// Ratio as a percentage rounded to two decimals.
pub fn percent(ratio: f64) -> f64 {
    (ratio * 10_000.0).round() / 100.0
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            writeln!(f)?;
            write!(f, "{file}")?;
        }
        for q in &self.quality {
            writeln!(f)?;
            write!(f, "{q}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::LoadReport;
    use crate::processing::{CleanReport, Comparison};

    #[test]
    fn percent_rounds_to_two_decimals() {
        assert_eq!(percent(1.0 / 3.0), 33.33);
        assert_eq!(percent(0.0), 0.0);
    }

    #[test]
    fn loaded_file_reports_removed_and_inserted_counts() {
        let report = FileReport {
            key: "Data_JSON/Station/x.csv".to_string(),
            collection: Some("station".to_string()),
            format: None,
            outcome: FileOutcome::Loaded {
                clean: CleanReport { input_rows: 5, removed: 2 },
                load: LoadReport { attempted: 3, inserted: 2, rejected: 1 },
            },
        };
        let text = report.to_string();
        assert!(text.contains("2 rows removed for missing values"));
        assert!(text.contains("2 documents inserted into 'station' (1 rejected)"));
    }

    #[test]
    fn empty_target_omits_ratio_table() {
        let report = QualityReport {
            key: "k".to_string(),
            collection: Some("c".to_string()),
            outcome: QualityOutcome::Compared {
                comparison: Comparison {
                    source_rows: 5,
                    target_rows: 0,
                    columns_equal: false,
                    source_only: vec!["a".to_string()],
                    target_only: vec![],
                    null_ratios: None,
                },
                source_status: SourceStatus::Parsed(crate::ingestion::Candidate::Envelope),
            },
        };
        let text = report.to_string();
        assert!(text.contains("source: 5 rows | target: 0 documents"));
        assert!(text.contains("same columns: false"));
        assert!(!text.contains("missing values"));
    }
}
