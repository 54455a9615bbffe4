//! Run summary written next to the merged output

use crate::engine::MergeOutcome;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Counts and timing of one merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    pub base_rows: usize,
    pub input_rows: usize,
    pub output_rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub ambiguous_rows_removed: usize,
    /// Join fragments as text, in evaluation order
    pub fragments: Vec<String>,
    pub elapsed_ms: u64,
}

impl MergeReport {
    pub fn new(outcome: &MergeOutcome, input_rows: usize, elapsed: Duration) -> Self {
        Self {
            generated_at: Utc::now(),
            base_rows: outcome.matched_rows + outcome.unmatched_rows,
            input_rows,
            output_rows: outcome.table.row_count(),
            matched_rows: outcome.matched_rows,
            unmatched_rows: outcome.unmatched_rows,
            ambiguous_rows_removed: outcome.ambiguous_rows_removed,
            fragments: outcome.plan.fragments.iter().map(|f| f.to_string()).collect(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Load a report from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the report to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JoinFieldSpec;
    use crate::engine::launch;
    use crate::table::{CellValue, Table};

    #[test]
    fn test_report_from_outcome() {
        let mut base = Table::with_columns("base", &["Id"]);
        base.push_row(vec![CellValue::Integer(1)]);
        base.push_row(vec![CellValue::Integer(2)]);
        let mut input = Table::with_columns("input", &["Id", "Value"]);
        input.push_row(vec![CellValue::Integer(1), "x".into()]);

        let outcome = launch(
            &base,
            &input,
            &["Value".to_string()],
            &[JoinFieldSpec::equality("Id", "Id")],
        )
        .unwrap();
        let report = MergeReport::new(&outcome, input.row_count(), Duration::from_millis(12));

        assert_eq!(report.base_rows, 2);
        assert_eq!(report.output_rows, 2);
        assert_eq!(report.matched_rows, 1);
        assert_eq!(report.unmatched_rows, 1);
        assert_eq!(report.fragments, vec!["base.'Id' = input.'Id'"]);
        assert_eq!(report.elapsed_ms, 12);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save(&path).unwrap();
        assert_eq!(MergeReport::load(&path).unwrap(), report);
    }
}
