//! CSV report persistence (§4.6, §6): one file per `(job_id, symbol)`,
//! atomic replace — written to a temp file and renamed into place, the
//! same write-then-rename discipline the teacher uses for run artifacts.

use std::path::Path;

use marketpipe_core::{IngestionJobId, Symbol, ValidationReport};

use crate::error::ValidationEngineError;

pub fn write_report(
    report_dir: &Path,
    job_id: &IngestionJobId,
    symbol: &Symbol,
    report: &ValidationReport,
) -> Result<std::path::PathBuf, ValidationEngineError> {
    std::fs::create_dir_all(report_dir).map_err(|e| ValidationEngineError::Io {
        path: report_dir.to_path_buf(),
        source: e,
    })?;

    let file_name = ValidationReport::file_name(job_id, symbol);
    let final_path = report_dir.join(&file_name);
    let tmp_path = report_dir.join(format!("{file_name}.tmp"));

    let csv = report.to_csv()?;
    std::fs::write(&tmp_path, csv).map_err(|e| ValidationEngineError::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, &final_path).map_err(|e| ValidationEngineError::Io {
        path: final_path.clone(),
        source: e,
    })?;

    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use marketpipe_core::ValidationReportRow;
    use tempfile::tempdir;

    #[test]
    fn writes_csv_with_expected_name() {
        let dir = tempdir().unwrap();
        let symbol = Symbol::new("AAPL").unwrap();
        let job_id = IngestionJobId::new(&symbol, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        let mut report = ValidationReport::new();
        report.push(ValidationReportRow { symbol: symbol.clone(), timestamp_ns: 60_000_000_000, rule_id: "price_positive" });

        let path = write_report(dir.path(), &job_id, &symbol, &report).unwrap();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "AAPL_2025-01-02_AAPL.csv");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("price_positive"));
    }
}
