//! Validation report rows (§3, §4.6): `(symbol, timestamp_ns, reason)`
//! plus the owning job id.

use crate::job::IngestionJobId;
use crate::symbol::Symbol;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReportRow {
    pub symbol: Symbol,
    pub timestamp_ns: i64,
    pub rule_id: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub rows: Vec<ValidationReportRow>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: ValidationReportRow) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// CSV filename per `(job_id, symbol)`, per §6: `<job_id>_<symbol>.csv`.
    pub fn file_name(job_id: &IngestionJobId, symbol: &Symbol) -> String {
        format!("{}_{}.csv", job_id.as_str(), symbol.as_str())
    }

    /// Render as CSV bytes: `symbol, ts_ns, reason`, UTF-8, LF line endings
    /// (§6 Validation report CSV).
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::WriterBuilder::new().terminator(csv::Terminator::Any(b'\n')).from_writer(Vec::new());
        writer.write_record(["symbol", "ts_ns", "reason"])?;
        for row in &self.rows {
            writer.write_record(&[row.symbol.to_string(), row.timestamp_ns.to_string(), row.rule_id.to_string()])?;
        }
        writer.into_inner().map_err(|e| e.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_has_expected_header_and_rows() {
        let mut report = ValidationReport::new();
        report.push(ValidationReportRow {
            symbol: Symbol::new("AAPL").unwrap(),
            timestamp_ns: 60_000_000_000,
            rule_id: "price_positive",
        });
        let csv = String::from_utf8(report.to_csv().unwrap()).unwrap();
        assert_eq!(csv, "symbol,ts_ns,reason\nAAPL,60000000000,price_positive\n");
    }

    #[test]
    fn empty_report_has_only_header() {
        let csv = String::from_utf8(ValidationReport::new().to_csv().unwrap()).unwrap();
        assert_eq!(csv, "symbol,ts_ns,reason\n");
    }
}
