//! marketpipe-validation
//!
//! The authoritative business-rule validation pass (§4.6): verifies the
//! bars in a completed job's partitions conform to schema and business
//! rules, and materializes a human-legible CSV failure report per
//! `(job_id, symbol)`. Validation never deletes data; it classifies.

pub mod error;
pub mod report;
pub mod rules;

use std::collections::HashMap;
use std::path::Path;

use marketpipe_core::{Frame, IngestionJob, Partition, ValidationReport, ValidationReportRow};
use marketpipe_storage::StorageEngine;

pub use error::ValidationEngineError;
pub use rules::{RuleId, TradingHoursWindow, ValidationConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed_by_rule: HashMap<&'static str, usize>,
}

/// Validate every symbol in `job`'s `1m` partition for its trading date,
/// writing one CSV report per symbol into `report_dir` and returning the
/// aggregate summary (§4.6 `validate_job`).
pub fn validate_job(
    storage: &StorageEngine,
    report_dir: &Path,
    job: &IngestionJob,
    config: &ValidationConfig,
) -> Result<ValidationSummary, ValidationEngineError> {
    let mut summary = ValidationSummary::default();

    for symbol in job.symbols() {
        let partition = Partition::new(Frame::M1, symbol.clone(), job.trading_date());
        let bars = storage.read(Frame::M1, symbol, job.trading_date(), job.trading_date())?;

        let mut report = ValidationReport::new();
        for bar in &bars {
            let failed = rules::failing_rules(bar, &partition, config);
            summary.total += 1;
            if failed.is_empty() {
                summary.passed += 1;
            } else {
                for rule in &failed {
                    *summary.failed_by_rule.entry(rule.as_str()).or_insert(0) += 1;
                }
                // one row per failing rule, matching the report's
                // `(symbol, timestamp_ns, rule_id)` shape
                for rule in &failed {
                    report.push(ValidationReportRow {
                        symbol: symbol.clone(),
                        timestamp_ns: bar.timestamp().as_nanos(),
                        rule_id: rule.as_str(),
                    });
                }
            }
        }

        report::write_report(report_dir, job.id(), symbol, &report)?;
    }

    Ok(summary)
}
