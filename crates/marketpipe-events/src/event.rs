//! Sealed event variants (§4.7). Every event carries an `event_id`,
//! `occurred_at`, an `aggregate_id`, and a payload (the [`EventKind`]).

use chrono::{DateTime, Utc};
use marketpipe_core::{Frame, IngestionJobId, Symbol, Timestamp};
use uuid::Uuid;

/// Validation Engine's outcome, restated here rather than depending on
/// `marketpipe-validation` directly — the event bus is lower in the
/// dependency graph than the components that publish to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSummaryPayload {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    IngestionJobCompleted { job_id: IngestionJobId, symbols: Vec<Symbol>, bar_count: u64 },
    IngestionJobFailed { job_id: IngestionJobId, reason: String },
    ValidationCompleted { job_id: IngestionJobId, summary: ValidationSummaryPayload },
    ValidationFailed { job_id: IngestionJobId, reason: String },
    AggregationCompleted { job_id: IngestionJobId, frames: Vec<Frame> },
    AggregationFailed { job_id: IngestionJobId, reason: String },
    DataPruned { data_type: String, amount: u64, cutoff: Timestamp },
}

impl EventKind {
    /// Stable discriminant used as the `EventBus` subscription key.
    pub fn discriminant(&self) -> &'static str {
        match self {
            EventKind::IngestionJobCompleted { .. } => "ingestion_job_completed",
            EventKind::IngestionJobFailed { .. } => "ingestion_job_failed",
            EventKind::ValidationCompleted { .. } => "validation_completed",
            EventKind::ValidationFailed { .. } => "validation_failed",
            EventKind::AggregationCompleted { .. } => "aggregation_completed",
            EventKind::AggregationFailed { .. } => "aggregation_failed",
            EventKind::DataPruned { .. } => "data_pruned",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub aggregate_id: String,
    pub kind: EventKind,
}

impl Event {
    pub fn new(aggregate_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            aggregate_id: aggregate_id.into(),
            kind,
        }
    }
}
