//! Half-open `[start, end)` time range.

use crate::error::ValidationError;
use crate::timestamp::Timestamp;

const NANOS_PER_DAY: i64 = 86_400_000_000_000;

/// Half-open `[start, end)` pair of [`Timestamp`]s with `start < end`.
///
/// Spans at most [`TimeRange::DEFAULT_MAX_SPAN_DAYS`] days by default.
/// Open Question (spec.md §9) resolved: the bound is a configurable
/// constructor parameter, defaulting to 730, rather than a hardwired
/// domain constant — see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: Timestamp,
    end: Timestamp,
}

impl TimeRange {
    pub const DEFAULT_MAX_SPAN_DAYS: i64 = 730;

    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, ValidationError> {
        Self::new_with_max_span(start, end, Self::DEFAULT_MAX_SPAN_DAYS)
    }

    pub fn new_with_max_span(
        start: Timestamp,
        end: Timestamp,
        max_span_days: i64,
    ) -> Result<Self, ValidationError> {
        if start.as_nanos() >= end.as_nanos() {
            return Err(ValidationError::new(
                "time_range",
                "start_before_end",
                format!("start ({start}) must be < end ({end})"),
            ));
        }

        let span_ns = end.as_nanos() - start.as_nanos();
        let max_span_ns = max_span_days.saturating_mul(NANOS_PER_DAY);
        if span_ns > max_span_ns {
            return Err(ValidationError::new(
                "time_range",
                "max_span",
                format!("range spans more than {max_span_days} days"),
            ));
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        ts.as_nanos() >= self.start.as_nanos() && ts.as_nanos() < self.end.as_nanos()
    }
}
