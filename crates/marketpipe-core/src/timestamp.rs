//! Absolute UTC instant, nanosecond resolution.
//!
//! Internal canonical form is nanoseconds-since-epoch as a signed 64-bit
//! integer, matching the Parquet `timestamp` column's semantic type (§6).

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ValidationError;

pub const NANOS_PER_MINUTE: i64 = 60_000_000_000;

/// UTC instant, stored as nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    /// Construct from a [`DateTime<Utc>`], truncating to nanosecond precision.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_nanos_opt().unwrap_or(0))
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0 / 1_000_000_000, (self.0.rem_euclid(1_000_000_000)) as u32)
            .unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap())
    }

    /// `true` when this instant aligns to a 1-minute boundary, i.e.
    /// `ns % 60_000_000_000 == 0` (§3 OHLCVBar invariant).
    pub fn is_minute_aligned(&self) -> bool {
        self.0 % NANOS_PER_MINUTE == 0
    }

    pub fn require_minute_aligned(&self) -> Result<(), ValidationError> {
        if self.is_minute_aligned() {
            Ok(())
        } else {
            Err(ValidationError::new(
                "timestamp",
                "timestamp_alignment",
                format!("timestamp {} is not aligned to a minute boundary", self.0),
            ))
        }
    }

    /// The UTC calendar date this instant falls on (the "trading date").
    pub fn date(&self) -> NaiveDate {
        self.to_datetime().date_naive()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().to_rfc3339())
    }
}
