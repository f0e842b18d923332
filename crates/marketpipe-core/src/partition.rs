//! Frame identifiers and partition identity (§3, §6).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::symbol::Symbol;

/// Bar timeframe. Ordered coarsest-last for readability; `Ord` is not
/// semantically meaningful beyond enum declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Frame {
    M1,
    M5,
    M15,
    H1,
    D1,
}

impl Frame {
    pub const ALL: [Frame; 5] = [Frame::M1, Frame::M5, Frame::M15, Frame::H1, Frame::D1];

    /// Target frames materialized by the Aggregation Engine from `M1` (§4.8).
    pub const AGGREGATION_TARGETS: [Frame; 4] = [Frame::M5, Frame::M15, Frame::H1, Frame::D1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frame::M1 => "1m",
            Frame::M5 => "5m",
            Frame::M15 => "15m",
            Frame::H1 => "1h",
            Frame::D1 => "1d",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "1m" => Ok(Frame::M1),
            "5m" => Ok(Frame::M5),
            "15m" => Ok(Frame::M15),
            "1h" => Ok(Frame::H1),
            "1d" => Ok(Frame::D1),
            other => Err(ValidationError::new(
                "frame",
                "known_frame",
                format!("unknown frame '{other}'"),
            )),
        }
    }

    /// Bucket width in nanoseconds.
    pub fn duration_ns(&self) -> i64 {
        match self {
            Frame::M1 => 60_000_000_000,
            Frame::M5 => 5 * 60_000_000_000,
            Frame::M15 => 15 * 60_000_000_000,
            Frame::H1 => 3_600_000_000_000,
            Frame::D1 => 86_400_000_000_000,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `(frame, symbol, trading_date)` triple identifying one partition
/// directory (§4.5, §6).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    pub frame: Frame,
    pub symbol: Symbol,
    pub date: NaiveDate,
}

impl Partition {
    pub fn new(frame: Frame, symbol: Symbol, date: NaiveDate) -> Self {
        Self { frame, symbol, date }
    }

    /// Relative path `frame=<frame>/symbol=<SYMBOL>/date=<YYYY-MM-DD>`
    /// (§6 Hive-style layout), without the root or file name.
    pub fn relative_dir(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(format!("frame={}", self.frame))
            .join(format!("symbol={}", self.symbol))
            .join(format!("date={}", self.date.format("%Y-%m-%d")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_roundtrips() {
        for f in Frame::ALL {
            assert_eq!(Frame::parse(f.as_str()).unwrap(), f);
        }
    }

    #[test]
    fn relative_dir_is_hive_style() {
        let p = Partition::new(
            Frame::M1,
            Symbol::new("AAPL").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        );
        assert_eq!(
            p.relative_dir(),
            std::path::PathBuf::from("frame=1m/symbol=AAPL/date=2025-01-02")
        );
    }
}
