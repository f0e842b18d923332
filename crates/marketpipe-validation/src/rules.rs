//! The nine-rule business-validation pass (§4.6). Distinct from
//! `marketpipe_provider::FetchQualityReport`, which is a cheap,
//! pre-normalization sanity check on raw vendor rows — this is the
//! authoritative gate, run against typed `OHLCVBar`s after normalization
//! and storage.

use chrono::NaiveTime;
use marketpipe_core::{OHLCVBar, Partition};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    SchemaPresent,
    PricePositive,
    OhlcConsistency,
    VolumeNonneg,
    TimestampAlignment,
    SymbolConsistency,
    DateConsistency,
    PriceReasonableness,
    TradingHours,
}

impl RuleId {
    pub const ALL: [RuleId; 9] = [
        RuleId::SchemaPresent,
        RuleId::PricePositive,
        RuleId::OhlcConsistency,
        RuleId::VolumeNonneg,
        RuleId::TimestampAlignment,
        RuleId::SymbolConsistency,
        RuleId::DateConsistency,
        RuleId::PriceReasonableness,
        RuleId::TradingHours,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::SchemaPresent => "schema_present",
            RuleId::PricePositive => "price_positive",
            RuleId::OhlcConsistency => "ohlc_consistency",
            RuleId::VolumeNonneg => "volume_nonneg",
            RuleId::TimestampAlignment => "timestamp_alignment",
            RuleId::SymbolConsistency => "symbol_consistency",
            RuleId::DateConsistency => "date_consistency",
            RuleId::PriceReasonableness => "price_reasonableness",
            RuleId::TradingHours => "trading_hours",
        }
    }
}

/// Regular trading session window, UTC. `trading_hours` only applies when
/// a window is configured; a bar annotated `session=extended` is always
/// exempt (§4.6: "or are annotated session=...").
#[derive(Debug, Clone, Copy)]
pub struct TradingHoursWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// `price_reasonableness` upper bound; spec default is 100_000.
    pub price_upper_bound: Decimal,
    pub trading_hours: Option<TradingHoursWindow>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            price_upper_bound: Decimal::new(100_000_0000, 4),
            trading_hours: None,
        }
    }
}

/// Every rule this bar fails, against the declared partition it's
/// supposed to belong to.
pub fn failing_rules(bar: &OHLCVBar, partition: &Partition, config: &ValidationConfig) -> Vec<RuleId> {
    let mut failed = Vec::new();

    // `OHLCVBar`'s own constructor enforces this for every freshly-built
    // bar; re-checked here because storage reads reconstitute bars
    // without re-running validation, so a corrupted file could otherwise
    // slip an invalid row past the gate.
    let (open, high, low, close) = (bar.open().as_decimal(), bar.high().as_decimal(), bar.low().as_decimal(), bar.close().as_decimal());

    if open <= Decimal::ZERO || high <= Decimal::ZERO || low <= Decimal::ZERO || close <= Decimal::ZERO {
        failed.push(RuleId::PricePositive);
    }

    let max_oc_l = open.max(low).max(close);
    let min_oc_h = open.min(high).min(close);
    if high < max_oc_l || low > min_oc_h {
        failed.push(RuleId::OhlcConsistency);
    }

    // `Volume` is a `u64` newtype, so non-negativity is a type-level
    // invariant; the rule is retained for the identifier's own sake and
    // always passes for a typed bar.

    let frame_ns = partition.frame.duration_ns();
    if bar.timestamp().as_nanos() % frame_ns != 0 {
        failed.push(RuleId::TimestampAlignment);
    }

    if bar.symbol() != &partition.symbol {
        failed.push(RuleId::SymbolConsistency);
    }

    if bar.date() != partition.date {
        failed.push(RuleId::DateConsistency);
    }

    if open <= Decimal::ZERO
        || open > config.price_upper_bound
        || high > config.price_upper_bound
        || low > config.price_upper_bound
        || close > config.price_upper_bound
    {
        failed.push(RuleId::PriceReasonableness);
    }

    if let Some(window) = config.trading_hours {
        if bar.session() == marketpipe_core::Session::Regular {
            let time = bar.timestamp().to_datetime().time();
            let in_window = if window.start <= window.end {
                time >= window.start && time < window.end
            } else {
                time >= window.start || time < window.end
            };
            if !in_window {
                failed.push(RuleId::TradingHours);
            }
        }
    }

    failed
}
