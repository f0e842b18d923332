//! Fetch-quality report for a raw batch, computed before normalization.
//!
//! This is a cheap provider-side sanity pass (duplicate keys, out-of-order
//! timestamps, gaps against the expected per-frame step) used to decide
//! whether a fetch is worth handing to the normalizer and validation engine
//! at all. It is deliberately **not** the authoritative data-quality gate —
//! that is the nine-rule pass in `marketpipe-validation`, which runs after
//! normalization against typed `OHLCVBar`s.

use std::collections::BTreeMap;
use std::fmt;

use crate::provider::RawBar;

fn expected_step_secs(timeframe: &str) -> Option<i64> {
    match timeframe.to_ascii_lowercase().as_str() {
        "1m" => Some(60),
        "5m" => Some(300),
        "15m" => Some(900),
        "1h" => Some(3_600),
        "1d" => Some(86_400),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BarKey {
    pub symbol: String,
    pub timeframe: String,
    pub end_ts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeriesKey {
    pub symbol: String,
    pub timeframe: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateIssue {
    pub key: BarKey,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapIssue {
    pub series: SeriesKey,
    pub prev_end_ts: i64,
    pub next_end_ts: i64,
    pub delta_secs: i64,
    pub expected_step_secs: i64,
}

#[derive(Debug, Clone)]
pub struct FetchQualityReport {
    pub total_bars: usize,
    pub incomplete_bars: usize,
    pub duplicates: Vec<DuplicateIssue>,
    pub gaps: Vec<GapIssue>,
}

impl FetchQualityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.gaps.is_empty()
    }
}

impl fmt::Display for FetchQualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FetchQualityReport {{ total={}, incomplete={}, duplicates={}, gaps={} }}",
            self.total_bars,
            self.incomplete_bars,
            self.duplicates.len(),
            self.gaps.len()
        )
    }
}

/// Build a [`FetchQualityReport`] from a raw fetch batch. Deterministic
/// regardless of input order.
pub fn build_fetch_quality_report(bars: &[RawBar]) -> FetchQualityReport {
    let total_bars = bars.len();
    let incomplete_bars = bars.iter().filter(|b| !b.is_complete).count();

    let mut key_counts: BTreeMap<BarKey, usize> = BTreeMap::new();
    for bar in bars {
        let key = BarKey { symbol: bar.symbol.clone(), timeframe: bar.timeframe.clone(), end_ts: bar.end_ts };
        *key_counts.entry(key).or_insert(0) += 1;
    }
    let duplicates: Vec<DuplicateIssue> =
        key_counts.into_iter().filter(|(_, c)| *c >= 2).map(|(key, count)| DuplicateIssue { key, count }).collect();

    let mut series_map: BTreeMap<SeriesKey, Vec<i64>> = BTreeMap::new();
    for bar in bars {
        let sk = SeriesKey { symbol: bar.symbol.clone(), timeframe: bar.timeframe.clone() };
        series_map.entry(sk).or_default().push(bar.end_ts);
    }
    for timestamps in series_map.values_mut() {
        timestamps.sort_unstable();
    }

    let mut gaps = Vec::new();
    for (series, timestamps) in &series_map {
        let Some(step) = expected_step_secs(&series.timeframe) else { continue };
        for window in timestamps.windows(2) {
            let (prev, next) = (window[0], window[1]);
            if next > prev && next - prev > step {
                gaps.push(GapIssue {
                    series: series.clone(),
                    prev_end_ts: prev,
                    next_end_ts: next,
                    delta_secs: next - prev,
                    expected_step_secs: step,
                });
            }
        }
    }

    FetchQualityReport { total_bars, incomplete_bars, duplicates, gaps }
}
