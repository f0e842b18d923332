//! Canonical normalization boundary (§4.3, §4.6): converts a [`RawBar`] as
//! returned by a vendor into a [`marketpipe_core::OHLCVBar`]. This is the
//! only place a raw vendor row is allowed to cross into the rest of the
//! system; nothing downstream ever sees a provider's untyped response shape.

use std::fmt;

use marketpipe_core::{BarStatus, Frame, NewBar, OHLCVBar, Price, Session, Symbol, Timestamp, ValidationError};

use crate::provider::RawBar;

/// Errors produced while normalizing a [`RawBar`].
#[derive(Debug)]
pub enum NormalizationError {
    Validation(ValidationError),
    UnknownTimeframe(String),
}

impl fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationError::Validation(e) => write!(f, "{e}"),
            NormalizationError::UnknownTimeframe(tf) => write!(f, "unrecognized timeframe '{tf}'"),
        }
    }
}

impl std::error::Error for NormalizationError {}

impl From<ValidationError> for NormalizationError {
    fn from(e: ValidationError) -> Self {
        NormalizationError::Validation(e)
    }
}

/// Normalize a single [`RawBar`] into an [`OHLCVBar`].
///
/// `source` is the vendor name recorded on the bar for provenance; `currency`
/// defaults to `"USD"` since none of the onboarded vendors report one.
pub fn normalize(bar: &RawBar, source: &'static str) -> Result<OHLCVBar, NormalizationError> {
    let frame = Frame::parse(&bar.timeframe.to_ascii_lowercase())
        .map_err(|_| NormalizationError::UnknownTimeframe(bar.timeframe.clone()))?;
    let symbol = Symbol::new(&bar.symbol)?;
    let timestamp = Timestamp::from_datetime(
        chrono::DateTime::from_timestamp(bar.end_ts, 0).ok_or_else(|| {
            ValidationError::new("end_ts", "range", format!("epoch seconds {} out of range", bar.end_ts))
        })?,
    );
    let open = Price::parse(&bar.open)?;
    let high = Price::parse(&bar.high)?;
    let low = Price::parse(&bar.low)?;
    let close = Price::parse(&bar.close)?;
    let volume = marketpipe_core::Volume::new(bar.volume)?;

    let status = if bar.is_complete { BarStatus::Ok } else { BarStatus::Suspect };
    let ohlcv = OHLCVBar::new(NewBar {
        symbol,
        timestamp,
        open,
        high,
        low,
        close,
        volume,
        trade_count: None,
        vwap: None,
        session: Session::Regular,
        currency: "USD".to_string(),
        status,
        source: source.to_string(),
        frame,
    })?;
    Ok(ohlcv)
}

/// Normalize a batch, collecting all errors instead of short-circuiting on
/// the first one. Returns `(bars, errors)` so a caller can persist what
/// normalized cleanly and report the rest.
pub fn normalize_all(bars: &[RawBar], source: &'static str) -> (Vec<OHLCVBar>, Vec<(usize, NormalizationError)>) {
    let mut ok = Vec::with_capacity(bars.len());
    let mut errs = Vec::new();
    for (idx, bar) in bars.iter().enumerate() {
        match normalize(bar, source) {
            Ok(b) => ok.push(b),
            Err(e) => errs.push((idx, e)),
        }
    }
    (ok, errs)
}

/// Sort normalized bars by `(symbol, timestamp)`, the canonical storage order.
pub fn sort_normalized(bars: &mut [OHLCVBar]) {
    bars.sort_by(|a, b| a.symbol().cmp(b.symbol()).then_with(|| a.timestamp().as_nanos().cmp(&b.timestamp().as_nanos())));
}
