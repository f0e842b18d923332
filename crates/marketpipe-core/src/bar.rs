//! The central `OHLCVBar` entity (§3) and its canonical-schema companions
//! (§6 column schema: session, currency, status, source, frame,
//! schema_version).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::partition::Frame;
use crate::price::Price;
use crate::symbol::Symbol;
use crate::timestamp::Timestamp;
use crate::volume::Volume;

pub const SCHEMA_VERSION: i32 = 1;

/// Trading session annotation (§4.6 `trading_hours` rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Session {
    Regular,
    Extended,
}

impl Session {
    pub fn as_str(&self) -> &'static str {
        match self {
            Session::Regular => "regular",
            Session::Extended => "extended",
        }
    }
}

/// Per-row data-quality status, independent of the validation report
/// (§4.6): `Suspect` rows are still persisted, just flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarStatus {
    Ok,
    Suspect,
}

impl BarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarStatus::Ok => "ok",
            BarStatus::Suspect => "suspect",
        }
    }
}

/// One (open, high, low, close, volume) tuple for one symbol over one
/// `frame`-length interval, normalized to the canonical OHLCV v1 schema.
///
/// Immutable after construction; all invariants are enforced once, at
/// construction time, by [`OHLCVBar::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct OHLCVBar {
    id: Uuid,
    symbol: Symbol,
    timestamp: Timestamp,
    open: Price,
    high: Price,
    low: Price,
    close: Price,
    volume: Volume,
    trade_count: Option<u64>,
    vwap: Option<Price>,
    session: Session,
    currency: String,
    status: BarStatus,
    source: String,
    frame: Frame,
    schema_version: i32,
}

/// Construction arguments for [`OHLCVBar::new`], grouped so the call site
/// doesn't need a fourteen-argument function.
pub struct NewBar {
    pub symbol: Symbol,
    pub timestamp: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Volume,
    pub trade_count: Option<u64>,
    pub vwap: Option<Price>,
    pub session: Session,
    pub currency: String,
    pub status: BarStatus,
    pub source: String,
    pub frame: Frame,
}

impl OHLCVBar {
    /// Construct and validate a bar. Enforces (§3):
    /// - `timestamp` aligned to the frame's own minute boundary for `M1`
    ///   (the alignment rule generalizes to the frame's own period for
    ///   other frames, checked by the caller/validation engine for those).
    /// - `high >= max(open, low, close)`, `low <= min(open, high, close)`.
    /// - prices already `> 0` by construction of [`Price`]; `volume >= 0`
    ///   by construction of [`Volume`].
    pub fn new(args: NewBar) -> Result<Self, ValidationError> {
        if args.frame == Frame::M1 {
            args.timestamp.require_minute_aligned()?;
        }

        let (open, high, low, close) = (args.open, args.high, args.low, args.close);
        let max_oc_l = open.max(low).max(close);
        if high < max_oc_l {
            return Err(ValidationError::new(
                "high",
                "ohlc_consistency",
                format!("high ({high}) must be >= max(open, low, close) ({max_oc_l})"),
            ));
        }
        let min_oc_h = open.min(high).min(close);
        if low > min_oc_h {
            return Err(ValidationError::new(
                "low",
                "ohlc_consistency",
                format!("low ({low}) must be <= min(open, high, close) ({min_oc_h})"),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            symbol: args.symbol,
            timestamp: args.timestamp,
            open,
            high,
            low,
            close,
            volume: args.volume,
            trade_count: args.trade_count,
            vwap: args.vwap,
            session: args.session,
            currency: args.currency,
            status: args.status,
            source: args.source,
            frame: args.frame,
            schema_version: SCHEMA_VERSION,
        })
    }

    /// Rebuild a bar from a previously-validated storage row. Skips the
    /// invariant checks in [`OHLCVBar::new`] since a row that made it to
    /// disk already passed them once; the storage engine is the only
    /// expected caller.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: Uuid,
        symbol: Symbol,
        timestamp: Timestamp,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Volume,
        trade_count: Option<u64>,
        vwap: Option<Price>,
        session: Session,
        currency: String,
        status: BarStatus,
        source: String,
        frame: Frame,
        schema_version: i32,
    ) -> Self {
        Self {
            id,
            symbol,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            trade_count,
            vwap,
            session,
            currency,
            status,
            source,
            frame,
            schema_version,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
    pub fn open(&self) -> Price {
        self.open
    }
    pub fn high(&self) -> Price {
        self.high
    }
    pub fn low(&self) -> Price {
        self.low
    }
    pub fn close(&self) -> Price {
        self.close
    }
    pub fn volume(&self) -> Volume {
        self.volume
    }
    pub fn trade_count(&self) -> Option<u64> {
        self.trade_count
    }
    pub fn vwap(&self) -> Option<Price> {
        self.vwap
    }
    pub fn session(&self) -> Session {
        self.session
    }
    pub fn currency(&self) -> &str {
        &self.currency
    }
    pub fn status(&self) -> BarStatus {
        self.status
    }
    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn frame(&self) -> Frame {
        self.frame
    }
    pub fn schema_version(&self) -> i32 {
        self.schema_version
    }

    /// Derived UTC calendar date of `timestamp` (§3).
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Storage-dedup equality key: `(symbol, timestamp)` (§3).
    pub fn dedup_key(&self) -> (Symbol, Timestamp) {
        (self.symbol.clone(), self.timestamp)
    }
}
