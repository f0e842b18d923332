//! Canonical OHLCV v1 Arrow schema (§6 "Column schema"), plus the
//! companion columns `bar.rs` documents (session, currency, status,
//! source, frame, schema_version, id) needed to fully round-trip an
//! [`marketpipe_core::OHLCVBar`] through a partition file.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};

pub const DECIMAL_PRECISION: u8 = 18;
pub const DECIMAL_SCALE: i8 = 4;

pub fn canonical_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("timestamp", DataType::Int64, false),
        Field::new("date", DataType::Date32, false),
        Field::new("open", DataType::Decimal128(DECIMAL_PRECISION, DECIMAL_SCALE), false),
        Field::new("high", DataType::Decimal128(DECIMAL_PRECISION, DECIMAL_SCALE), false),
        Field::new("low", DataType::Decimal128(DECIMAL_PRECISION, DECIMAL_SCALE), false),
        Field::new("close", DataType::Decimal128(DECIMAL_PRECISION, DECIMAL_SCALE), false),
        Field::new("volume", DataType::Int64, false),
        Field::new("trade_count", DataType::Int64, true),
        Field::new("vwap", DataType::Decimal128(DECIMAL_PRECISION, DECIMAL_SCALE), true),
        Field::new("session", DataType::Utf8, false),
        Field::new("currency", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("frame", DataType::Utf8, false),
        Field::new("schema_version", DataType::Int32, false),
    ])
}

pub fn canonical_schema_ref() -> Arc<Schema> {
    Arc::new(canonical_schema())
}
