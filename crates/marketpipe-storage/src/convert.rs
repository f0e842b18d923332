//! `OHLCVBar` <-> Arrow `RecordBatch` conversion against the canonical
//! schema (§6).

use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{
    Array, Date32Array, Decimal128Array, Int32Array, Int64Array, RecordBatch, StringArray,
};
use chrono::NaiveDate;
use marketpipe_core::{BarStatus, Frame, OHLCVBar, Price, Session, Symbol, Timestamp, Volume};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StorageError;
use crate::schema::{canonical_schema_ref, DECIMAL_PRECISION, DECIMAL_SCALE};

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

fn price_to_i128(p: Price) -> i128 {
    p.as_decimal().mantissa()
}

fn i128_to_price(v: i128, nonnegative: bool) -> Result<Price, StorageError> {
    let d = Decimal::from_i128_with_scale(v, DECIMAL_SCALE as u32);
    if nonnegative {
        Price::from_decimal_nonnegative(d)
    } else {
        Price::from_decimal(d)
    }
    .map_err(|e| StorageError::CorruptRow(e.to_string()))
}

pub fn bars_to_record_batch(bars: &[OHLCVBar]) -> Result<RecordBatch, StorageError> {
    let ids: Vec<String> = bars.iter().map(|b| b.id().to_string()).collect();
    let symbols: Vec<String> = bars.iter().map(|b| b.symbol().as_str().to_string()).collect();
    let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp().as_nanos()).collect();
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date().signed_duration_since(epoch()).num_days()) as i32)
        .collect();
    let opens: Vec<i128> = bars.iter().map(|b| price_to_i128(b.open())).collect();
    let highs: Vec<i128> = bars.iter().map(|b| price_to_i128(b.high())).collect();
    let lows: Vec<i128> = bars.iter().map(|b| price_to_i128(b.low())).collect();
    let closes: Vec<i128> = bars.iter().map(|b| price_to_i128(b.close())).collect();
    let volumes: Vec<i64> = bars.iter().map(|b| b.volume().as_u64() as i64).collect();
    let trade_counts: Vec<Option<i64>> = bars.iter().map(|b| b.trade_count().map(|t| t as i64)).collect();
    let vwaps: Vec<Option<i128>> = bars.iter().map(|b| b.vwap().map(price_to_i128)).collect();
    let sessions: Vec<&str> = bars.iter().map(|b| b.session().as_str()).collect();
    let currencies: Vec<&str> = bars.iter().map(|b| b.currency()).collect();
    let statuses: Vec<&str> = bars.iter().map(|b| b.status().as_str()).collect();
    let sources: Vec<&str> = bars.iter().map(|b| b.source()).collect();
    let frames: Vec<&str> = bars.iter().map(|b| b.frame().as_str()).collect();
    let schema_versions: Vec<i32> = bars.iter().map(|b| b.schema_version()).collect();

    let batch = RecordBatch::try_new(
        canonical_schema_ref(),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(symbols)),
            Arc::new(Int64Array::from(timestamps)),
            Arc::new(Date32Array::from(dates)),
            Arc::new(
                Decimal128Array::from(opens).with_precision_and_scale(DECIMAL_PRECISION, DECIMAL_SCALE)?,
            ),
            Arc::new(
                Decimal128Array::from(highs).with_precision_and_scale(DECIMAL_PRECISION, DECIMAL_SCALE)?,
            ),
            Arc::new(
                Decimal128Array::from(lows).with_precision_and_scale(DECIMAL_PRECISION, DECIMAL_SCALE)?,
            ),
            Arc::new(
                Decimal128Array::from(closes).with_precision_and_scale(DECIMAL_PRECISION, DECIMAL_SCALE)?,
            ),
            Arc::new(Int64Array::from(volumes)),
            Arc::new(Int64Array::from(trade_counts)),
            Arc::new(
                Decimal128Array::from(vwaps).with_precision_and_scale(DECIMAL_PRECISION, DECIMAL_SCALE)?,
            ),
            Arc::new(StringArray::from(sessions)),
            Arc::new(StringArray::from(currencies)),
            Arc::new(StringArray::from(statuses)),
            Arc::new(StringArray::from(sources)),
            Arc::new(StringArray::from(frames)),
            Arc::new(Int32Array::from(schema_versions)),
        ],
    )?;
    Ok(batch)
}

pub fn record_batch_to_bars(batch: &RecordBatch) -> Result<Vec<OHLCVBar>, StorageError> {
    let col = |name: &str| -> Result<&Arc<dyn Array>, StorageError> {
        Ok(batch
            .column_by_name(name)
            .ok_or_else(|| StorageError::CorruptRow(format!("missing column '{name}'")))?)
    };

    let ids = col("id")?.as_any().downcast_ref::<StringArray>().unwrap();
    let symbols = col("symbol")?.as_any().downcast_ref::<StringArray>().unwrap();
    let timestamps = col("timestamp")?.as_any().downcast_ref::<Int64Array>().unwrap();
    let opens = col("open")?.as_any().downcast_ref::<Decimal128Array>().unwrap();
    let highs = col("high")?.as_any().downcast_ref::<Decimal128Array>().unwrap();
    let lows = col("low")?.as_any().downcast_ref::<Decimal128Array>().unwrap();
    let closes = col("close")?.as_any().downcast_ref::<Decimal128Array>().unwrap();
    let volumes = col("volume")?.as_any().downcast_ref::<Int64Array>().unwrap();
    let trade_counts = col("trade_count")?.as_any().downcast_ref::<Int64Array>().unwrap();
    let vwaps = col("vwap")?.as_any().downcast_ref::<Decimal128Array>().unwrap();
    let sessions = col("session")?.as_any().downcast_ref::<StringArray>().unwrap();
    let currencies = col("currency")?.as_any().downcast_ref::<StringArray>().unwrap();
    let statuses = col("status")?.as_any().downcast_ref::<StringArray>().unwrap();
    let sources = col("source")?.as_any().downcast_ref::<StringArray>().unwrap();
    let frames = col("frame")?.as_any().downcast_ref::<StringArray>().unwrap();
    let schema_versions = col("schema_version")?.as_any().downcast_ref::<Int32Array>().unwrap();

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let id = Uuid::from_str(ids.value(i))
            .map_err(|e| StorageError::CorruptRow(format!("bad id uuid: {e}")))?;
        let symbol = Symbol::new(symbols.value(i)).map_err(|e| StorageError::CorruptRow(e.to_string()))?;
        let frame = Frame::parse(frames.value(i)).map_err(|e| StorageError::CorruptRow(e.to_string()))?;
        let session = match sessions.value(i) {
            "regular" => Session::Regular,
            "extended" => Session::Extended,
            other => return Err(StorageError::CorruptRow(format!("unknown session '{other}'"))),
        };
        let status = match statuses.value(i) {
            "ok" => BarStatus::Ok,
            "suspect" => BarStatus::Suspect,
            other => return Err(StorageError::CorruptRow(format!("unknown status '{other}'"))),
        };
        let trade_count = if trade_counts.is_null(i) {
            None
        } else {
            Some(trade_counts.value(i) as u64)
        };
        let vwap = if vwaps.is_null(i) {
            None
        } else {
            Some(i128_to_price(vwaps.value(i), true)?)
        };

        out.push(OHLCVBar::reconstitute(
            id,
            symbol,
            Timestamp::from_nanos(timestamps.value(i)),
            i128_to_price(opens.value(i), false)?,
            i128_to_price(highs.value(i), false)?,
            i128_to_price(lows.value(i), false)?,
            i128_to_price(closes.value(i), false)?,
            Volume::new(volumes.value(i)).map_err(|e| StorageError::CorruptRow(e.to_string()))?,
            trade_count,
            vwap,
            session,
            currencies.value(i).to_string(),
            status,
            sources.value(i).to_string(),
            frame,
            schema_versions.value(i),
        ));
    }
    Ok(out)
}
