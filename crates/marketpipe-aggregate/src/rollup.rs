//! The roll-up computation itself (§4.8): group `1m` bars by
//! `(symbol, time_bucket(frame, timestamp))` and emit one coarser bar per
//! bucket.

use marketpipe_core::{BarStatus, Frame, NewBar, OHLCVBar, Symbol, Timestamp};
use rust_decimal::Decimal;

fn bucket_start(ts: Timestamp, frame: Frame) -> Timestamp {
    let width = frame.duration_ns();
    Timestamp::from_nanos(ts.as_nanos() - ts.as_nanos().rem_euclid(width))
}

/// Roll `bars` (a single symbol's `1m` series, already timestamp-sorted,
/// as `StorageEngine::read` returns them) up into `target_frame`.
/// Buckets are half-open `[bucket_start, bucket_start + frame)`; empty
/// buckets are never emitted.
pub fn roll_up(bars: &[OHLCVBar], target_frame: Frame, source: &str) -> Vec<OHLCVBar> {
    if bars.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut start = 0;
    while start < bars.len() {
        let bucket = bucket_start(bars[start].timestamp(), target_frame);
        let mut end = start + 1;
        while end < bars.len() && bucket_start(bars[end].timestamp(), target_frame) == bucket {
            end += 1;
        }
        out.push(build_bucket_bar(&bars[start..end], bucket, target_frame, source));
        start = end;
    }
    out
}

fn build_bucket_bar(group: &[OHLCVBar], bucket: Timestamp, frame: Frame, source: &str) -> OHLCVBar {
    let symbol: Symbol = group[0].symbol().clone();
    let open = group[0].open();
    let close = group[group.len() - 1].close();
    let high = group.iter().map(|b| b.high()).max().unwrap();
    let low = group.iter().map(|b| b.low()).min().unwrap();

    let total_volume: u64 = group.iter().map(|b| b.volume().as_u64()).sum();
    let trade_count = if group.iter().all(|b| b.trade_count().is_some()) {
        Some(group.iter().map(|b| b.trade_count().unwrap()).sum())
    } else {
        None
    };

    let vwap = if total_volume > 0 && group.iter().all(|b| b.vwap().is_some()) {
        let weighted: Decimal = group
            .iter()
            .map(|b| b.vwap().unwrap().as_decimal() * Decimal::from(b.volume().as_u64()))
            .sum();
        Some(
            marketpipe_core::Price::from_decimal_nonnegative(weighted / Decimal::from(total_volume))
                .expect("weighted average of positive prices is nonnegative"),
        )
    } else {
        None
    };

    OHLCVBar::new(NewBar {
        symbol,
        timestamp: bucket,
        open,
        high,
        low,
        close,
        volume: marketpipe_core::Volume::from_u64(total_volume),
        trade_count,
        vwap,
        session: group[0].session(),
        currency: group[0].currency().to_string(),
        status: BarStatus::Ok,
        source: source.to_string(),
        frame,
    })
    .expect("bucket aggregate preserves OHLC consistency of its inputs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketpipe_core::{Price, Session, Volume};

    fn bar(minute: i64, open: &str, high: &str, low: &str, close: &str, volume: u64, vwap: &str) -> OHLCVBar {
        OHLCVBar::new(NewBar {
            symbol: Symbol::new("AAPL").unwrap(),
            timestamp: Timestamp::from_nanos(minute * 60_000_000_000),
            open: Price::parse(open).unwrap(),
            high: Price::parse(high).unwrap(),
            low: Price::parse(low).unwrap(),
            close: Price::parse(close).unwrap(),
            volume: Volume::new(volume as i64).unwrap(),
            trade_count: Some(1),
            vwap: Some(Price::parse(vwap).unwrap()),
            session: Session::Regular,
            currency: "USD".to_string(),
            status: BarStatus::Ok,
            source: "fake".to_string(),
            frame: Frame::M1,
        })
        .unwrap()
    }

    #[test]
    fn empty_input_yields_no_buckets() {
        assert!(roll_up(&[], Frame::M5, "agg").is_empty());
    }

    #[test]
    fn rolls_five_one_minute_bars_into_one_five_minute_bucket() {
        let bars = vec![
            bar(0, "100", "101", "99", "100.5", 100, "100"),
            bar(1, "100.5", "102", "100", "101", 200, "101"),
            bar(2, "101", "103", "100.5", "102", 300, "102"),
            bar(3, "102", "104", "101", "103", 400, "103"),
            bar(4, "103", "105", "102", "104", 500, "104"),
        ];
        let rolled = roll_up(&bars, Frame::M5, "agg");
        assert_eq!(rolled.len(), 1);
        let b = &rolled[0];
        assert_eq!(b.timestamp().as_nanos(), 0);
        assert_eq!(b.open(), Price::parse("100").unwrap());
        assert_eq!(b.close(), Price::parse("104").unwrap());
        assert_eq!(b.high(), Price::parse("105").unwrap());
        assert_eq!(b.low(), Price::parse("99").unwrap());
        assert_eq!(b.volume().as_u64(), 1500);
        assert_eq!(b.trade_count(), Some(5));
    }

    #[test]
    fn bars_spanning_two_buckets_split() {
        let bars = vec![bar(4, "100", "101", "99", "100", 100, "100"), bar(5, "101", "102", "100", "101", 100, "101")];
        let rolled = roll_up(&bars, Frame::M5, "agg");
        assert_eq!(rolled.len(), 2);
        assert_eq!(rolled[0].timestamp().as_nanos(), 0);
        assert_eq!(rolled[1].timestamp().as_nanos(), 5 * 60_000_000_000);
    }

    #[test]
    fn vwap_is_volume_weighted_not_simple_average() {
        let bars = vec![
            bar(0, "100", "101", "99", "100", 100, "100"),
            bar(1, "100", "101", "99", "100", 900, "110"),
        ];
        let rolled = roll_up(&bars, Frame::M5, "agg");
        // (100*100 + 110*900) / 1000 = 109
        assert_eq!(rolled[0].vwap(), Some(Price::parse("109").unwrap()));
    }

    #[test]
    fn trade_count_null_if_any_input_null() {
        let mut bars = vec![bar(0, "100", "101", "99", "100", 100, "100")];
        let mut missing = bar(1, "100", "101", "99", "100", 100, "100");
        missing = OHLCVBar::new(NewBar {
            trade_count: None,
            symbol: missing.symbol().clone(),
            timestamp: missing.timestamp(),
            open: missing.open(),
            high: missing.high(),
            low: missing.low(),
            close: missing.close(),
            volume: missing.volume(),
            vwap: missing.vwap(),
            session: missing.session(),
            currency: missing.currency().to_string(),
            status: missing.status(),
            source: missing.source().to_string(),
            frame: missing.frame(),
        })
        .unwrap();
        bars.push(missing);
        let rolled = roll_up(&bars, Frame::M5, "agg");
        assert_eq!(rolled[0].trade_count(), None);
    }
}
