//! Retention/Prune (§2, ~2%): age-based deletion of partitions whose
//! trading date falls before a cutoff, with a `DataPruned` event per run.

use chrono::NaiveDate;
use marketpipe_core::Timestamp;
use marketpipe_events::{Event, EventBus, EventKind};
use marketpipe_storage::StorageEngine;

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneSummary {
    pub partitions_removed: u64,
    pub files_removed: u64,
    pub rows_removed: u64,
}

/// Delete every partition whose `date < cutoff`, across all frames and
/// symbols, and publish one `DataPruned` event summarizing the run (no
/// event is published if nothing was removed).
pub fn prune_older_than(
    storage: &StorageEngine,
    cutoff: NaiveDate,
    bus: &EventBus,
) -> Result<PruneSummary, IngestError> {
    let mut summary = PruneSummary::default();

    for partition in storage.list_partitions()? {
        if partition.date >= cutoff {
            continue;
        }
        let stats = storage.stats(&partition)?;
        storage.delete_partition(&partition)?;
        summary.partitions_removed += 1;
        summary.files_removed += stats.file_count as u64;
        summary.rows_removed += stats.row_count as u64;
    }

    if summary.rows_removed > 0 {
        let cutoff_ts = Timestamp::from_datetime(cutoff.and_hms_opt(0, 0, 0).unwrap().and_utc());
        bus.publish(&Event::new(
            "retention",
            EventKind::DataPruned {
                data_type: "bar".to_string(),
                amount: summary.rows_removed,
                cutoff: cutoff_ts,
            },
        ));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketpipe_core::{BarStatus, Frame, IngestionJobId, NewBar, OHLCVBar, Partition, Price, Session, Symbol, Volume};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn bar(symbol: &str, date: NaiveDate) -> OHLCVBar {
        OHLCVBar::new(NewBar {
            symbol: Symbol::new(symbol).unwrap(),
            timestamp: Timestamp::from_datetime(date.and_hms_opt(9, 30, 0).unwrap().and_utc()),
            open: Price::parse("100").unwrap(),
            high: Price::parse("101").unwrap(),
            low: Price::parse("99").unwrap(),
            close: Price::parse("100.5").unwrap(),
            volume: Volume::new(100).unwrap(),
            trade_count: Some(1),
            vwap: Some(Price::parse("100").unwrap()),
            session: Session::Regular,
            currency: "USD".to_string(),
            status: BarStatus::Ok,
            source: "fake".to_string(),
            frame: Frame::M1,
        })
        .unwrap()
    }

    #[test]
    fn prune_removes_only_partitions_older_than_cutoff() {
        let dir = tempdir().unwrap();
        let storage = StorageEngine::new(dir.path());
        let symbol = Symbol::new("AAPL").unwrap();

        let old_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let new_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let old_partition = Partition::new(Frame::M1, symbol.clone(), old_date);
        let new_partition = Partition::new(Frame::M1, symbol.clone(), new_date);

        storage.write(&[bar("AAPL", old_date)], &old_partition, &IngestionJobId::new(&symbol, old_date)).unwrap();
        storage.write(&[bar("AAPL", new_date)], &new_partition, &IngestionJobId::new(&symbol, new_date)).unwrap();

        let bus = EventBus::new();
        let pruned_count = Arc::new(AtomicUsize::new(0));
        let counter = pruned_count.clone();
        bus.subscribe("data_pruned", move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let cutoff = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = prune_older_than(&storage, cutoff, &bus).unwrap();

        assert_eq!(summary.partitions_removed, 1);
        assert_eq!(summary.rows_removed, 1);
        assert_eq!(pruned_count.load(Ordering::SeqCst), 1);

        let remaining = storage.list_partitions().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].date, new_date);
    }

    #[test]
    fn prune_with_nothing_to_remove_publishes_no_event() {
        let dir = tempdir().unwrap();
        let storage = StorageEngine::new(dir.path());
        let bus = EventBus::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        bus.subscribe("data_pruned", move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let summary = prune_older_than(&storage, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), &bus).unwrap();
        assert_eq!(summary.partitions_removed, 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
