//! marketpipe-ingest
//!
//! The Ingestion Coordinator (§4.9): fans out one worker per
//! `(symbol, trading_date)` pair, bounded by `max_workers`, each of which
//! pulls bars through a `MarketDataProvider`, writes them via the Storage
//! Engine, advances its symbol's checkpoint, and chains into validation and
//! aggregation on success. Also home to Retention/Prune (§2).

pub mod cancellation;
pub mod coordinator;
pub mod error;
pub mod retention;

pub use cancellation::CancellationToken;
pub use coordinator::{CoordinatorConfig, IngestionCoordinator, JobBatchResult, JobOutcome};
pub use error::IngestError;
pub use retention::{prune_older_than, PruneSummary};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use marketpipe_core::{Symbol, Timestamp};
    use marketpipe_ratelimit::RateLimiter;
    use marketpipe_testkit::{raw_bar, FakeProvider, TestHarness};
    use marketpipe_validation::ValidationConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    async fn build_coordinator(provider: FakeProvider) -> (IngestionCoordinator, TestHarness) {
        let harness = TestHarness::new().await;
        let rate_limiter = RateLimiter::new("fake", 100, 100.0);

        let coordinator = IngestionCoordinator::new(
            Arc::new(provider),
            harness.storage.clone(),
            harness.job_repo.clone(),
            harness.checkpoint_store.clone(),
            rate_limiter,
            harness.event_bus.clone(),
            ValidationConfig::default(),
            CoordinatorConfig { max_workers: 2, ..Default::default() },
        );
        (coordinator, harness)
    }

    #[tokio::test]
    async fn execute_job_ingests_validates_and_aggregates_one_symbol_day() {
        let bars: Vec<_> = (0..120).map(|m| raw_bar("AAPL", m)).collect();
        let provider = FakeProvider::new(bars);
        let (coordinator, harness) = build_coordinator(provider).await;

        let completed_events = Arc::new(AtomicUsize::new(0));
        let validated_events = Arc::new(AtomicUsize::new(0));
        let aggregated_events = Arc::new(AtomicUsize::new(0));
        {
            let c = completed_events.clone();
            harness.event_bus.subscribe("ingestion_job_completed", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let c = validated_events.clone();
            harness.event_bus.subscribe("validation_completed", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let c = aggregated_events.clone();
            harness.event_bus.subscribe("aggregation_completed", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }

        let symbol = Symbol::new("AAPL").unwrap();
        let trading_date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let result = coordinator
            .execute_job(
                vec![symbol.clone()],
                vec![trading_date],
                Timestamp::from_nanos(0),
                CancellationToken::new(),
            )
            .await;

        assert_eq!(result.completed.len(), 1);
        assert!(result.failed.is_empty());
        assert_eq!(result.completed[0].1, 120);
        assert_eq!(completed_events.load(Ordering::SeqCst), 1);
        assert_eq!(validated_events.load(Ordering::SeqCst), 1);
        assert_eq!(aggregated_events.load(Ordering::SeqCst), 1);

        let bars_on_disk = harness.storage.read(marketpipe_core::Frame::M1, &symbol, trading_date, trading_date).unwrap();
        assert_eq!(bars_on_disk.len(), 120);
        let five_minute_bars =
            harness.storage.read(marketpipe_core::Frame::M5, &symbol, trading_date, trading_date).unwrap();
        assert_eq!(five_minute_bars.len(), 24);
    }

    #[tokio::test]
    async fn resume_from_checkpoint_skips_already_persisted_bars() {
        let bars: Vec<_> = (0..390).map(|m| raw_bar("AAPL", m)).collect();
        let provider = FakeProvider::new(bars);
        let (coordinator, harness) = build_coordinator(provider).await;

        let symbol = Symbol::new("AAPL").unwrap();
        let trading_date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

        // First run persists the full day.
        coordinator
            .execute_job(
                vec![symbol.clone()],
                vec![trading_date],
                Timestamp::from_nanos(0),
                CancellationToken::new(),
            )
            .await;

        // Re-running with the same requested start must not duplicate rows:
        // the checkpoint has already advanced past every bar in the set.
        let second = coordinator
            .execute_job(
                vec![symbol.clone()],
                vec![trading_date],
                Timestamp::from_nanos(0),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(second.completed.len(), 1);
        assert_eq!(second.completed[0].1, 0);

        let bars_on_disk = harness.storage.read(marketpipe_core::Frame::M1, &symbol, trading_date, trading_date).unwrap();
        assert_eq!(bars_on_disk.len(), 390);
    }

    #[tokio::test]
    async fn provider_failure_marks_job_failed_and_emits_event() {
        let provider = FakeProvider::failing("simulated vendor outage");
        let (coordinator, harness) = build_coordinator(provider).await;

        let failed_events = Arc::new(AtomicUsize::new(0));
        let c = failed_events.clone();
        harness.event_bus.subscribe("ingestion_job_failed", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let symbol = Symbol::new("AAPL").unwrap();
        let trading_date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let result = coordinator
            .execute_job(
                vec![symbol],
                vec![trading_date],
                Timestamp::from_nanos(0),
                CancellationToken::new(),
            )
            .await;

        assert!(result.completed.is_empty());
        assert_eq!(result.failed.len(), 1);
        assert_eq!(failed_events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelling_before_launch_produces_no_completions() {
        let provider = FakeProvider::new(vec![raw_bar("AAPL", 0)]);
        let (coordinator, _harness) = build_coordinator(provider).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let symbol = Symbol::new("AAPL").unwrap();
        let trading_date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let result = coordinator
            .execute_job(vec![symbol], vec![trading_date], Timestamp::from_nanos(0), cancel)
            .await;

        assert!(result.completed.is_empty());
        assert!(result.failed.is_empty());
    }

    #[tokio::test]
    async fn max_workers_bounds_concurrency_but_all_jobs_finish() {
        let provider = FakeProvider::new(
            ["AAPL", "MSFT", "GOOG"].iter().flat_map(|s| (0..5).map(move |m| raw_bar(s, m))).collect(),
        );
        let (coordinator, _harness) = build_coordinator(provider).await;

        let symbols = vec![
            Symbol::new("AAPL").unwrap(),
            Symbol::new("MSFT").unwrap(),
            Symbol::new("GOOG").unwrap(),
        ];
        let trading_date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            coordinator.execute_job(symbols, vec![trading_date], Timestamp::from_nanos(0), CancellationToken::new()),
        )
        .await
        .unwrap();

        assert_eq!(result.completed.len(), 3);
    }
}
