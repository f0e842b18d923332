//! marketpipe-testkit
//!
//! Shared test fixtures (§0): a fake provider, temp partition roots, and
//! in-memory repositories, wired together so integration tests across the
//! ingestion stack don't each hand-roll the same setup.

use std::sync::Arc;

use chrono::NaiveDate;
use marketpipe_core::{BarStatus, Frame, NewBar, OHLCVBar, Price, Session, Symbol, Volume};
use marketpipe_events::EventBus;
use marketpipe_provider::RawBar;
use marketpipe_repo::{connect, ensure_schema, CheckpointStore, JobRepository};
use marketpipe_storage::StorageEngine;
use sqlx::AnyPool;
use tempfile::TempDir;

pub use marketpipe_provider::fake::FakeProvider;

/// A fully wired, disposable environment for ingestion-stack integration
/// tests: an in-memory SQLite pool backing `JobRepository`/`CheckpointStore`,
/// a tempdir-backed `StorageEngine`, and a fresh `EventBus`.
///
/// `_data_dir` keeps the `TempDir` alive for the harness's lifetime; the
/// directory is removed on drop.
pub struct TestHarness {
    pub storage: Arc<StorageEngine>,
    pub job_repo: Arc<JobRepository>,
    pub checkpoint_store: Arc<CheckpointStore>,
    pub event_bus: Arc<EventBus>,
    pub pool: AnyPool,
    _data_dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        let pool = connect("sqlite::memory:").await.expect("open in-memory sqlite pool");
        ensure_schema(&pool).await.expect("create schema");
        let data_dir = tempfile::tempdir().expect("create temp partition root");
        Self {
            storage: Arc::new(StorageEngine::new(data_dir.path())),
            job_repo: Arc::new(JobRepository::new(pool.clone())),
            checkpoint_store: Arc::new(CheckpointStore::new(pool.clone())),
            event_bus: Arc::new(EventBus::new()),
            pool,
            _data_dir: data_dir,
        }
    }
}

/// A minimal, deterministic raw bar for `symbol` at `minute_of_day` minutes
/// past UTC midnight on an otherwise-unspecified trading day.
pub fn raw_bar(symbol: &str, minute_of_day: i64) -> RawBar {
    RawBar {
        symbol: symbol.to_string(),
        timeframe: "1m".to_string(),
        end_ts: minute_of_day * 60,
        open: "100.00".to_string(),
        high: "101.00".to_string(),
        low: "99.00".to_string(),
        close: "100.50".to_string(),
        volume: 1_000,
        is_complete: true,
    }
}

/// A minimal, valid canonical `1m` bar for direct `StorageEngine`/repository
/// fixtures that don't need to go through provider normalization.
pub fn canonical_bar(symbol: &str, date: NaiveDate, minute_of_day: u32) -> OHLCVBar {
    let timestamp = marketpipe_core::Timestamp::from_datetime(
        date.and_hms_opt(minute_of_day / 60, minute_of_day % 60, 0).unwrap().and_utc(),
    );
    OHLCVBar::new(NewBar {
        symbol: Symbol::new(symbol).unwrap(),
        timestamp,
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
        source: "testkit".to_string(),
        frame: Frame::M1,
    })
    .unwrap()
}
