//! Ingestion Coordinator (§4.9): orchestrates parallel per-symbol pipelines,
//! respects the vendor rate budget, persists checkpoints, and emits events.
//!
//! The spec's "Validation handler" / "Aggregation handler" are modeled here
//! as sequential phases the coordinator runs itself after a job completes,
//! rather than as separate subscribers triggered off the bus: `EventBus`
//! handlers are synchronous (by design, for panic isolation, see
//! `marketpipe-events`), and bridging a sync handler back into an async
//! repository call with no blocking-runtime precedent in the corpus would
//! be the wrong place to introduce one. The bus is still used for
//! `publish`-side fan-out — any observer can subscribe to the same
//! `IngestionJobCompleted` / `ValidationCompleted` / `AggregationCompleted`
//! events the coordinator emits at each phase boundary.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use marketpipe_aggregate::AggregationEngine;
use marketpipe_core::{Checkpoint, Frame, IngestionJob, IngestionJobId, JobState, Partition, Symbol, Timestamp};
use marketpipe_events::{Event, EventBus, EventKind, ValidationSummaryPayload};
use marketpipe_provider::{normalize_all, sort_normalized, FetchRequest, MarketDataProvider};
use marketpipe_ratelimit::{RateLimiter, RateLimiterLabel};
use marketpipe_repo::{CheckpointStore, JobRepository};
use marketpipe_storage::StorageEngine;
use marketpipe_validation::{validate_job, ValidationConfig};
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::cancellation::CancellationToken;
use crate::error::IngestError;

/// Outcome of one `(symbol, trading_date)` job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Completed { job_id: IngestionJobId, bar_count: u64 },
    Failed { job_id: IngestionJobId, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct JobBatchResult {
    pub completed: Vec<(IngestionJobId, u64)>,
    pub failed: Vec<(IngestionJobId, String)>,
}

/// Tunables for one coordinator run (§4.9, §5).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub max_workers: usize,
    /// If a worker's rate-limiter wait exceeds this, concurrency for
    /// subsequent launches in the same run is reduced by one permit.
    pub backpressure_wait_threshold: Duration,
    pub source: &'static str,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            backpressure_wait_threshold: Duration::from_secs(5),
            source: "marketpipe",
        }
    }
}

pub struct IngestionCoordinator {
    handle: Arc<CoordinatorHandle>,
}

impl IngestionCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        storage: Arc<StorageEngine>,
        job_repo: Arc<JobRepository>,
        checkpoint_store: Arc<CheckpointStore>,
        rate_limiter: Arc<RateLimiter>,
        event_bus: Arc<EventBus>,
        validation_config: ValidationConfig,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            handle: Arc::new(CoordinatorHandle {
                provider,
                storage,
                job_repo,
                checkpoint_store,
                rate_limiter,
                event_bus,
                validation_config,
                source: config.source,
                max_workers: config.max_workers.max(1),
                backpressure_wait_threshold: config.backpressure_wait_threshold,
            }),
        }
    }

    /// §4.9 `execute_job(symbols, trading_dates) -> JobBatchResult`. One
    /// worker is launched per `(symbol, trading_date)` pair, bounded by
    /// `max_workers` concurrent in-flight jobs. A worker whose rate-limiter
    /// wait exceeds `backpressure_wait_threshold` permanently forgets one
    /// semaphore permit, so later launches in the same run see reduced
    /// concurrency (§4.9 backpressure).
    pub async fn execute_job(
        &self,
        symbols: Vec<Symbol>,
        trading_dates: Vec<NaiveDate>,
        requested_start: Timestamp,
        cancel: CancellationToken,
    ) -> JobBatchResult {
        let semaphore = Arc::new(Semaphore::new(self.handle.max_workers));
        let threshold = self.handle.backpressure_wait_threshold;
        let mut handles = Vec::new();

        'launch: for date in &trading_dates {
            for symbol in &symbols {
                if cancel.is_cancelled() {
                    break 'launch;
                }
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break 'launch;
                };
                let symbol = symbol.clone();
                let date = *date;
                let cancel = cancel.clone();
                let handle = self.handle.clone();
                let semaphore_for_backpressure = semaphore.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    let (outcome, waited) = handle.run_job(symbol, date, requested_start, cancel).await;
                    if waited >= threshold {
                        if let Ok(extra) = semaphore_for_backpressure.try_acquire() {
                            extra.forget();
                        }
                    }
                    outcome
                }));
            }
        }

        let mut result = JobBatchResult::default();
        for handle in handles {
            match handle.await {
                Ok(JobOutcome::Completed { job_id, bar_count }) => {
                    result.completed.push((job_id, bar_count));
                }
                Ok(JobOutcome::Failed { job_id, reason }) => {
                    result.failed.push((job_id, reason));
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "ingestion worker task panicked or was aborted");
                }
            }
        }
        result
    }
}

/// The coordinator's shared resources, one instance per coordinator,
/// cheaply `Arc`-cloned into each spawned worker task. `CoordinatorConfig`'s
/// knobs are copied in at construction since they never change mid-run.
struct CoordinatorHandle {
    provider: Arc<dyn MarketDataProvider>,
    storage: Arc<StorageEngine>,
    job_repo: Arc<JobRepository>,
    checkpoint_store: Arc<CheckpointStore>,
    rate_limiter: Arc<RateLimiter>,
    event_bus: Arc<EventBus>,
    validation_config: ValidationConfig,
    source: &'static str,
    max_workers: usize,
    backpressure_wait_threshold: Duration,
}

impl CoordinatorHandle {
    async fn run_job(
        self: &Arc<Self>,
        symbol: Symbol,
        trading_date: NaiveDate,
        requested_start: Timestamp,
        cancel: CancellationToken,
    ) -> (JobOutcome, Duration) {
        let job_id = IngestionJobId::new(&symbol, trading_date);
        match self.try_run_job(&job_id, &symbol, trading_date, requested_start, &cancel).await {
            Ok((bar_count, waited)) => (JobOutcome::Completed { job_id, bar_count }, waited),
            Err((e, waited)) => {
                self.mark_job_failed(&job_id, &e).await;
                self.event_bus.publish(&Event::new(
                    job_id.as_str(),
                    EventKind::IngestionJobFailed { job_id: job_id.clone(), reason: e.to_string() },
                ));
                (JobOutcome::Failed { job_id, reason: e.to_string() }, waited)
            }
        }
    }

    async fn try_run_job(
        self: &Arc<Self>,
        job_id: &IngestionJobId,
        symbol: &Symbol,
        trading_date: NaiveDate,
        requested_start: Timestamp,
        cancel: &CancellationToken,
    ) -> Result<(u64, Duration), (IngestError, Duration)> {
        let mut job = IngestionJob::new_pending(job_id.clone(), vec![symbol.clone()], trading_date);
        self.job_repo.insert(&job).await.map_err(|e| (e.into(), Duration::ZERO))?;

        let expected_version = job.version();
        job.start(Utc::now()).map_err(|e| (e.into(), Duration::ZERO))?;
        self.job_repo.save(&job, expected_version).await.map_err(|e| (e.into(), Duration::ZERO))?;

        if cancel.is_cancelled() {
            return Err((IngestError::Cancelled, Duration::ZERO));
        }

        let checkpoint = self.checkpoint_store.get(symbol).await.map_err(|e| (e.into(), Duration::ZERO))?;
        let effective_start = Checkpoint::effective_start(checkpoint.map(|c| c.cursor), requested_start);

        let label = RateLimiterLabel::new(self.provider.name(), "async");
        let wait_start = Instant::now();
        self.rate_limiter.acquire_async(&label, None).await.map_err(|e| (e.into(), wait_start.elapsed()))?;
        let waited = wait_start.elapsed();

        let request = FetchRequest {
            symbols: vec![symbol.as_str().to_string()],
            timeframe: Frame::M1.as_str().to_string(),
            start: trading_date,
            end: trading_date,
        };
        let raw_bars = self.provider.fetch_historical(&request).await.map_err(|e| (e.into(), waited))?;

        let (mut bars, normalization_errors) = normalize_all(&raw_bars, self.source);
        for (idx, err) in &normalization_errors {
            tracing::warn!(job_id = %job_id, index = idx, error = %err, "dropping unnormalizable bar");
        }
        bars.retain(|b| b.timestamp().as_nanos() >= effective_start.as_nanos());
        sort_normalized(&mut bars);

        if cancel.is_cancelled() {
            return Err((IngestError::Cancelled, waited));
        }

        let partition = Partition::new(Frame::M1, symbol.clone(), trading_date);
        self.storage.write(&bars, &partition, job_id).map_err(|e| (e.into(), waited))?;

        if let Some(max_ts) = bars.iter().map(|b| b.timestamp()).max() {
            self.checkpoint_store
                .set(&Checkpoint::new(symbol.clone(), max_ts))
                .await
                .map_err(|e| (e.into(), waited))?;
        }

        let expected_version = job.version();
        job.complete(Utc::now()).map_err(|e| (e.into(), waited))?;
        self.job_repo.save(&job, expected_version).await.map_err(|e| (e.into(), waited))?;

        let bar_count = bars.len() as u64;
        self.event_bus.publish(&Event::new(
            job_id.as_str(),
            EventKind::IngestionJobCompleted {
                job_id: job_id.clone(),
                symbols: vec![symbol.clone()],
                bar_count,
            },
        ));

        self.run_validation_and_aggregation(&job).await;

        Ok((bar_count, waited))
    }

    /// Best-effort: transition the job to `failed` with `reason`'s message.
    /// Reloads the job since the failure may have surfaced before a local
    /// `IngestionJob` handle existed at every call site.
    async fn mark_job_failed(&self, job_id: &IngestionJobId, reason: &IngestError) {
        let Ok(mut job) = self.job_repo.get(job_id).await else { return };
        if !matches!(job.state(), JobState::InProgress) {
            return;
        }
        let expected_version = job.version();
        if job.fail(reason.to_string(), Utc::now()).is_ok() {
            let _ = self.job_repo.save(&job, expected_version).await;
        }
    }

    /// Runs validation then aggregation for the just-completed job's single
    /// symbol, publishing the corresponding `*Completed`/`*Failed` event for
    /// each phase. File IO-bound synchronous work (`validate_job`,
    /// `AggregationEngine::aggregate`) is moved to the blocking pool so it
    /// never stalls the async executor's worker threads.
    async fn run_validation_and_aggregation(self: &Arc<Self>, job: &IngestionJob) {
        let report_dir = self.storage.root().join("_reports");
        let job_for_validation = job.clone();
        let storage = self.storage.clone();
        let validation_config = self.validation_config.clone();
        let validation_result = tokio::task::spawn_blocking(move || {
            validate_job(&storage, &report_dir, &job_for_validation, &validation_config)
        })
        .await;

        let job_id = job.id().clone();
        match validation_result {
            Ok(Ok(summary)) => {
                self.event_bus.publish(&Event::new(
                    job_id.as_str(),
                    EventKind::ValidationCompleted {
                        job_id: job_id.clone(),
                        summary: ValidationSummaryPayload {
                            total: summary.total,
                            passed: summary.passed,
                            failed: summary.total - summary.passed,
                        },
                    },
                ));
            }
            Ok(Err(e)) => {
                self.event_bus.publish(&Event::new(
                    job_id.as_str(),
                    EventKind::ValidationFailed { job_id: job_id.clone(), reason: e.to_string() },
                ));
                return;
            }
            Err(join_err) => {
                self.event_bus.publish(&Event::new(
                    job_id.as_str(),
                    EventKind::ValidationFailed { job_id: job_id.clone(), reason: join_err.to_string() },
                ));
                return;
            }
        };

        let job_for_aggregation = job.clone();
        let storage = self.storage.clone();
        let source = self.source;
        let aggregation_result = tokio::task::spawn_blocking(move || {
            let engine = AggregationEngine::new(&storage, source);
            engine.aggregate(&job_for_aggregation)
        })
        .await;

        match aggregation_result {
            Ok(Ok(result)) => {
                self.event_bus.publish(&Event::new(
                    job_id.as_str(),
                    EventKind::AggregationCompleted {
                        job_id: job_id.clone(),
                        frames: result.frames_written_by_frame.keys().copied().collect(),
                    },
                ));
            }
            Ok(Err(e)) => {
                self.event_bus.publish(&Event::new(
                    job_id.as_str(),
                    EventKind::AggregationFailed { job_id: job_id.clone(), reason: e.to_string() },
                ));
            }
            Err(join_err) => {
                self.event_bus.publish(&Event::new(
                    job_id.as_str(),
                    EventKind::AggregationFailed { job_id: job_id.clone(), reason: join_err.to_string() },
                ));
            }
        }
    }
}
