use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use datafusion::prelude::SessionContext;
use marketpipe_config::Settings;
use marketpipe_core::{Symbol, Timestamp};
use marketpipe_events::EventBus;
use marketpipe_ingest::{CancellationToken, CoordinatorConfig, IngestionCoordinator};
use marketpipe_provider::TwelveDataProvider;
use marketpipe_ratelimit::RateLimiter;
use marketpipe_repo::{connect, ensure_schema, CheckpointStore, JobRepository};
use marketpipe_storage::StorageEngine;
use marketpipe_validation::ValidationConfig;

#[derive(Parser)]
#[command(name = "marketpipe")]
#[command(about = "MarketPipe ingestion and query CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, validate, and roll up bars for one or more symbols and dates.
    Ingest {
        /// Vendor to pull from (drives credential + rate-limit lookup).
        #[arg(long, default_value = "twelvedata")]
        vendor: String,

        /// Comma-separated ticker symbols, e.g. AAPL,MSFT.
        #[arg(long, value_delimiter = ',', required = true)]
        symbols: Vec<String>,

        /// First trading date to ingest (inclusive), YYYY-MM-DD.
        #[arg(long)]
        start: String,

        /// Last trading date to ingest (inclusive), YYYY-MM-DD. Defaults to `start`.
        #[arg(long)]
        end: Option<String>,

        /// Upper bound on concurrently in-flight (symbol, date) jobs.
        #[arg(long, default_value_t = 4)]
        max_workers: usize,

        /// Layered config files (merge order); rate limits are read from
        /// `/rate_limits/<vendor>` if present.
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Delete partitions older than a cutoff date.
    Prune {
        /// Remove partitions whose trading date is strictly before this date.
        #[arg(long)]
        before: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Run a read-only SQL query over the partitioned bar store.
    Query {
        /// SQL text, e.g. "select symbol, count(*) from bars_1m group by symbol".
        sql: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Compute the layered config hash + print canonical JSON.
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...).
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Ingest { vendor, symbols, start, end, max_workers, config_paths } => {
            run_ingest(vendor, symbols, start, end, max_workers, config_paths).await?
        }
        Commands::Prune { before, config_paths } => run_prune(before, config_paths).await?,
        Commands::Query { sql, config_paths } => run_query(sql, config_paths).await?,
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let loaded = marketpipe_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

async fn run_ingest(
    vendor: String,
    symbols: Vec<String>,
    start: String,
    end: Option<String>,
    max_workers: usize,
    config_paths: Vec<String>,
) -> Result<()> {
    let path_refs: Vec<&str> = config_paths.iter().map(String::as_str).collect();
    let settings = Settings::load(&path_refs).context("load settings")?;

    let credentials = marketpipe_config::resolve_vendor_credentials(&vendor);
    let (capacity, refill_per_sec) = vendor_rate_limit(&vendor, &path_refs);
    let rate_limiter = RateLimiter::new(vendor.clone(), capacity, refill_per_sec);

    let provider: Arc<dyn marketpipe_provider::MarketDataProvider> = match vendor.as_str() {
        "twelvedata" => {
            let api_key = credentials
                .api_key
                .context("no API key resolved for vendor (set MP_TWELVEDATA_API_KEY or TWELVEDATA_API_KEY)")?;
            Arc::new(TwelveDataProvider::new(api_key, rate_limiter.clone()))
        }
        other => anyhow::bail!("unsupported vendor: {other}"),
    };

    let pool = connect(&settings.db_url).await.context("open database pool")?;
    ensure_schema(&pool).await.context("ensure schema")?;
    let job_repo = Arc::new(JobRepository::new(pool.clone()));
    let checkpoint_store = Arc::new(CheckpointStore::new(pool.clone()));
    let storage = Arc::new(StorageEngine::new(settings.data_dir.clone()));
    let event_bus = Arc::new(EventBus::new());
    subscribe_progress_logger(&event_bus);

    let start_date = parse_date(&start)?;
    let end_date = match end {
        Some(e) => parse_date(&e)?,
        None => start_date,
    };
    let trading_dates: Vec<NaiveDate> = start_date.iter_days().take_while(|d| *d <= end_date).collect();

    let symbols: Vec<Symbol> = symbols.iter().map(|s| Symbol::new(s)).collect::<Result<_, _>>()?;

    let coordinator = IngestionCoordinator::new(
        provider,
        storage,
        job_repo,
        checkpoint_store,
        rate_limiter,
        event_bus,
        ValidationConfig::default(),
        CoordinatorConfig { max_workers, ..Default::default() },
    );

    let result = coordinator
        .execute_job(symbols, trading_dates, Timestamp::from_nanos(0), CancellationToken::new())
        .await;

    for (job_id, bar_count) in &result.completed {
        println!("completed job={job_id:?} bars={bar_count}");
    }
    for (job_id, reason) in &result.failed {
        println!("failed job={job_id:?} reason={reason}");
    }
    println!("summary: completed={} failed={}", result.completed.len(), result.failed.len());

    if !result.failed.is_empty() {
        anyhow::bail!("{} job(s) failed", result.failed.len());
    }
    Ok(())
}

async fn run_prune(before: String, config_paths: Vec<String>) -> Result<()> {
    let path_refs: Vec<&str> = config_paths.iter().map(String::as_str).collect();
    let settings = Settings::load(&path_refs).context("load settings")?;
    let storage = StorageEngine::new(settings.data_dir.clone());
    let event_bus = EventBus::new();
    subscribe_progress_logger(&event_bus);

    let cutoff = parse_date(&before)?;
    let summary = marketpipe_ingest::prune_older_than(&storage, cutoff, &event_bus)?;

    println!(
        "partitions_removed={} files_removed={} rows_removed={}",
        summary.partitions_removed, summary.files_removed, summary.rows_removed
    );
    Ok(())
}

async fn run_query(sql: String, config_paths: Vec<String>) -> Result<()> {
    let path_refs: Vec<&str> = config_paths.iter().map(String::as_str).collect();
    let settings = Settings::load(&path_refs).context("load settings")?;

    let ctx = SessionContext::new();
    let registered = marketpipe_aggregate::register_all_partitions(&ctx, &settings.data_dir).await?;
    if registered.is_empty() {
        println!("no partitions found under {}", settings.data_dir.display());
        return Ok(());
    }

    ctx.sql(&sql).await?.show().await?;
    Ok(())
}

/// Best-effort rate limit lookup: config-file `/rate_limits/<vendor>` if
/// present, else a conservative default so a fresh checkout still runs.
fn vendor_rate_limit(vendor: &str, config_paths: &[&str]) -> (u32, f64) {
    const DEFAULT_CAPACITY: u32 = 8;
    const DEFAULT_REFILL_PER_SEC: f64 = 8.0;

    let Ok(loaded) = marketpipe_config::load_layered_yaml(config_paths) else {
        return (DEFAULT_CAPACITY, DEFAULT_REFILL_PER_SEC);
    };
    let settings = match Settings::load(config_paths) {
        Ok(s) => s,
        Err(_) => return (DEFAULT_CAPACITY, DEFAULT_REFILL_PER_SEC),
    };
    match settings.rate_limit_for(&loaded, vendor) {
        Some(limit) => (limit.capacity, limit.refill_per_sec),
        None => (DEFAULT_CAPACITY, DEFAULT_REFILL_PER_SEC),
    }
}

fn subscribe_progress_logger(bus: &EventBus) {
    bus.subscribe("ingestion_job_completed", |e| tracing::info!(?e, "job completed"));
    bus.subscribe("ingestion_job_failed", |e| tracing::warn!(?e, "job failed"));
    bus.subscribe("validation_completed", |e| tracing::info!(?e, "validation completed"));
    bus.subscribe("aggregation_completed", |e| tracing::info!(?e, "aggregation completed"));
    bus.subscribe("data_pruned", |e| tracing::info!(?e, "data pruned"));
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date: {s}"))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
