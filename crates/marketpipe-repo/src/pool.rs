//! Connection setup shared by both repositories (§4.4).
//!
//! Backed by `sqlx::Any` so the same query text runs against the embedded
//! SQLite database used for local/dev ingestion and the Postgres instance
//! used in client-server deployments; callers pick the backend by URL
//! scheme (`sqlite://…` or `postgres://…`), not by code path.

use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::AnyPool;

pub const ENV_DB_URL: &str = "MP_DB";

pub async fn connect_from_env() -> Result<AnyPool, sqlx::Error> {
    install_default_drivers();
    let url = std::env::var(ENV_DB_URL).unwrap_or_else(|_| "sqlite::memory:".to_string());
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<AnyPool, sqlx::Error> {
    install_default_drivers();
    AnyPoolOptions::new().max_connections(10).connect(url).await
}

/// Assert the schema exists, creating it if this is a fresh database.
/// Runs at pool-open time (§4.4 "assert schema at open") rather than via a
/// separate migration step, since both backends share one additive schema.
pub async fn ensure_schema(pool: &AnyPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS checkpoints (
            symbol TEXT PRIMARY KEY,
            cursor_ns BIGINT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ingestion_jobs (
            job_id TEXT PRIMARY KEY,
            symbols_json TEXT NOT NULL,
            trading_date TEXT NOT NULL,
            state TEXT NOT NULL,
            fail_reason TEXT,
            started_at TEXT,
            completed_at TEXT,
            version BIGINT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
