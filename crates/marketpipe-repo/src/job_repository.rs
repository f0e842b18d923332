//! Job Repository (§4.4): durable storage for `IngestionJob` aggregates,
//! with optimistic-concurrency writes keyed on the aggregate's `version`.

use chrono::{DateTime, NaiveDate, Utc};
use marketpipe_core::{IngestionJob, IngestionJobId, JobState, Symbol};
use sqlx::{AnyPool, Row};

use crate::error::RepositoryError;

pub struct JobRepository {
    pool: AnyPool,
}

impl JobRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, job: &IngestionJob) -> Result<(), RepositoryError> {
        let existing = sqlx::query("SELECT 1 FROM ingestion_jobs WHERE job_id = ?")
            .bind(job.id().as_str())
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(RepositoryError::DuplicateKey {
                kind: "IngestionJob",
                id: job.id().as_str().to_string(),
            });
        }

        let (state, fail_reason) = encode_state(job.state());
        sqlx::query(
            "INSERT INTO ingestion_jobs
                (job_id, symbols_json, trading_date, state, fail_reason, started_at, completed_at, version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id().as_str())
        .bind(encode_symbols(job.symbols()))
        .bind(job.trading_date().format("%Y-%m-%d").to_string())
        .bind(state)
        .bind(fail_reason)
        .bind(job.started_at().map(|t| t.to_rfc3339()))
        .bind(job.completed_at().map(|t| t.to_rfc3339()))
        .bind(job.version())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &IngestionJobId) -> Result<IngestionJob, RepositoryError> {
        let row = sqlx::query(
            "SELECT job_id, symbols_json, trading_date, state, fail_reason, started_at, completed_at, version
             FROM ingestion_jobs WHERE job_id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            kind: "IngestionJob",
            id: id.as_str().to_string(),
        })?;

        Ok(decode_row(&row)?)
    }

    /// Compare-and-swap update: succeeds only if the stored row's version
    /// still equals `job.version() - 1` (the version the aggregate was
    /// loaded at before its last transition).
    pub async fn save(&self, job: &IngestionJob, expected_version: i64) -> Result<(), RepositoryError> {
        let (state, fail_reason) = encode_state(job.state());
        let result = sqlx::query(
            "UPDATE ingestion_jobs
             SET state = ?, fail_reason = ?, started_at = ?, completed_at = ?, version = ?
             WHERE job_id = ? AND version = ?",
        )
        .bind(state)
        .bind(fail_reason)
        .bind(job.started_at().map(|t| t.to_rfc3339()))
        .bind(job.completed_at().map(|t| t.to_rfc3339()))
        .bind(job.version())
        .bind(job.id().as_str())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let actual = self.get(job.id()).await?.version();
            return Err(RepositoryError::Concurrency { expected: expected_version, actual });
        }
        Ok(())
    }

    pub async fn list_by_state(&self, state: &str) -> Result<Vec<IngestionJob>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT job_id, symbols_json, trading_date, state, fail_reason, started_at, completed_at, version
             FROM ingestion_jobs WHERE state = ?",
        )
        .bind(state)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_row).collect()
    }

    pub async fn list_by_trading_date(&self, date: NaiveDate) -> Result<Vec<IngestionJob>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT job_id, symbols_json, trading_date, state, fail_reason, started_at, completed_at, version
             FROM ingestion_jobs WHERE trading_date = ?",
        )
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_row).collect()
    }
}

fn encode_symbols(symbols: &[Symbol]) -> String {
    serde_json::to_string(&symbols.iter().map(Symbol::as_str).collect::<Vec<_>>()).unwrap_or_default()
}

fn decode_symbols(raw: &str) -> Result<Vec<Symbol>, RepositoryError> {
    let names: Vec<String> = serde_json::from_str(raw)
        .map_err(|e| RepositoryError::Backend(format!("corrupt symbols_json: {e}")))?;
    names
        .into_iter()
        .map(|n| Symbol::new(&n).map_err(|e| RepositoryError::Backend(e.to_string())))
        .collect()
}

fn encode_state(state: &JobState) -> (&'static str, Option<String>) {
    match state {
        JobState::Pending => ("pending", None),
        JobState::InProgress => ("in_progress", None),
        JobState::Completed => ("completed", None),
        JobState::Failed { reason } => ("failed", Some(reason.clone())),
    }
}

fn decode_state(state: &str, fail_reason: Option<String>) -> Result<JobState, RepositoryError> {
    match state {
        "pending" => Ok(JobState::Pending),
        "in_progress" => Ok(JobState::InProgress),
        "completed" => Ok(JobState::Completed),
        "failed" => Ok(JobState::Failed {
            reason: fail_reason.unwrap_or_default(),
        }),
        other => Err(RepositoryError::Backend(format!("unknown job state '{other}'"))),
    }
}

fn decode_row(row: &sqlx::any::AnyRow) -> Result<IngestionJob, RepositoryError> {
    let id = IngestionJobId::parse(row.get::<String, _>("job_id"))
        .map_err(|e| RepositoryError::Backend(e.to_string()))?;
    let symbols = decode_symbols(&row.get::<String, _>("symbols_json"))?;
    let trading_date = NaiveDate::parse_from_str(&row.get::<String, _>("trading_date"), "%Y-%m-%d")
        .map_err(|e| RepositoryError::Backend(e.to_string()))?;
    let state = decode_state(&row.get::<String, _>("state"), row.get::<Option<String>, _>("fail_reason"))?;
    let started_at = parse_rfc3339(row.get::<Option<String>, _>("started_at"))?;
    let completed_at = parse_rfc3339(row.get::<Option<String>, _>("completed_at"))?;
    let version = row.get::<i64, _>("version");

    Ok(IngestionJob::reconstitute(id, symbols, trading_date, state, started_at, completed_at, version))
}

fn parse_rfc3339(raw: Option<String>) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepositoryError::Backend(e.to_string()))
    })
    .transpose()
}
