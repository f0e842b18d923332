//! `IngestionJob` aggregate root and its state machine (§3).

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{InvariantViolation, ValidationError};
use crate::symbol::Symbol;

/// Stable, human-legible identity: `"{symbol}_{YYYY-MM-DD}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IngestionJobId(String);

impl IngestionJobId {
    pub fn new(symbol: &Symbol, date: NaiveDate) -> Self {
        Self(format!("{}_{}", symbol.as_str(), date.format("%Y-%m-%d")))
    }

    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let (symbol_part, date_part) = raw.rsplit_once('_').ok_or_else(|| {
            ValidationError::new(
                "job_id",
                "format",
                format!("'{raw}' is not of the form SYMBOL_YYYY-MM-DD"),
            )
        })?;
        Symbol::new(symbol_part)?;
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| {
            ValidationError::new("job_id", "format", format!("'{date_part}' is not a valid date"))
        })?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IngestionJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an [`IngestionJob`] (§3). Transitions form the DAG
/// `pending -> in_progress -> {completed, failed}`; anything else raises
/// [`InvariantViolation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    InProgress,
    Completed,
    Failed { reason: String },
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::InProgress => "in_progress",
            JobState::Completed => "completed",
            JobState::Failed { .. } => "failed",
        }
    }
}

/// Coordinator-scoped unit of work for one `(symbol, trading_date)` (§3).
///
/// `version` strictly increases on every persisted mutation (§4.4
/// optimistic concurrency token); the repository, not this type, is
/// responsible for persisting and comparing it, but the aggregate carries
/// its own copy so callers can detect staleness locally.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionJob {
    id: IngestionJobId,
    symbols: Vec<Symbol>,
    trading_date: NaiveDate,
    state: JobState,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    version: i64,
}

impl IngestionJob {
    pub fn new_pending(id: IngestionJobId, symbols: Vec<Symbol>, trading_date: NaiveDate) -> Self {
        Self {
            id,
            symbols,
            trading_date,
            state: JobState::Pending,
            started_at: None,
            completed_at: None,
            version: 0,
        }
    }

    /// Rebuild an aggregate from durable storage. Bypasses the state
    /// machine's transition guards since the row was already validated the
    /// last time it was written; repositories are the only expected caller.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: IngestionJobId,
        symbols: Vec<Symbol>,
        trading_date: NaiveDate,
        state: JobState,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
        version: i64,
    ) -> Self {
        Self {
            id,
            symbols,
            trading_date,
            state,
            started_at,
            completed_at,
            version,
        }
    }

    pub fn id(&self) -> &IngestionJobId {
        &self.id
    }
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
    pub fn trading_date(&self) -> NaiveDate {
        self.trading_date
    }
    pub fn state(&self) -> &JobState {
        &self.state
    }
    pub fn version(&self) -> i64 {
        self.version
    }
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), InvariantViolation> {
        match self.state {
            JobState::Pending => {
                self.state = JobState::InProgress;
                self.started_at = Some(now);
                self.version += 1;
                Ok(())
            }
            ref other => Err(InvariantViolation::new(
                "IngestionJob",
                format!("cannot start from state '{}'", other.as_str()),
            )),
        }
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), InvariantViolation> {
        match self.state {
            JobState::InProgress => {
                self.state = JobState::Completed;
                self.completed_at = Some(now);
                self.version += 1;
                Ok(())
            }
            ref other => Err(InvariantViolation::new(
                "IngestionJob",
                format!("cannot complete from state '{}'", other.as_str()),
            )),
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), InvariantViolation> {
        match self.state {
            JobState::InProgress => {
                self.state = JobState::Failed { reason: reason.into() };
                self.completed_at = Some(now);
                self.version += 1;
                Ok(())
            }
            ref other => Err(InvariantViolation::new(
                "IngestionJob",
                format!("cannot fail from state '{}'", other.as_str()),
            )),
        }
    }
}
