//! Repository error taxonomy (§4.4, §7).

use std::fmt;

#[derive(Debug)]
pub enum RepositoryError {
    NotFound { kind: &'static str, id: String },
    DuplicateKey { kind: &'static str, id: String },
    /// Optimistic-concurrency compare-and-swap lost the race: the row's
    /// version no longer matched `expected` at update time.
    Concurrency { expected: i64, actual: i64 },
    Backend(String),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::NotFound { kind, id } => write!(f, "{kind} '{id}' not found"),
            RepositoryError::DuplicateKey { kind, id } => write!(f, "{kind} '{id}' already exists"),
            RepositoryError::Concurrency { expected, actual } => {
                write!(f, "concurrency conflict: expected version {expected}, row is at {actual}")
            }
            RepositoryError::Backend(msg) => write!(f, "repository backend error: {msg}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::Backend(e.to_string())
    }
}
