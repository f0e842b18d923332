//! Ingestion Coordinator error taxonomy (§4.9, §7).

use std::fmt;

#[derive(Debug)]
pub enum IngestError {
    Provider(String),
    Repository(String),
    Storage(String),
    Validation(String),
    Aggregation(String),
    Invariant(String),
    RateLimited,
    Cancelled,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Provider(msg) => write!(f, "provider error: {msg}"),
            IngestError::Repository(msg) => write!(f, "repository error: {msg}"),
            IngestError::Storage(msg) => write!(f, "storage error: {msg}"),
            IngestError::Validation(msg) => write!(f, "validation error: {msg}"),
            IngestError::Aggregation(msg) => write!(f, "aggregation error: {msg}"),
            IngestError::Invariant(msg) => write!(f, "invariant violation: {msg}"),
            IngestError::RateLimited => write!(f, "rate limiter admission deadline exceeded"),
            IngestError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<marketpipe_provider::ProviderError> for IngestError {
    fn from(e: marketpipe_provider::ProviderError) -> Self {
        IngestError::Provider(e.to_string())
    }
}

impl From<marketpipe_repo::RepositoryError> for IngestError {
    fn from(e: marketpipe_repo::RepositoryError) -> Self {
        IngestError::Repository(e.to_string())
    }
}

impl From<marketpipe_storage::StorageError> for IngestError {
    fn from(e: marketpipe_storage::StorageError) -> Self {
        IngestError::Storage(e.to_string())
    }
}

impl From<marketpipe_validation::ValidationEngineError> for IngestError {
    fn from(e: marketpipe_validation::ValidationEngineError) -> Self {
        IngestError::Validation(e.to_string())
    }
}

impl From<marketpipe_aggregate::AggregationError> for IngestError {
    fn from(e: marketpipe_aggregate::AggregationError) -> Self {
        IngestError::Aggregation(e.to_string())
    }
}

impl From<marketpipe_core::InvariantViolation> for IngestError {
    fn from(e: marketpipe_core::InvariantViolation) -> Self {
        IngestError::Invariant(e.to_string())
    }
}

impl From<marketpipe_ratelimit::RateLimitTimeout> for IngestError {
    fn from(_: marketpipe_ratelimit::RateLimitTimeout) -> Self {
        IngestError::RateLimited
    }
}

impl From<marketpipe_core::ValidationError> for IngestError {
    fn from(e: marketpipe_core::ValidationError) -> Self {
        IngestError::Invariant(e.to_string())
    }
}

impl From<marketpipe_core::Cancelled> for IngestError {
    fn from(_: marketpipe_core::Cancelled) -> Self {
        IngestError::Cancelled
    }
}
