//! Aggregation Engine error taxonomy (§4.8, §7).

use std::fmt;

#[derive(Debug)]
pub enum AggregationError {
    Storage(String),
    Query(String),
}

impl fmt::Display for AggregationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationError::Storage(msg) => write!(f, "storage error: {msg}"),
            AggregationError::Query(msg) => write!(f, "query engine error: {msg}"),
        }
    }
}

impl std::error::Error for AggregationError {}

impl From<marketpipe_storage::StorageError> for AggregationError {
    fn from(e: marketpipe_storage::StorageError) -> Self {
        AggregationError::Storage(e.to_string())
    }
}

impl From<datafusion::error::DataFusionError> for AggregationError {
    fn from(e: datafusion::error::DataFusionError) -> Self {
        AggregationError::Query(e.to_string())
    }
}
