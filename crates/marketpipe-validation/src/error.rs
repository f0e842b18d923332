//! Validation Engine error taxonomy (§4.6, §7).

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ValidationEngineError {
    Storage(String),
    Io { path: PathBuf, source: std::io::Error },
    Csv(String),
}

impl fmt::Display for ValidationEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationEngineError::Storage(msg) => write!(f, "storage error: {msg}"),
            ValidationEngineError::Io { path, source } => write!(f, "io error at {}: {source}", path.display()),
            ValidationEngineError::Csv(msg) => write!(f, "csv error: {msg}"),
        }
    }
}

impl std::error::Error for ValidationEngineError {}

impl From<marketpipe_storage::StorageError> for ValidationEngineError {
    fn from(e: marketpipe_storage::StorageError) -> Self {
        ValidationEngineError::Storage(e.to_string())
    }
}

impl From<csv::Error> for ValidationEngineError {
    fn from(e: csv::Error) -> Self {
        ValidationEngineError::Csv(e.to_string())
    }
}
