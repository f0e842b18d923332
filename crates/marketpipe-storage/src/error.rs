//! Storage Engine error taxonomy (§4.5, §7).

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum StorageError {
    /// A bar handed to `write` didn't match the declared partition triple.
    PartitionMismatch { expected: String, found: String },
    LockContention { path: PathBuf },
    Io { path: PathBuf, source: std::io::Error },
    Parquet(String),
    Arrow(String),
    CorruptRow(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::PartitionMismatch { expected, found } => {
                write!(f, "bar does not belong to partition {expected}, got {found}")
            }
            StorageError::LockContention { path } => {
                write!(f, "could not acquire partition lock at {}", path.display())
            }
            StorageError::Io { path, source } => write!(f, "io error at {}: {source}", path.display()),
            StorageError::Parquet(msg) => write!(f, "parquet error: {msg}"),
            StorageError::Arrow(msg) => write!(f, "arrow error: {msg}"),
            StorageError::CorruptRow(msg) => write!(f, "corrupt stored row: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<parquet::errors::ParquetError> for StorageError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        StorageError::Parquet(e.to_string())
    }
}

impl From<arrow::error::ArrowError> for StorageError {
    fn from(e: arrow::error::ArrowError) -> Self {
        StorageError::Arrow(e.to_string())
    }
}
