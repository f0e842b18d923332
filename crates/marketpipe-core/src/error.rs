//! Shared error taxonomy used across the ingestion–validation–aggregation
//! pipeline (§7). Each crate additionally defines its own local error
//! variants (`ProviderError`, `StorageError`, the repository family); the
//! types here are the ones that cross crate boundaries unchanged.

use std::fmt;

/// Raised whenever a value-model constructor or entity state transition
/// rejects its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field or attribute that failed validation (e.g. `"high"`).
    pub field: &'static str,
    /// A short, stable rule identifier (e.g. `"ohlc_consistency"`).
    pub rule: &'static str,
    /// Human-readable detail for logs; never included in `PartialEq`-driven
    /// test assertions on purpose, callers compare `field`/`rule`.
    pub detail: String,
}

impl ValidationError {
    pub fn new(field: &'static str, rule: &'static str, detail: impl Into<String>) -> Self {
        Self {
            field,
            rule,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "validation failed: field={} rule={} detail={}",
            self.field, self.rule, self.detail
        )
    }
}

impl std::error::Error for ValidationError {}

/// Raised when an `IngestionJob` (or any other state-machine aggregate)
/// is asked to perform a transition that its current state forbids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub aggregate: &'static str,
    pub message: String,
}

impl InvariantViolation {
    pub fn new(aggregate: &'static str, message: impl Into<String>) -> Self {
        Self {
            aggregate,
            message: message.into(),
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invariant violation in {}: {}", self.aggregate, self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Cooperative cancellation reached a suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// A caller-supplied deadline expired while waiting on a suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout;

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for Timeout {}
