//! Partition diagnostics (§4.5 "Integrity", "stats").

use marketpipe_core::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionStats {
    pub file_count: usize,
    pub row_count: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityReport {
    pub row_count: usize,
    pub null_ct: usize,
    pub monotonic_ts: bool,
    pub min_ts: Option<Timestamp>,
    pub max_ts: Option<Timestamp>,
}
