//! marketpipe-storage
//!
//! Durable, partitioned, columnar persistence of `OHLCVBar` sequences
//! (§4.5). One Hive-style directory tree rooted at `StorageEngine::root`;
//! one Parquet file per `(partition, job_id)`; a sidecar `.lock` file
//! serializes writers targeting the same partition while writers for
//! distinct partitions proceed independently.

pub mod convert;
pub mod error;
pub mod lock;
pub mod read;
pub mod schema;
pub mod stats;
pub mod write;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use marketpipe_core::{Frame, IngestionJobId, OHLCVBar, Partition, Symbol};

pub use error::StorageError;
pub use stats::{IntegrityReport, PartitionStats};
pub use write::Codec;

pub struct StorageEngine {
    root: PathBuf,
    codec: Codec,
}

impl StorageEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), codec: Codec::Zstd }
    }

    pub fn with_codec(root: impl Into<PathBuf>, codec: Codec) -> Self {
        Self { root: root.into(), codec }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// §4.5 `write(bars, frame, symbol, trading_date, job_id) -> file_path`.
    pub fn write(
        &self,
        bars: &[OHLCVBar],
        partition: &Partition,
        job_id: &IngestionJobId,
    ) -> Result<PathBuf, StorageError> {
        write::write_partition(&self.root, partition, job_id, bars, self.codec)
    }

    /// §4.5 `read(frame, symbol, start_date, end_date) -> ...`.
    pub fn read(
        &self,
        frame: Frame,
        symbol: &Symbol,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OHLCVBar>, StorageError> {
        read::read(&self.root, frame, symbol, start_date, end_date)
    }

    pub fn list_partitions(&self) -> Result<Vec<Partition>, StorageError> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for frame_entry in read_subdirs(&self.root)? {
            let Some(frame) = strip_kv(&frame_entry, "frame").and_then(|s| Frame::parse(s).ok()) else {
                continue;
            };
            for symbol_entry in read_subdirs(&frame_entry)? {
                let Some(symbol) = strip_kv(&symbol_entry, "symbol").and_then(|s| Symbol::new(s).ok()) else {
                    continue;
                };
                for date_entry in read_subdirs(&symbol_entry)? {
                    let Some(date) = strip_kv(&date_entry, "date")
                        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                    else {
                        continue;
                    };
                    if has_parquet_file(&date_entry)? {
                        out.push(Partition::new(frame, symbol.clone(), date));
                    }
                }
            }
        }
        Ok(out)
    }

    pub fn delete_partition(&self, partition: &Partition) -> Result<(), StorageError> {
        let dir = self.root.join(partition.relative_dir());
        if !dir.exists() {
            return Ok(());
        }
        {
            let _lock = lock::PartitionLock::acquire(&dir)?;
            for entry in std::fs::read_dir(&dir).map_err(|e| StorageError::Io { path: dir.clone(), source: e })? {
                let entry = entry.map_err(|e| StorageError::Io { path: dir.clone(), source: e })?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
                    std::fs::remove_file(&path).map_err(|e| StorageError::Io { path, source: e })?;
                }
            }
        }
        std::fs::remove_dir_all(&dir).map_err(|e| StorageError::Io { path: dir, source: e })?;
        Ok(())
    }

    pub fn stats(&self, partition: &Partition) -> Result<PartitionStats, StorageError> {
        let dir = self.root.join(partition.relative_dir());
        if !dir.exists() {
            return Ok(PartitionStats::default());
        }
        let mut stats = PartitionStats::default();
        for entry in std::fs::read_dir(&dir).map_err(|e| StorageError::Io { path: dir.clone(), source: e })? {
            let entry = entry.map_err(|e| StorageError::Io { path: dir.clone(), source: e })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            let meta = std::fs::metadata(&path).map_err(|e| StorageError::Io { path: path.clone(), source: e })?;
            stats.file_count += 1;
            stats.total_bytes += meta.len();
            stats.row_count += write::read_file(&path)?.len();
        }
        Ok(stats)
    }

    /// §4.5 `validate_integrity(triple) -> {row_count, null_ct, monotonic_ts, min_ts, max_ts}`.
    pub fn validate_integrity(&self, partition: &Partition) -> Result<IntegrityReport, StorageError> {
        let bars = read::read_partition_files(&self.root, partition.frame, &partition.symbol, partition.date)?;

        let row_count = bars.len();
        let null_ct = bars
            .iter()
            .map(|b| usize::from(b.trade_count().is_none()) + usize::from(b.vwap().is_none()))
            .sum();
        let min_ts = bars.iter().map(|b| b.timestamp()).min();
        let max_ts = bars.iter().map(|b| b.timestamp()).max();
        let monotonic_ts = bars.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp());

        Ok(IntegrityReport { row_count, null_ct, monotonic_ts, min_ts, max_ts })
    }
}

fn read_subdirs(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| StorageError::Io { path: dir.to_path_buf(), source: e })? {
        let entry = entry.map_err(|e| StorageError::Io { path: dir.to_path_buf(), source: e })?;
        if entry.path().is_dir() {
            out.push(entry.path());
        }
    }
    Ok(out)
}

fn strip_kv<'a>(dir: &'a Path, key: &str) -> Option<&'a str> {
    dir.file_name()?.to_str()?.strip_prefix(format!("{key}=").as_str())
}

fn has_parquet_file(dir: &Path) -> Result<bool, StorageError> {
    for entry in std::fs::read_dir(dir).map_err(|e| StorageError::Io { path: dir.to_path_buf(), source: e })? {
        let entry = entry.map_err(|e| StorageError::Io { path: dir.to_path_buf(), source: e })?;
        if entry.path().extension().and_then(|e| e.to_str()) == Some("parquet") {
            return Ok(true);
        }
    }
    Ok(false)
}
