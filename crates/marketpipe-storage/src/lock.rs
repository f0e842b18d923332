//! Per-partition exclusive write lock (§4.5): a sidecar `.lock` file next
//! to the partition directory, held for the duration of one `write` call.
//! Writers for distinct partitions never contend; writers for the same
//! partition serialize.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::FileExt;

use crate::error::StorageError;

pub struct PartitionLock {
    _file: File,
    path: PathBuf,
}

impl PartitionLock {
    /// Block until the lock is acquired. Used by `write`, where waiting is
    /// the correct behavior (the spec requires writers to serialize, not
    /// to fail under contention).
    pub fn acquire(partition_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(partition_dir).map_err(|e| StorageError::Io {
            path: partition_dir.to_path_buf(),
            source: e,
        })?;
        let path = partition_dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|e| StorageError::Io { path: path.clone(), source: e })?;
        file.lock_exclusive().map_err(|_| StorageError::LockContention { path: path.clone() })?;
        Ok(Self { _file: file, path })
    }
}

impl Drop for PartitionLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self._file);
        let _ = &self.path;
    }
}
