//! Partition write path (§4.5): partition-exclusive, dedup-on-append,
//! job-scoped file naming.

use std::fs::File;
use std::path::{Path, PathBuf};

use marketpipe_core::{Frame, IngestionJobId, OHLCVBar, Partition, Symbol};
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::convert::{bars_to_record_batch, record_batch_to_bars};
use crate::error::StorageError;
use crate::lock::PartitionLock;
use crate::schema::canonical_schema_ref;

pub const ROW_GROUP_TARGET: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Higher-ratio codec; the engine's default per §4.5's durability-at-rest resolution.
    Zstd,
    /// Opt-in fast codec.
    Snappy,
}

impl Codec {
    fn to_parquet(self) -> Compression {
        match self {
            Codec::Zstd => Compression::ZSTD(Default::default()),
            Codec::Snappy => Compression::SNAPPY,
        }
    }
}

fn assert_partition_match(bars: &[OHLCVBar], frame: Frame, symbol: &Symbol, date: chrono::NaiveDate) -> Result<(), StorageError> {
    for bar in bars {
        if bar.frame() != frame || bar.symbol() != symbol || bar.date() != date {
            return Err(StorageError::PartitionMismatch {
                expected: format!("frame={frame} symbol={symbol} date={date}"),
                found: format!("frame={} symbol={} date={}", bar.frame(), bar.symbol(), bar.date()),
            });
        }
    }
    Ok(())
}

pub fn write_partition(
    root: &Path,
    partition: &Partition,
    job_id: &IngestionJobId,
    bars: &[OHLCVBar],
    codec: Codec,
) -> Result<PathBuf, StorageError> {
    assert_partition_match(bars, partition.frame, &partition.symbol, partition.date)?;

    let partition_dir = root.join(partition.relative_dir());
    let _lock = PartitionLock::acquire(&partition_dir)?;

    let file_path = partition_dir.join(format!("{}.parquet", job_id.as_str()));

    let mut combined: Vec<OHLCVBar> = if file_path.exists() {
        read_file(&file_path)?
    } else {
        Vec::new()
    };
    combined.extend(bars.iter().cloned());
    combined.sort_by(|a, b| a.dedup_key().cmp(&b.dedup_key()));
    combined.dedup_by(|a, b| a.dedup_key() == b.dedup_key());

    write_file(&file_path, &combined, codec)?;
    Ok(file_path)
}

fn write_file(path: &Path, bars: &[OHLCVBar], codec: Codec) -> Result<(), StorageError> {
    let tmp_path = path.with_extension("parquet.tmp");
    let batch = bars_to_record_batch(bars)?;
    let props = WriterProperties::builder()
        .set_compression(codec.to_parquet())
        .set_max_row_group_size(ROW_GROUP_TARGET)
        .build();

    let file = File::create(&tmp_path).map_err(|e| StorageError::Io { path: tmp_path.clone(), source: e })?;
    let mut writer = ArrowWriter::try_new(file, canonical_schema_ref(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    std::fs::rename(&tmp_path, path).map_err(|e| StorageError::Io { path: path.to_path_buf(), source: e })?;
    Ok(())
}

pub fn read_file(path: &Path) -> Result<Vec<OHLCVBar>, StorageError> {
    let file = File::open(path).map_err(|e| StorageError::Io { path: path.to_path_buf(), source: e })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut out = Vec::new();
    for batch in reader {
        let batch = batch?;
        out.extend(record_batch_to_bars(&batch)?);
    }
    Ok(out)
}
