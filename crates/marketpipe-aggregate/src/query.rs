//! SQL-surface registration hook (§6 "a refreshable logical-view
//! registration hook that a SQL engine can call"). The same listing-table
//! registration used internally isn't needed for the roll-up itself
//! (`rollup.rs` computes it directly over `OHLCVBar`s), but is exposed
//! here so an external analytic reader gets a SQL view over the
//! partition tree for free.

use std::path::Path;
use std::sync::Arc;

use datafusion::arrow::datatypes::DataType;
use datafusion::datasource::file_format::parquet::ParquetFormat;
use datafusion::datasource::listing::{ListingOptions, ListingTable, ListingTableConfig, ListingTableUrl};
use datafusion::prelude::SessionContext;
use marketpipe_core::Frame;

use crate::error::AggregationError;

/// Register one table per frame (`bars_1m`, `bars_5m`, ...) over
/// `<root>/frame=<frame>/`, with `symbol` and `date` recovered as Hive
/// partition columns. Frames with no data directory yet are skipped.
pub async fn register_all_partitions(ctx: &SessionContext, root: &Path) -> Result<Vec<String>, AggregationError> {
    let mut registered = Vec::new();

    for frame in Frame::ALL {
        let dir = root.join(format!("frame={frame}"));
        if !dir.exists() {
            continue;
        }

        let table_url = ListingTableUrl::parse(dir.to_string_lossy())?;
        let listing_options = ListingOptions::new(Arc::new(ParquetFormat::default()))
            .with_file_extension(".parquet")
            .with_table_partition_cols(vec![
                ("symbol".to_string(), DataType::Utf8),
                ("date".to_string(), DataType::Utf8),
            ]);

        let config = ListingTableConfig::new(table_url)
            .with_listing_options(listing_options)
            .infer_schema(&ctx.state())
            .await?;
        let table = ListingTable::try_new(config)?;

        let table_name = format!("bars_{frame}");
        ctx.register_table(table_name.as_str(), Arc::new(table))?;
        registered.push(table_name);
    }

    Ok(registered)
}
