//! Export, load and streaming pipelines

pub mod export;
pub mod load;
pub mod stream;

pub use export::{export_key, BatchExportPipeline, ExportSummary};
pub use load::{LoadJobOrchestrator, LoadOutcome, LoadReport, PollPolicy};
pub use stream::{BatchFailure, InsertFailure, InsertReport, StreamingInsertPipeline};

use tracing::info;

use crate::error::{ExportError, Result};
use crate::schema::TableSchema;
use crate::warehouse::{TableRef, Warehouse};

/// Create the dataset and table if they do not exist yet
///
/// Existing objects are left untouched, including a table whose schema
/// differs from `schema`.
pub async fn ensure_table<W: Warehouse + ?Sized>(
    warehouse: &W,
    table: &TableRef,
    schema: &TableSchema,
) -> Result<()> {
    let dataset = &table.dataset;

    let dataset_exists = warehouse
        .dataset_exists(dataset)
        .await
        .map_err(|e| ExportError::warehouse("dataset lookup", dataset.to_string(), e))?;
    if !dataset_exists {
        warehouse
            .create_dataset(dataset)
            .await
            .map_err(|e| ExportError::warehouse("dataset creation", dataset.to_string(), e))?;
        info!(dataset = %dataset, "Created dataset");
    }

    let table_exists = warehouse
        .table_exists(table)
        .await
        .map_err(|e| ExportError::warehouse("table lookup", table.to_string(), e))?;
    if !table_exists {
        warehouse
            .create_table(table, schema)
            .await
            .map_err(|e| ExportError::warehouse("table creation", table.to_string(), e))?;
        info!(table = %table, "Created table");
    }

    Ok(())
}
