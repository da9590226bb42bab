//! Direct streaming inserts, one insert call per source batch
//!
//! Inserts are additive and not deduplicated: re-running after a partial load
//! inserts the already-loaded batches a second time.

use std::fmt;
use tracing::{debug, info, instrument, warn};

use super::ensure_table;
use crate::error::{ExportError, Result};
use crate::paginator::Paginator;
use crate::schema::SchemaVersion;
use crate::source::ImageSource;
use crate::transform::RecordTransformer;
use crate::warehouse::{RowInsertError, TableRef, Warehouse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertFailure {
    /// The warehouse answered with per-row errors
    Rejected(Vec<RowInsertError>),
    /// The insert call itself failed
    Transport(String),
}

impl fmt::Display for InsertFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertFailure::Rejected(errors) => write!(f, "{} row(s) rejected", errors.len()),
            InsertFailure::Transport(message) => write!(f, "insert call failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub index: usize,
    pub offset: u64,
    pub rows: usize,
    pub failure: InsertFailure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub total_batches: usize,
    pub rows_inserted: u64,
    pub succeeded: usize,
    pub failed: Vec<BatchFailure>,
}

impl InsertReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_indexes(&self) -> Vec<usize> {
        self.failed.iter().map(|f| f.index).collect()
    }

    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            return Ok(self);
        }
        Err(ExportError::PartialLoad {
            failed: self.failed.len(),
            total: self.total_batches,
            indexes: self.failed_indexes(),
        })
    }
}

impl fmt::Display for InsertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            write!(
                f,
                "{} rows inserted in {} batches",
                self.rows_inserted, self.total_batches
            )
        } else {
            write!(
                f,
                "partial load, {} of {} batches failed (batch indexes {:?})",
                self.failed.len(),
                self.total_batches,
                self.failed_indexes()
            )
        }
    }
}

pub struct StreamingInsertPipeline<'a> {
    source: &'a dyn ImageSource,
    warehouse: &'a dyn Warehouse,
    transformer: RecordTransformer,
    page_size: u64,
}

impl<'a> StreamingInsertPipeline<'a> {
    /// Fails with [`ExportError::UnsupportedSchema`] unless `transformer` uses the legacy schema
    pub fn new(
        source: &'a dyn ImageSource,
        warehouse: &'a dyn Warehouse,
        transformer: RecordTransformer,
        page_size: u64,
    ) -> Result<Self> {
        if transformer.schema() != SchemaVersion::Legacy {
            return Err(ExportError::UnsupportedSchema {
                path: "streaming insert",
                schema: transformer.schema(),
            });
        }

        Ok(Self {
            source,
            warehouse,
            transformer,
            page_size,
        })
    }

    #[instrument(skip(self), fields(table = %table))]
    pub async fn run(&self, tenant_id: &str, project_id: &str, table: &TableRef) -> Result<InsertReport> {
        let mut paginator = Paginator::open(self.source, tenant_id, project_id, self.page_size).await?;
        let mut report = InsertReport::default();

        if let Err(cause) = self
            .insert_batches(&mut paginator, tenant_id, project_id, table, &mut report)
            .await
        {
            return Err(aborted(tenant_id, project_id, report, cause));
        }

        if report.is_complete() {
            info!(rows = report.rows_inserted, batches = report.total_batches, "Streaming load complete");
        } else {
            warn!("{}", report);
        }

        Ok(report)
    }

    /// Insert every remaining batch, recording outcomes in `report`
    ///
    /// Insert failures are recorded and skipped; fetch, transform and table
    /// setup failures end the run.
    async fn insert_batches<S: ImageSource + ?Sized>(
        &self,
        paginator: &mut Paginator<'_, S>,
        tenant_id: &str,
        project_id: &str,
        table: &TableRef,
        report: &mut InsertReport,
    ) -> Result<()> {
        let mut table_ready = false;

        while let Some(batch) = paginator.next_batch().await? {
            let (index, offset) = (batch.index, batch.offset);
            let rows = self
                .transformer
                .transform_all(batch.records)
                .map_err(|e| ExportError::transform(tenant_id, project_id, index, offset, e))?;

            // a source that shrank mid-run yields empty windows
            if rows.is_empty() {
                debug!(index, offset, "Skipping empty batch");
                continue;
            }

            if !table_ready {
                ensure_table(self.warehouse, table, &self.transformer.schema().table_schema())
                    .await?;
                self.warehouse
                    .reload_table(table)
                    .await
                    .map_err(|e| ExportError::warehouse("table reload", table.to_string(), e))?;
                table_ready = true;
            }

            report.total_batches += 1;
            debug!(index, offset, rows = rows.len(), "Inserting batch");

            let failure = match self.warehouse.insert_rows(table, &rows).await {
                Ok(errors) if errors.is_empty() => None,
                Ok(errors) => Some(InsertFailure::Rejected(errors)),
                Err(e) => Some(InsertFailure::Transport(e.to_string())),
            };

            match failure {
                None => {
                    report.succeeded += 1;
                    report.rows_inserted += rows.len() as u64;
                },
                Some(failure) => {
                    warn!(index, offset, error = %failure, "Batch insert failed, continuing");
                    report.failed.push(BatchFailure {
                        index,
                        offset,
                        rows: rows.len(),
                        failure,
                    });
                },
            }
        }

        Ok(())
    }
}

/// Attach what was already inserted to a fatal error, once any batch was attempted
fn aborted(tenant_id: &str, project_id: &str, report: InsertReport, cause: ExportError) -> ExportError {
    if report.total_batches == 0 {
        return cause;
    }

    warn!(
        tenant_id = %tenant_id,
        project_id = %project_id,
        batches = report.total_batches,
        rows = report.rows_inserted,
        error = %cause,
        "Streaming load aborted, the table is partially loaded"
    );

    ExportError::StreamAborted {
        tenant_id: tenant_id.to_string(),
        project_id: project_id.to_string(),
        batches_attempted: report.total_batches,
        rows_inserted: report.rows_inserted,
        failed_indexes: report.failed_indexes(),
        source: Box::new(cause),
    }
}
