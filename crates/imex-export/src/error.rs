//! Pipeline-level error type
//!
//! Every variant carries enough context (tenant, project, offset, object key,
//! job id) to triage a failed run from the log line alone.

use thiserror::Error;

use crate::schema::SchemaVersion;
use crate::source::SourceError;
use crate::storage::StorageError;
use crate::transform::TransformError;
use crate::warehouse::WarehouseError;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("fetching images for tenant '{tenant_id}', project '{project_id}' at offset {offset} (limit {limit}) failed: {source}")]
    SourceFetch {
        tenant_id: String,
        project_id: String,
        offset: u64,
        limit: u64,
        #[source]
        source: SourceError,
    },

    #[error("transforming batch {index} (offset {offset}) for tenant '{tenant_id}', project '{project_id}' failed: {source}")]
    Transform {
        tenant_id: String,
        project_id: String,
        index: usize,
        offset: u64,
        #[source]
        source: TransformError,
    },

    #[error("writing the local export buffer failed: {0}")]
    Sink(#[from] std::io::Error),

    #[error("uploading export to bucket '{bucket}' at '{key}' failed: {source}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("warehouse {operation} on '{target}' failed: {source}")]
    Warehouse {
        operation: &'static str,
        target: String,
        #[source]
        source: WarehouseError,
    },

    #[error("load job '{job_id}' still {last_state} after {polls} status checks; it may keep running unattended")]
    LoadJobIncomplete {
        job_id: String,
        polls: u32,
        last_state: String,
    },

    #[error("load job '{job_id}' failed: {reason}")]
    LoadJobFailed { job_id: String, reason: String },

    #[error("partial load, {failed} of {total} batches failed (batch indexes {indexes:?})")]
    PartialLoad {
        failed: usize,
        total: usize,
        indexes: Vec<usize>,
    },

    #[error("the {path} path does not support the {schema} schema")]
    UnsupportedSchema {
        path: &'static str,
        schema: SchemaVersion,
    },

    #[error("streaming load for tenant '{tenant_id}', project '{project_id}' aborted after {batches_attempted} batch(es), {rows_inserted} row(s) already inserted (failed batch indexes {failed_indexes:?}): {source}")]
    StreamAborted {
        tenant_id: String,
        project_id: String,
        batches_attempted: usize,
        rows_inserted: u64,
        failed_indexes: Vec<usize>,
        #[source]
        source: Box<ExportError>,
    },

    #[error("invalid pipeline configuration: {0}")]
    Config(String),
}

impl ExportError {
    pub fn source_fetch(
        tenant_id: &str,
        project_id: &str,
        offset: u64,
        limit: u64,
        source: SourceError,
    ) -> Self {
        Self::SourceFetch {
            tenant_id: tenant_id.to_string(),
            project_id: project_id.to_string(),
            offset,
            limit,
            source,
        }
    }

    pub fn transform(
        tenant_id: &str,
        project_id: &str,
        index: usize,
        offset: u64,
        source: TransformError,
    ) -> Self {
        Self::Transform {
            tenant_id: tenant_id.to_string(),
            project_id: project_id.to_string(),
            index,
            offset,
            source,
        }
    }

    pub fn warehouse(
        operation: &'static str,
        target: impl Into<String>,
        source: WarehouseError,
    ) -> Self {
        Self::Warehouse {
            operation,
            target: target.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
