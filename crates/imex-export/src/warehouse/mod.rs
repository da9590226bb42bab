//! Analytics warehouse interface
//!
//! Covers what both load paths need: dataset/table existence and creation,
//! load-job submission and status, and streaming inserts.
//! [`BigQueryClient`] implements it over the REST API.

pub mod bigquery;

pub use bigquery::BigQueryClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::WarehouseRow;
use crate::schema::TableSchema;

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("warehouse API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("warehouse request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected warehouse response: {0}")]
    UnexpectedResponse(String),
}

impl WarehouseError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    pub project_id: String,
    pub dataset_id: String,
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_id, self.dataset_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub dataset: DatasetRef,
    pub table_id: String,
}

impl TableRef {
    pub fn new(project_id: &str, dataset_id: &str, table_id: &str) -> Self {
        Self {
            dataset: DatasetRef {
                project_id: project_id.to_string(),
                dataset_id: dataset_id.to_string(),
            },
            table_id: table_id.to_string(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.dataset.project_id
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table_id)
    }
}

/// Observed load job state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Done,
    /// Terminal failure with the warehouse's reason
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed(_))
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => f.write_str("PENDING"),
            JobState::Running => f.write_str("RUNNING"),
            JobState::Done => f.write_str("DONE"),
            JobState::Failed(_) => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceFormat {
    NewlineDelimitedJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteDisposition {
    /// Replace the whole table on success
    WriteTruncate,
    WriteAppend,
    WriteEmpty,
}

/// Everything needed to submit one bulk-load job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJobRequest {
    pub job_id: String,
    pub table: TableRef,
    pub source_uri: String,
    pub source_format: SourceFormat,
    pub write_disposition: WriteDisposition,
}

/// Rejection of a single row by a streaming insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowInsertError {
    /// Position of the row in the submitted slice
    pub index: usize,
    pub messages: Vec<String>,
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn dataset_exists(&self, dataset: &DatasetRef) -> Result<bool, WarehouseError>;

    async fn create_dataset(&self, dataset: &DatasetRef) -> Result<(), WarehouseError>;

    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError>;

    async fn create_table(&self, table: &TableRef, schema: &TableSchema)
        -> Result<(), WarehouseError>;

    /// Refresh table metadata and return its current schema
    async fn reload_table(&self, table: &TableRef) -> Result<TableSchema, WarehouseError>;

    /// Submit a load job and return its state right after submission
    async fn begin_load_job(&self, request: &LoadJobRequest) -> Result<JobState, WarehouseError>;

    async fn job_state(&self, project_id: &str, job_id: &str) -> Result<JobState, WarehouseError>;

    /// Insert rows synchronously, returning the per-row rejections (empty on success)
    async fn insert_rows(
        &self,
        table: &TableRef,
        rows: &[WarehouseRow],
    ) -> Result<Vec<RowInsertError>, WarehouseError>;
}
