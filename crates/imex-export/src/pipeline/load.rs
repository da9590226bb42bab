//! Bulk load of an exported object and tracking of the resulting job

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::ensure_table;
use crate::config::{PipelineConfig, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS};
use crate::error::{ExportError, Result};
use crate::schema::SchemaVersion;
use crate::warehouse::{
    JobState, LoadJobRequest, SourceFormat, TableRef, Warehouse, WriteDisposition,
};

/// Fixed-interval status polling with a bounded number of checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

impl From<&PipelineConfig> for PollPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            attempts: config.poll_attempts,
        }
    }
}

impl PollPolicy {
    /// Upper bound on time spent waiting for the job
    pub fn max_wait(&self) -> Duration {
        self.interval * self.attempts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Succeeded,
    /// Budget spent while the job was still pending or running
    IncompleteAfterBudget { last_state: JobState },
    Failed { reason: String },
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Succeeded => f.write_str("succeeded"),
            LoadOutcome::IncompleteAfterBudget { last_state } => {
                write!(f, "incomplete (last state {})", last_state)
            },
            LoadOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub job_id: String,
    pub outcome: LoadOutcome,
    /// Status checks performed after submission
    pub polls: u32,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.outcome == LoadOutcome::Succeeded
    }

    /// Turn any non-success outcome into an error
    pub fn into_result(self) -> Result<Self> {
        match self.outcome {
            LoadOutcome::Succeeded => Ok(self),
            LoadOutcome::IncompleteAfterBudget { last_state } => {
                Err(ExportError::LoadJobIncomplete {
                    job_id: self.job_id,
                    polls: self.polls,
                    last_state: last_state.to_string(),
                })
            },
            LoadOutcome::Failed { reason } => Err(ExportError::LoadJobFailed {
                job_id: self.job_id,
                reason,
            }),
        }
    }
}

pub struct LoadJobOrchestrator<'a> {
    warehouse: &'a dyn Warehouse,
    schema: SchemaVersion,
    policy: PollPolicy,
}

impl<'a> LoadJobOrchestrator<'a> {
    pub fn new(warehouse: &'a dyn Warehouse, schema: SchemaVersion, policy: PollPolicy) -> Self {
        Self {
            warehouse,
            schema,
            policy,
        }
    }

    /// Replace the contents of `table` with the object at `source_uri`
    ///
    /// Only setup and submission errors are returned as `Err`. How the job
    /// itself ended is carried by the report's [`LoadOutcome`].
    #[instrument(skip(self), fields(table = %table))]
    pub async fn run(&self, table: &TableRef, source_uri: &str) -> Result<LoadReport> {
        ensure_table(self.warehouse, table, &self.schema.table_schema()).await?;

        let request = LoadJobRequest {
            job_id: Uuid::new_v4().to_string(),
            table: table.clone(),
            source_uri: source_uri.to_string(),
            source_format: SourceFormat::NewlineDelimitedJson,
            write_disposition: WriteDisposition::WriteTruncate,
        };

        let mut state = self
            .warehouse
            .begin_load_job(&request)
            .await
            .map_err(|e| ExportError::warehouse("load job submission", table.to_string(), e))?;

        let job_id = request.job_id;
        info!(job_id = %job_id, source_uri = %source_uri, "Load job started");

        let mut remaining = self.policy.attempts;
        let mut polls = 0u32;

        while !state.is_terminal() && remaining > 0 {
            tokio::time::sleep(self.policy.interval).await;
            remaining -= 1;
            polls += 1;

            match self.warehouse.job_state(table.project_id(), &job_id).await {
                Ok(observed) => {
                    debug!(job_id = %job_id, state = %observed, remaining, "Load job status");
                    state = observed;
                },
                Err(e) => {
                    warn!(job_id = %job_id, remaining, error = %e, "Load job status check failed");
                },
            }
        }

        let outcome = match state {
            JobState::Done => {
                info!(job_id = %job_id, polls, "Load job finished");
                LoadOutcome::Succeeded
            },
            JobState::Failed(reason) => {
                error!(job_id = %job_id, reason = %reason, "Load job failed");
                LoadOutcome::Failed { reason }
            },
            last_state => {
                warn!(
                    job_id = %job_id,
                    polls,
                    state = %last_state,
                    "Gave up waiting for load job, it may still complete on the warehouse side"
                );
                LoadOutcome::IncompleteAfterBudget { last_state }
            },
        };

        Ok(LoadReport {
            job_id,
            outcome,
            polls,
        })
    }
}
