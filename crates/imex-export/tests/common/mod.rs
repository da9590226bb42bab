//! In-memory collaborators for pipeline integration tests
//!
//! - [`FakeSource`]: serves a fixed record list and records every list call
//! - [`FakeStore`]: keeps uploaded files in memory
//! - [`FakeWarehouse`]: tracks datasets/tables and replays scripted job states

#![allow(dead_code)]

use async_trait::async_trait;
use imex_export::models::{RawVisionAnnotations, SourceRecord};
use imex_export::schema::TableSchema;
use imex_export::source::{ImagePage, ImageSource, SourceError};
use imex_export::storage::{ObjectStore, StorageError, UploadReceipt};
use imex_export::warehouse::{
    DatasetRef, JobState, LoadJobRequest, RowInsertError, TableRef, Warehouse, WarehouseError,
};
use imex_export::WarehouseRow;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

pub fn record(id: usize) -> SourceRecord {
    let mut exif = BTreeMap::new();
    exif.insert("Make".to_string(), "Canon".to_string());

    SourceRecord {
        project_id: Some("proj".to_string()),
        id: format!("img-{:04}", id),
        version: "1".to_string(),
        job_id: "ingest-7".to_string(),
        original_uri: Some(format!("gs://raw/img-{:04}.jpg", id)),
        exif_annotations: Some(exif),
        vision_annotations: None,
        annotations: None,
    }
}

pub fn records(count: usize) -> Vec<SourceRecord> {
    (0..count).map(record).collect()
}

/// Record carrying a flat vision map, valid only for the legacy schema
pub fn legacy_record(id: usize) -> SourceRecord {
    let mut vision = BTreeMap::new();
    vision.insert("labels".to_string(), r#"[{"description":"cat"}]"#.to_string());

    SourceRecord {
        vision_annotations: Some(RawVisionAnnotations::Map(vision)),
        ..record(id)
    }
}

// ============================================================================
// Source
// ============================================================================

pub struct FakeSource {
    records: Vec<SourceRecord>,
    calls: Mutex<Vec<(u64, u64)>>,
    fail_at_offset: Option<u64>,
    reported_total: Option<u64>,
}

impl FakeSource {
    pub fn new(records: Vec<SourceRecord>) -> Self {
        Self {
            records,
            calls: Mutex::new(Vec::new()),
            fail_at_offset: None,
            reported_total: None,
        }
    }

    /// Report `total` regardless of how many records are actually served
    pub fn reporting_total(mut self, total: u64) -> Self {
        self.reported_total = Some(total);
        self
    }

    pub fn failing_at(mut self, offset: u64) -> Self {
        self.fail_at_offset = Some(offset);
        self
    }

    /// `(offset, limit)` of every list call, total query included
    pub fn calls(&self) -> Vec<(u64, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSource for FakeSource {
    async fn list(
        &self,
        _tenant_id: &str,
        _project_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<ImagePage, SourceError> {
        self.calls.lock().unwrap().push((offset, limit));

        if self.fail_at_offset == Some(offset) {
            return Err(SourceError::api(503, "service unavailable"));
        }

        let start = (offset as usize).min(self.records.len());
        let end = (start + limit as usize).min(self.records.len());

        Ok(ImagePage {
            items: self.records[start..end].to_vec(),
            total: self.reported_total.unwrap_or(self.records.len() as u64),
        })
    }
}

// ============================================================================
// Object store
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub body: String,
}

#[derive(Default)]
pub struct FakeStore {
    buckets: Mutex<HashSet<String>>,
    objects: Mutex<Vec<StoredObject>>,
    fail_uploads: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains(bucket)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get_or_create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.buckets.lock().unwrap().insert(bucket.to_string());
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        content_type: &str,
    ) -> Result<UploadReceipt, StorageError> {
        if self.fail_uploads {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "connection reset".to_string(),
            });
        }

        let body = std::fs::read_to_string(file)?;
        let size = body.len() as u64;
        self.objects.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            body,
        });

        Ok(UploadReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            uri: self.object_uri(bucket, key),
        })
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("gs://{}/{}", bucket, key)
    }
}

// ============================================================================
// Warehouse
// ============================================================================

/// One scripted answer to a job status check
#[derive(Debug, Clone)]
pub enum Poll {
    State(JobState),
    Error,
}

pub struct FakeWarehouse {
    datasets: Mutex<HashSet<DatasetRef>>,
    tables: Mutex<HashMap<TableRef, TableSchema>>,
    created: Mutex<Vec<String>>,
    initial_state: JobState,
    polls: Mutex<VecDeque<Poll>>,
    poll_count: Mutex<u32>,
    load_jobs: Mutex<Vec<LoadJobRequest>>,
    reloads: Mutex<u32>,
    inserts: Mutex<Vec<usize>>,
    failing_insert_calls: HashSet<usize>,
    rejecting_insert_calls: HashSet<usize>,
}

impl Default for FakeWarehouse {
    fn default() -> Self {
        Self {
            datasets: Mutex::new(HashSet::new()),
            tables: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            initial_state: JobState::Pending,
            polls: Mutex::new(VecDeque::new()),
            poll_count: Mutex::new(0),
            load_jobs: Mutex::new(Vec::new()),
            reloads: Mutex::new(0),
            inserts: Mutex::new(Vec::new()),
            failing_insert_calls: HashSet::new(),
            rejecting_insert_calls: HashSet::new(),
        }
    }
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Job status answers, in order; the last one repeats once the script runs out
    pub fn with_polls(self, polls: Vec<Poll>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn with_initial_state(mut self, state: JobState) -> Self {
        self.initial_state = state;
        self
    }

    pub fn with_existing_table(self, table: &TableRef, schema: TableSchema) -> Self {
        self.datasets.lock().unwrap().insert(table.dataset.clone());
        self.tables.lock().unwrap().insert(table.clone(), schema);
        self
    }

    /// Insert call `n` (zero-based) fails at the transport level
    pub fn failing_insert(mut self, call: usize) -> Self {
        self.failing_insert_calls.insert(call);
        self
    }

    /// Insert call `n` (zero-based) comes back with a row rejection
    pub fn rejecting_insert(mut self, call: usize) -> Self {
        self.rejecting_insert_calls.insert(call);
        self
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn table_schema(&self, table: &TableRef) -> Option<TableSchema> {
        self.tables.lock().unwrap().get(table).cloned()
    }

    pub fn load_jobs(&self) -> Vec<LoadJobRequest> {
        self.load_jobs.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> u32 {
        *self.poll_count.lock().unwrap()
    }

    pub fn reloads(&self) -> u32 {
        *self.reloads.lock().unwrap()
    }

    /// Row count of every insert call, failed ones included
    pub fn inserts(&self) -> Vec<usize> {
        self.inserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn dataset_exists(&self, dataset: &DatasetRef) -> Result<bool, WarehouseError> {
        Ok(self.datasets.lock().unwrap().contains(dataset))
    }

    async fn create_dataset(&self, dataset: &DatasetRef) -> Result<(), WarehouseError> {
        self.datasets.lock().unwrap().insert(dataset.clone());
        self.created.lock().unwrap().push(format!("dataset:{}", dataset));
        Ok(())
    }

    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError> {
        Ok(self.tables.lock().unwrap().contains_key(table))
    }

    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<(), WarehouseError> {
        self.tables.lock().unwrap().insert(table.clone(), schema.clone());
        self.created.lock().unwrap().push(format!("table:{}", table));
        Ok(())
    }

    async fn reload_table(&self, table: &TableRef) -> Result<TableSchema, WarehouseError> {
        *self.reloads.lock().unwrap() += 1;
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .ok_or_else(|| WarehouseError::api(404, "not found"))
    }

    async fn begin_load_job(&self, request: &LoadJobRequest) -> Result<JobState, WarehouseError> {
        self.load_jobs.lock().unwrap().push(request.clone());
        Ok(self.initial_state.clone())
    }

    async fn job_state(&self, _project_id: &str, _job_id: &str) -> Result<JobState, WarehouseError> {
        *self.poll_count.lock().unwrap() += 1;

        let mut polls = self.polls.lock().unwrap();
        let next = if polls.len() > 1 {
            polls.pop_front()
        } else {
            polls.front().cloned()
        };

        match next.unwrap_or(Poll::State(JobState::Running)) {
            Poll::State(state) => Ok(state),
            Poll::Error => Err(WarehouseError::UnexpectedResponse("status unavailable".into())),
        }
    }

    async fn insert_rows(
        &self,
        _table: &TableRef,
        rows: &[WarehouseRow],
    ) -> Result<Vec<RowInsertError>, WarehouseError> {
        let call = {
            let mut inserts = self.inserts.lock().unwrap();
            inserts.push(rows.len());
            inserts.len() - 1
        };

        if self.failing_insert_calls.contains(&call) {
            return Err(WarehouseError::api(500, "backend error"));
        }
        if self.rejecting_insert_calls.contains(&call) {
            return Ok(vec![RowInsertError {
                index: 0,
                messages: vec!["invalid: no such field".to_string()],
            }]);
        }
        Ok(Vec::new())
    }
}
