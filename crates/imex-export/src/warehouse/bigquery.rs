//! BigQuery REST client

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{
    DatasetRef, JobState, LoadJobRequest, RowInsertError, TableRef, Warehouse, WarehouseError,
};
use crate::config::WarehouseConfig;
use crate::models::WarehouseRow;
use crate::schema::TableSchema;

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct TableResource {
    #[serde(default)]
    schema: Option<TableSchema>,
}

#[derive(Debug, Deserialize)]
struct JobResource {
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorProto {
    fn describe(&self) -> String {
        match (&self.reason, &self.message) {
            (Some(reason), Some(message)) => format!("{}: {}", reason, message),
            (None, Some(message)) => message.clone(),
            (Some(reason), None) => reason.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct InsertAllRequest<'a> {
    rows: Vec<InsertRow<'a>>,
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    json: &'a WarehouseRow,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertErrors>,
}

#[derive(Debug, Deserialize)]
struct InsertErrors {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

/// Warehouse backed by the BigQuery v2 REST API
#[derive(Debug, Clone)]
pub struct BigQueryClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    location: Option<String>,
}

impl BigQueryClient {
    pub fn new(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            location: config.location.clone(),
        })
    }

    fn dataset_url(&self, dataset: &DatasetRef) -> String {
        format!(
            "{}/projects/{}/datasets/{}",
            self.base_url, dataset.project_id, dataset.dataset_id
        )
    }

    fn table_url(&self, table: &TableRef) -> String {
        format!("{}/tables/{}", self.dataset_url(&table.dataset), table.table_id)
    }

    fn jobs_url(&self, project_id: &str) -> String {
        format!("{}/projects/{}/jobs", self.base_url, project_id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `Ok(None)` on 404, the body on success, an API error otherwise
    async fn read_optional(response: Response) -> Result<Option<String>, WarehouseError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WarehouseError::api(status.as_u16(), body));
        }
        Ok(Some(body))
    }

    async fn read(response: Response) -> Result<String, WarehouseError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WarehouseError::api(status.as_u16(), body));
        }
        Ok(body)
    }

    fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, WarehouseError> {
        serde_json::from_str(body).map_err(|e| WarehouseError::UnexpectedResponse(e.to_string()))
    }

    fn job_state_from(status: JobStatus) -> Result<JobState, WarehouseError> {
        if let Some(error) = status.error_result {
            return Ok(JobState::Failed(error.describe()));
        }
        match status.state.as_str() {
            "PENDING" => Ok(JobState::Pending),
            "RUNNING" => Ok(JobState::Running),
            "DONE" => Ok(JobState::Done),
            other => Err(WarehouseError::UnexpectedResponse(format!(
                "unknown job state '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    #[instrument(skip(self), fields(dataset = %dataset))]
    async fn dataset_exists(&self, dataset: &DatasetRef) -> Result<bool, WarehouseError> {
        let response = self
            .authorized(self.client.get(self.dataset_url(dataset)))
            .send()
            .await?;
        Ok(Self::read_optional(response).await?.is_some())
    }

    #[instrument(skip(self), fields(dataset = %dataset))]
    async fn create_dataset(&self, dataset: &DatasetRef) -> Result<(), WarehouseError> {
        let mut body = json!({
            "datasetReference": {
                "projectId": dataset.project_id,
                "datasetId": dataset.dataset_id,
            }
        });
        if let Some(location) = &self.location {
            body["location"] = json!(location);
        }

        let url = format!("{}/projects/{}/datasets", self.base_url, dataset.project_id);
        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        Self::read(response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(table = %table))]
    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError> {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .send()
            .await?;
        Ok(Self::read_optional(response).await?.is_some())
    }

    #[instrument(skip(self, schema), fields(table = %table))]
    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<(), WarehouseError> {
        let body = json!({
            "tableReference": {
                "projectId": table.dataset.project_id,
                "datasetId": table.dataset.dataset_id,
                "tableId": table.table_id,
            },
            "schema": schema,
        });

        let url = format!("{}/tables", self.dataset_url(&table.dataset));
        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        Self::read(response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(table = %table))]
    async fn reload_table(&self, table: &TableRef) -> Result<TableSchema, WarehouseError> {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .send()
            .await?;
        let body = Self::read(response).await?;
        let resource: TableResource = Self::parse(&body)?;
        Ok(resource.schema.unwrap_or_default())
    }

    #[instrument(skip(self, request), fields(job_id = %request.job_id, table = %request.table))]
    async fn begin_load_job(&self, request: &LoadJobRequest) -> Result<JobState, WarehouseError> {
        let mut job_reference = json!({
            "projectId": request.table.dataset.project_id,
            "jobId": request.job_id,
        });
        if let Some(location) = &self.location {
            job_reference["location"] = json!(location);
        }

        let body = json!({
            "jobReference": job_reference,
            "configuration": {
                "load": {
                    "sourceUris": [request.source_uri],
                    "sourceFormat": request.source_format,
                    "writeDisposition": request.write_disposition,
                    "destinationTable": {
                        "projectId": request.table.dataset.project_id,
                        "datasetId": request.table.dataset.dataset_id,
                        "tableId": request.table.table_id,
                    },
                }
            }
        });

        debug!(source_uri = %request.source_uri, "Submitting load job");

        let response = self
            .authorized(self.client.post(self.jobs_url(request.table.project_id())))
            .json(&body)
            .send()
            .await?;
        let body = Self::read(response).await?;
        let job: JobResource = Self::parse(&body)?;
        Self::job_state_from(job.status)
    }

    #[instrument(skip(self))]
    async fn job_state(&self, project_id: &str, job_id: &str) -> Result<JobState, WarehouseError> {
        let url = format!("{}/{}", self.jobs_url(project_id), job_id);
        let mut request = self.client.get(url);
        if let Some(location) = &self.location {
            request = request.query(&[("location", location)]);
        }

        let response = self.authorized(request).send().await?;
        let body = Self::read(response).await?;
        let job: JobResource = Self::parse(&body)?;
        Self::job_state_from(job.status)
    }

    #[instrument(skip(self, rows), fields(table = %table, rows = rows.len()))]
    async fn insert_rows(
        &self,
        table: &TableRef,
        rows: &[WarehouseRow],
    ) -> Result<Vec<RowInsertError>, WarehouseError> {
        let request = InsertAllRequest {
            rows: rows.iter().map(|json| InsertRow { json }).collect(),
        };

        let url = format!("{}/insertAll", self.table_url(table));
        let response = self
            .authorized(self.client.post(url))
            .json(&request)
            .send()
            .await?;
        let body = Self::read(response).await?;
        let parsed: InsertAllResponse = Self::parse(&body)?;

        if !parsed.insert_errors.is_empty() {
            warn!(rejected = parsed.insert_errors.len(), "Rows rejected by insertAll");
        }

        Ok(parsed
            .insert_errors
            .into_iter()
            .map(|e| RowInsertError {
                index: e.index,
                messages: e.errors.iter().map(ErrorProto::describe).collect(),
            })
            .collect())
    }
}
