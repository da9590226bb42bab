//! HTTP client for the images service
//!
//! Built once per process from [`SourceConfig`] and handed to the pipelines,
//! so the target host and debug mode are plain constructor inputs.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::{endpoints, ImagePage, ImageSource, SourceError};
use crate::config::SourceConfig;
use crate::models::SourceRecord;

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<SourceRecord>,
    meta: ListMeta,
}

#[derive(Debug, Deserialize)]
struct ListMeta {
    total: u64,
}

/// API client for the images service
#[derive(Debug, Clone)]
pub struct ImageApiClient {
    client: Client,
    base_url: String,
    debug: bool,
}

impl ImageApiClient {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.host.clone(),
            debug: config.debug,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Total record count, via a single-item list call
    pub async fn count(&self, tenant_id: &str, project_id: &str) -> Result<u64, SourceError> {
        Ok(self.list(tenant_id, project_id, 0, 1).await?.total)
    }
}

#[async_trait]
impl ImageSource for ImageApiClient {
    #[instrument(skip(self))]
    async fn list(
        &self,
        tenant_id: &str,
        project_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<ImagePage, SourceError> {
        let url = endpoints::images_url(&self.base_url, tenant_id, project_id, offset, limit);
        if self.debug {
            debug!(url = %url, "GET images");
        }

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if self.debug {
            debug!(status = status.as_u16(), body = %body, "images API response");
        }

        if !status.is_success() {
            error!(status = status.as_u16(), url = %url, "images API call failed");
            return Err(SourceError::api(status.as_u16(), body));
        }

        let parsed: ListResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(ImagePage {
            items: parsed.items,
            total: parsed.meta.total,
        })
    }
}
