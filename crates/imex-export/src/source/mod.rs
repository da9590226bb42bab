//! Image metadata source
//!
//! The pipelines only see the [`ImageSource`] trait; [`ImageApiClient`] is the
//! HTTP implementation talking to the images REST service.

pub mod client;
pub mod endpoints;

pub use client::ImageApiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::SourceRecord;

/// One window of the paginated list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePage {
    pub items: Vec<SourceRecord>,
    /// Total number of records for the tenant/project at query time
    pub total: u64,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("images API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("images API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("images API response could not be decoded: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch records `[offset, offset + limit)` for a tenant/project
    async fn list(
        &self,
        tenant_id: &str,
        project_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<ImagePage, SourceError>;
}
