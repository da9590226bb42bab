//! Object storage for staged export files

pub mod config;
pub mod s3;

pub use config::StorageConfig;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Content type of newline-delimited JSON export objects
pub const EXPORT_CONTENT_TYPE: &str = "application/json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("bucket '{bucket}' is not available: {message}")]
    Bucket { bucket: String, message: String },

    #[error("upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },

    #[error("reading local file failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Confirmation of a finished upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    /// URI the warehouse uses to read the object (e.g. `gs://bucket/key`)
    pub uri: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_or_create_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Upload a finished local file as one object
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        content_type: &str,
    ) -> Result<UploadReceipt, StorageError>;

    /// URI under which an object is visible to the warehouse
    fn object_uri(&self, bucket: &str, key: &str) -> String;
}
