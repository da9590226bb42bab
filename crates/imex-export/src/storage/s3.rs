//! S3-protocol object store client

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::{config::Region, error::DisplayErrorContext, primitives::ByteStream, Client};
use std::path::Path;
use tracing::{debug, info, instrument};

use super::{ObjectStore, StorageConfig, StorageError, UploadReceipt};

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    config: StorageConfig,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S3ObjectStore<{:?}>", self.config.endpoint)
    }
}

impl S3ObjectStore {
    pub async fn new(config: StorageConfig) -> Self {
        debug!(endpoint = ?config.endpoint, region = %config.region, "Initializing object store");

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "imex-storage",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.path_style)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            config,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn get_or_create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false) =>
            {
                info!(bucket = %bucket, "Bucket missing, creating it");
                self.client
                    .create_bucket()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| StorageError::Bucket {
                        bucket: bucket.to_string(),
                        message: DisplayErrorContext(&e).to_string(),
                    })?;
                Ok(())
            },
            Err(err) => Err(StorageError::Bucket {
                bucket: bucket.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        content_type: &str,
    ) -> Result<UploadReceipt, StorageError> {
        let size = tokio::fs::metadata(file).await?.len();
        let body = ByteStream::from_path(file)
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        debug!("Uploading {} bytes to {}/{}", size, bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(size as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let uri = self.object_uri(bucket, key);
        info!(uri = %uri, size, "Upload complete");

        Ok(UploadReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            uri,
        })
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        self.config.object_uri(bucket, key)
    }
}
