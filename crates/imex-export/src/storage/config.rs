use serde::{Deserialize, Serialize};
use std::env;

/// Google Cloud Storage XML API endpoint, which speaks the S3 protocol
pub const GCS_INTEROP_ENDPOINT: &str = "https://storage.googleapis.com";

/// Object store connection settings
///
/// Any S3-compatible endpoint works. The default targets Cloud Storage through
/// its interoperability API with HMAC keys, so uploaded objects are addressable
/// as `gs://bucket/key` by the warehouse load job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    /// Static HMAC / access keys; when absent the default AWS credential chain is used
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub path_style: bool,
    /// Scheme of the URIs handed to the warehouse (`gs`, `s3`)
    pub uri_scheme: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: Some(GCS_INTEROP_ENDPOINT.to_string()),
            region: "auto".to_string(),
            access_key: None,
            secret_key: None,
            path_style: false,
            uri_scheme: "gs".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("STORAGE_ENDPOINT").ok().or(defaults.endpoint),
            region: env::var("STORAGE_REGION").unwrap_or(defaults.region),
            access_key: env::var("STORAGE_ACCESS_KEY")
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .ok(),
            secret_key: env::var("STORAGE_SECRET_KEY")
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .ok(),
            path_style: env::var("STORAGE_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.path_style),
            uri_scheme: env::var("STORAGE_URI_SCHEME").unwrap_or(defaults.uri_scheme),
        }
    }

    /// `scheme://bucket/key` URI for an object
    pub fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("{}://{}/{}", self.uri_scheme, bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_gcs_interop() {
        let config = StorageConfig::default();
        assert_eq!(config.endpoint.as_deref(), Some(GCS_INTEROP_ENDPOINT));
        assert_eq!(
            config.object_uri("exports", "image-export/t/p/x.json"),
            "gs://exports/image-export/t/p/x.json"
        );
    }
}
