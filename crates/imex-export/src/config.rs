//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::paginator::DEFAULT_PAGE_SIZE;
use crate::schema::SchemaVersion;
use crate::storage::StorageConfig;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default images API host.
pub const DEFAULT_IMAGES_API_HOST: &str = "https://kingpick-dev.scanvas.me/v1";

/// Default images API request timeout in seconds.
pub const DEFAULT_IMAGES_API_TIMEOUT_SECS: u64 = 60;

/// Default warehouse table name.
pub const DEFAULT_TABLE_NAME: &str = "images";

/// Default interval between load job status checks in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default number of load job status checks before giving up.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 100;

/// Default BigQuery REST API root.
pub const DEFAULT_BIGQUERY_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Full configuration of one export invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub warehouse: WarehouseConfig,
}

/// Images service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub host: String,
    /// Log raw request URLs and response bodies
    pub debug: bool,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_IMAGES_API_HOST.to_string(),
            debug: false,
            timeout_secs: DEFAULT_IMAGES_API_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub page_size: u64,
    pub schema_version: SchemaVersion,
    pub table_name: String,
    pub poll_interval_secs: u64,
    pub poll_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            schema_version: SchemaVersion::default(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub api_url: String,
    /// OAuth bearer token; acquiring it is left to the caller
    pub access_token: Option<String>,
    pub location: Option<String>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BIGQUERY_API_URL.to_string(),
            access_token: None,
            location: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl ExportConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Read the environment without touching `.env` or validating
    pub fn from_env() -> anyhow::Result<Self> {
        let schema_version = match std::env::var("EXPORT_SCHEMA_VERSION") {
            Ok(value) => value.parse::<SchemaVersion>().map_err(anyhow::Error::msg)?,
            Err(_) => SchemaVersion::default(),
        };

        Ok(ExportConfig {
            source: SourceConfig {
                host: std::env::var("IMAGES_API_HOST")
                    .unwrap_or_else(|_| DEFAULT_IMAGES_API_HOST.to_string()),
                debug: std::env::var("DEBUG").is_ok(),
                timeout_secs: env_parse("IMAGES_API_TIMEOUT_SECS", DEFAULT_IMAGES_API_TIMEOUT_SECS),
            },
            pipeline: PipelineConfig {
                page_size: env_parse("EXPORT_PAGE_SIZE", DEFAULT_PAGE_SIZE),
                schema_version,
                table_name: std::env::var("EXPORT_TABLE_NAME")
                    .unwrap_or_else(|_| DEFAULT_TABLE_NAME.to_string()),
                poll_interval_secs: env_parse("LOAD_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS),
                poll_attempts: env_parse("LOAD_POLL_ATTEMPTS", DEFAULT_POLL_ATTEMPTS),
            },
            storage: StorageConfig::from_env(),
            warehouse: WarehouseConfig {
                api_url: std::env::var("BIGQUERY_API_URL")
                    .unwrap_or_else(|_| DEFAULT_BIGQUERY_API_URL.to_string()),
                access_token: std::env::var("BIGQUERY_ACCESS_TOKEN").ok(),
                location: std::env::var("BIGQUERY_LOCATION").ok(),
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source.host.trim().is_empty() {
            anyhow::bail!("Images API host cannot be empty");
        }

        if self.pipeline.page_size == 0 {
            anyhow::bail!("Export page size must be greater than 0");
        }

        if self.pipeline.poll_interval_secs == 0 {
            anyhow::bail!("Load poll interval must be greater than 0 seconds");
        }

        if self.pipeline.poll_attempts == 0 {
            anyhow::bail!("Load poll attempts must be greater than 0");
        }

        if self.pipeline.table_name.is_empty() {
            anyhow::bail!("Table name cannot be empty");
        }

        if self.warehouse.api_url.is_empty() {
            anyhow::bail!("Warehouse API URL cannot be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "IMAGES_API_HOST",
        "DEBUG",
        "EXPORT_PAGE_SIZE",
        "EXPORT_SCHEMA_VERSION",
        "EXPORT_TABLE_NAME",
        "LOAD_POLL_INTERVAL_SECS",
        "LOAD_POLL_ATTEMPTS",
        "BIGQUERY_ACCESS_TOKEN",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ExportConfig::from_env().unwrap();

        assert_eq!(config.source.host, DEFAULT_IMAGES_API_HOST);
        assert!(!config.source.debug);
        assert_eq!(config.pipeline.page_size, 100);
        assert_eq!(config.pipeline.schema_version, SchemaVersion::Structured);
        assert_eq!(config.pipeline.table_name, "images");
        assert_eq!(config.pipeline.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.pipeline.poll_attempts, 100);
        assert!(config.warehouse.access_token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("IMAGES_API_HOST", "http://localhost:4000");
        std::env::set_var("DEBUG", "1");
        std::env::set_var("EXPORT_SCHEMA_VERSION", "legacy");
        std::env::set_var("LOAD_POLL_ATTEMPTS", "5");

        let config = ExportConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.source.host, "http://localhost:4000");
        assert!(config.source.debug);
        assert_eq!(config.pipeline.schema_version, SchemaVersion::Legacy);
        assert_eq!(config.pipeline.poll_attempts, 5);
    }

    #[test]
    #[serial]
    fn test_unknown_schema_version_is_an_error() {
        clear_env();
        std::env::set_var("EXPORT_SCHEMA_VERSION", "v9");
        let result = ExportConfig::from_env();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = ExportConfig {
            source: SourceConfig::default(),
            pipeline: PipelineConfig::default(),
            storage: StorageConfig::default(),
            warehouse: WarehouseConfig::default(),
        };
        config.pipeline.page_size = 0;
        assert!(config.validate().is_err());

        config.pipeline.page_size = 10;
        config.pipeline.poll_attempts = 0;
        assert!(config.validate().is_err());

        config.pipeline.poll_attempts = 1;
        config.source.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = ExportConfig {
            source: SourceConfig::default(),
            pipeline: PipelineConfig::default(),
            storage: StorageConfig::default(),
            warehouse: WarehouseConfig::default(),
        };
        assert!(config.validate().is_ok());

        config.pipeline.poll_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll interval"));
    }
}
