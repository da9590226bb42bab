//! imex Export Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Moves a tenant's image metadata from the images service into a BigQuery
//! table, either through an exported newline-delimited JSON object and a bulk
//! load job, or by streaming inserts.
//!
//! - [`paginator`]: offset/limit walk over the source
//! - [`transform`]: source record to warehouse row, per [`schema::SchemaVersion`]
//! - [`pipeline`]: batch export, load job orchestration, streaming inserts
//! - [`source`], [`storage`], [`warehouse`]: collaborator traits and their HTTP/S3 clients
//!
//! # Example
//!
//! ```no_run
//! use imex_export::config::ExportConfig;
//! use imex_export::pipeline::BatchExportPipeline;
//! use imex_export::source::ImageApiClient;
//! use imex_export::storage::S3ObjectStore;
//! use imex_export::transform::RecordTransformer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExportConfig::load()?;
//!     let source = ImageApiClient::new(&config.source)?;
//!     let store = S3ObjectStore::new(config.storage.clone()).await;
//!
//!     let pipeline = BatchExportPipeline::new(
//!         &source,
//!         &store,
//!         RecordTransformer::new(config.pipeline.schema_version),
//!         config.pipeline.page_size,
//!     );
//!     let summary = pipeline.run("acme", "spring-catalog", "acme-exports").await?;
//!     println!("{}", summary.uri());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod paginator;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod storage;
pub mod transform;
pub mod vision;
pub mod warehouse;

pub use error::{ExportError, Result};
pub use models::{SourceRecord, WarehouseRow};
pub use schema::SchemaVersion;
