//! imex - image metadata export tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use imex_common::logging::{init_logging, LogConfig, LogLevel};
use imex_export::config::ExportConfig;
use imex_export::pipeline::{
    BatchExportPipeline, LoadJobOrchestrator, PollPolicy, StreamingInsertPipeline,
};
use imex_export::source::ImageApiClient;
use imex_export::storage::S3ObjectStore;
use imex_export::transform::RecordTransformer;
use imex_export::warehouse::{BigQueryClient, TableRef};
use std::process;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "imex")]
#[command(author, version, about = "Export image metadata to BigQuery")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export all images of a project to a JSON lines object
    Export {
        tenant_id: String,
        project_id: String,
        output_bucket: String,
        /// Accepted for symmetry with `sync`; the object store account and
        /// project come from the STORAGE_* settings
        gcp_project: String,
    },

    /// Load a previously exported object into the images table
    Load {
        tenant_id: String,
        project_id: String,
        source_bucket: String,
        /// File name under image-export/{tenant_id}/{project_id}/
        input_file: String,
        gcp_project: String,
    },

    /// Export, then load the exported object
    Sync {
        tenant_id: String,
        project_id: String,
        bucket: String,
        gcp_project: String,
    },

    /// Insert rows directly, batch by batch (legacy schema only)
    Stream {
        tenant_id: String,
        project_id: String,
        gcp_project: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("imex")
        .build();

    // Environment variables take precedence
    let log_config = match LogConfig::from_env_with(log_config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring invalid logging environment: {}", e);
            log_config
        },
    };

    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        },
    };

    if let Err(e) = execute(cli.command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn execute(command: Command) -> Result<()> {
    let config = ExportConfig::load().context("loading configuration")?;
    let transformer = RecordTransformer::new(config.pipeline.schema_version);
    let policy = PollPolicy::from(&config.pipeline);

    match command {
        Command::Export {
            tenant_id,
            project_id,
            output_bucket,
            gcp_project,
        } => {
            debug!(gcp_project = %gcp_project, "Object store project taken from storage settings");
            let source = ImageApiClient::new(&config.source)?;
            let store = S3ObjectStore::new(config.storage.clone()).await;

            let summary = BatchExportPipeline::new(&source, &store, transformer, config.pipeline.page_size)
                .run(&tenant_id, &project_id, &output_bucket)
                .await?;

            info!(records = summary.records_written, "Exported to {}", summary.uri());
        },
        Command::Load {
            tenant_id,
            project_id,
            source_bucket,
            input_file,
            gcp_project,
        } => {
            let warehouse = BigQueryClient::new(&config.warehouse)?;
            let key = format!("image-export/{}/{}/{}", tenant_id, project_id, input_file);
            let uri = config.storage.object_uri(&source_bucket, &key);
            let table = TableRef::new(&gcp_project, &tenant_id, &config.pipeline.table_name);

            let report = LoadJobOrchestrator::new(&warehouse, config.pipeline.schema_version, policy)
                .run(&table, &uri)
                .await?
                .into_result()?;

            info!(job_id = %report.job_id, "Loaded {} into {}", uri, table);
        },
        Command::Sync {
            tenant_id,
            project_id,
            bucket,
            gcp_project,
        } => {
            let source = ImageApiClient::new(&config.source)?;
            let store = S3ObjectStore::new(config.storage.clone()).await;
            let warehouse = BigQueryClient::new(&config.warehouse)?;
            let table = TableRef::new(&gcp_project, &tenant_id, &config.pipeline.table_name);

            let summary = BatchExportPipeline::new(&source, &store, transformer, config.pipeline.page_size)
                .run(&tenant_id, &project_id, &bucket)
                .await?;

            let report = LoadJobOrchestrator::new(&warehouse, config.pipeline.schema_version, policy)
                .run(&table, summary.uri())
                .await?
                .into_result()?;

            info!(
                job_id = %report.job_id,
                records = summary.records_written,
                "Synced {} into {}",
                summary.uri(),
                table
            );
        },
        Command::Stream {
            tenant_id,
            project_id,
            gcp_project,
        } => {
            let source = ImageApiClient::new(&config.source)?;
            let warehouse = BigQueryClient::new(&config.warehouse)?;
            let table = TableRef::new(&gcp_project, &tenant_id, &config.pipeline.table_name);

            let report = StreamingInsertPipeline::new(&source, &warehouse, transformer, config.pipeline.page_size)
                .context("streaming inserts need EXPORT_SCHEMA_VERSION=legacy")?
                .run(&tenant_id, &project_id, &table)
                .await?
                .into_result()?;

            info!("{}", report);
        },
    }

    Ok(())
}
