//! Batch export to a single newline-delimited JSON object
//!
//! Every batch is transformed and appended to one local temporary file, which
//! is uploaded as a whole once the source is drained. Local disk use grows
//! with the number of records, there is no size cap or chunking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{ExportError, Result};
use crate::paginator::Paginator;
use crate::source::ImageSource;
use crate::storage::{ObjectStore, UploadReceipt, EXPORT_CONTENT_TYPE};
use crate::transform::RecordTransformer;

/// Object key of an export file
pub fn export_key(tenant_id: &str, project_id: &str, export_id: &str) -> String {
    format!("image-export/{}/{}/{}.json", tenant_id, project_id, export_id)
}

/// Result of one batch export run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    pub export_id: Uuid,
    pub records_written: u64,
    pub batches: usize,
    pub object: UploadReceipt,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ExportSummary {
    pub fn uri(&self) -> &str {
        &self.object.uri
    }
}

pub struct BatchExportPipeline<'a> {
    source: &'a dyn ImageSource,
    store: &'a dyn ObjectStore,
    transformer: RecordTransformer,
    page_size: u64,
}

impl<'a> BatchExportPipeline<'a> {
    pub fn new(
        source: &'a dyn ImageSource,
        store: &'a dyn ObjectStore,
        transformer: RecordTransformer,
        page_size: u64,
    ) -> Self {
        Self {
            source,
            store,
            transformer,
            page_size,
        }
    }

    /// Export every record of a project into `bucket`
    #[instrument(skip(self), fields(schema = %self.transformer.schema()))]
    pub async fn run(&self, tenant_id: &str, project_id: &str, bucket: &str) -> Result<ExportSummary> {
        let started_at = Utc::now();
        let export_id = Uuid::new_v4();
        let key = export_key(tenant_id, project_id, &export_id.to_string());

        self.store
            .get_or_create_bucket(bucket)
            .await
            .map_err(|source| ExportError::Upload {
                bucket: bucket.to_string(),
                key: key.clone(),
                source,
            })?;

        let mut paginator = Paginator::open(self.source, tenant_id, project_id, self.page_size).await?;

        let mut buffer = NamedTempFile::new()?;
        let mut records_written = 0u64;
        let mut batches = 0usize;
        {
            let mut writer = BufWriter::new(buffer.as_file_mut());

            while let Some(batch) = paginator.next_batch().await? {
                let (index, offset) = (batch.index, batch.offset);
                let rows = self
                    .transformer
                    .transform_all(batch.records)
                    .map_err(|e| ExportError::transform(tenant_id, project_id, index, offset, e))?;

                for row in &rows {
                    serde_json::to_writer(&mut writer, row).map_err(std::io::Error::from)?;
                    writer.write_all(b"\n")?;
                }

                records_written += rows.len() as u64;
                batches += 1;
                debug!(offset, rows = rows.len(), "Buffered batch");
            }

            writer.flush()?;
        }

        let object = self
            .store
            .upload(bucket, &key, buffer.path(), EXPORT_CONTENT_TYPE)
            .await
            .map_err(|source| ExportError::Upload {
                bucket: bucket.to_string(),
                key: key.clone(),
                source,
            })?;

        info!(
            export_id = %export_id,
            records = records_written,
            batches,
            uri = %object.uri,
            "Export complete"
        );

        Ok(ExportSummary {
            export_id,
            records_written,
            batches,
            object,
            started_at,
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_key_layout() {
        assert_eq!(
            export_key("acme", "p1", "0b5d"),
            "image-export/acme/p1/0b5d.json"
        );
    }
}
