//! Record transformer: [`SourceRecord`] to [`WarehouseRow`]
//!
//! Pure and deterministic. The active [`SchemaVersion`] is fixed when the
//! transformer is built, so every row of a run has the same layout.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{KeyValue, RawVisionAnnotations, SourceRecord, VisionAnnotations, WarehouseRow};
use crate::schema::SchemaVersion;
use crate::vision::VisionAnnotationRecord;

/// Per-record transformation failure
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("record '{record_id}': vision_annotations is not valid JSON: {source}")]
    MalformedVision {
        record_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("record '{record_id}': vision_annotations holds a {found}, which the {schema} schema cannot load")]
    SchemaMismatch {
        record_id: String,
        found: &'static str,
        schema: SchemaVersion,
    },
}

impl TransformError {
    /// Id of the record that failed
    pub fn record_id(&self) -> &str {
        match self {
            TransformError::MalformedVision { record_id, .. }
            | TransformError::SchemaMismatch { record_id, .. } => record_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordTransformer {
    schema: SchemaVersion,
}

impl RecordTransformer {
    pub fn new(schema: SchemaVersion) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    pub fn transform(&self, record: SourceRecord) -> Result<WarehouseRow, TransformError> {
        let SourceRecord {
            annotations: _,
            project_id,
            id,
            version,
            job_id,
            original_uri,
            exif_annotations,
            vision_annotations,
        } = record;

        let vision_annotations = match vision_annotations {
            Some(raw) if !raw.is_empty() => Some(self.vision(&id, raw)?),
            _ => None,
        };

        Ok(WarehouseRow {
            project_id,
            id,
            version,
            job_id,
            original_uri,
            exif_annotations: exif_annotations.and_then(key_value_pairs),
            vision_annotations,
        })
    }

    /// Transform a whole batch, stopping at the first failing record
    pub fn transform_all(
        &self,
        records: Vec<SourceRecord>,
    ) -> Result<Vec<WarehouseRow>, TransformError> {
        records.into_iter().map(|r| self.transform(r)).collect()
    }

    fn vision(
        &self,
        record_id: &str,
        raw: RawVisionAnnotations,
    ) -> Result<VisionAnnotations, TransformError> {
        match (self.schema, raw) {
            (SchemaVersion::Legacy, RawVisionAnnotations::Map(map)) => {
                Ok(VisionAnnotations::Legacy(key_value_pairs(map).unwrap_or_default()))
            },
            (SchemaVersion::Structured, RawVisionAnnotations::Encoded(payload)) => {
                let record: VisionAnnotationRecord = serde_json::from_str(&payload).map_err(
                    |source| TransformError::MalformedVision {
                        record_id: record_id.to_string(),
                        source,
                    },
                )?;
                Ok(VisionAnnotations::Structured(Box::new(record)))
            },
            (schema, other) => Err(TransformError::SchemaMismatch {
                record_id: record_id.to_string(),
                found: other.shape(),
                schema,
            }),
        }
    }
}

/// `None` for an empty map so the column is left out of the row
fn key_value_pairs(map: BTreeMap<String, String>) -> Option<Vec<KeyValue>> {
    if map.is_empty() {
        return None;
    }
    Some(map.into_iter().map(|(key, value)| KeyValue { key, value }).collect())
}
