//! Record shapes on both sides of the pipeline
//!
//! [`SourceRecord`] is what the image service returns; [`WarehouseRow`] is the
//! load-ready row written to the export file or sent to the streaming insert.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::vision::VisionAnnotationRecord;

/// Image metadata record as returned by the source service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(default)]
    pub project_id: Option<String>,

    pub id: String,

    pub version: String,

    pub job_id: String,

    #[serde(default)]
    pub original_uri: Option<String>,

    #[serde(default)]
    pub exif_annotations: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub vision_annotations: Option<RawVisionAnnotations>,

    /// Export-internal bookkeeping, never loaded
    #[serde(default)]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// `vision_annotations` as the source service delivers it
///
/// Older deployments store a flat string map; newer ones store the whole
/// vision analysis result as one JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawVisionAnnotations {
    Map(BTreeMap<String, String>),
    Encoded(String),
}

impl RawVisionAnnotations {
    pub fn is_empty(&self) -> bool {
        match self {
            RawVisionAnnotations::Map(map) => map.is_empty(),
            RawVisionAnnotations::Encoded(payload) => payload.trim().is_empty(),
        }
    }

    pub(crate) fn shape(&self) -> &'static str {
        match self {
            RawVisionAnnotations::Map(_) => "string map",
            RawVisionAnnotations::Encoded(_) => "encoded JSON string",
        }
    }
}

/// One `{key, value}` entry of a repeated annotation column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// `vision_annotations` column content, one variant per table schema
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VisionAnnotations {
    /// Legacy schema: repeated `{key, value}` pairs whose values are JSON blobs
    Legacy(Vec<KeyValue>),
    /// Current schema: nested record mirroring the vision analysis result
    Structured(Box<VisionAnnotationRecord>),
}

/// Load-ready row
///
/// `exif_annotations` and `vision_annotations` are omitted from the JSON
/// when absent; the repeated/nullable column modes treat that as empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseRow {
    pub project_id: Option<String>,

    pub id: String,

    pub version: String,

    pub job_id: String,

    pub original_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif_annotations: Option<Vec<KeyValue>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_annotations: Option<VisionAnnotations>,
}
