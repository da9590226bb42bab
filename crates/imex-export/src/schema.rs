//! Warehouse table schemas
//!
//! Two fixed, mutually incompatible layouts exist for the `images` table.
//! A deployment picks one [`SchemaVersion`] and never migrates between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column type, serialized with the warehouse's type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

/// One column descriptor, nested for `RECORD` columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub mode: FieldMode,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SchemaField>,
}

impl SchemaField {
    pub fn new(name: &str, field_type: FieldType, mode: FieldMode) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            mode,
            fields: Vec::new(),
        }
    }

    pub fn record(name: &str, mode: FieldMode, fields: Vec<SchemaField>) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::Record,
            mode,
            fields,
        }
    }

    fn string(name: &str) -> Self {
        Self::new(name, FieldType::String, FieldMode::Nullable)
    }

    fn float(name: &str) -> Self {
        Self::new(name, FieldType::Float, FieldMode::Nullable)
    }

    fn integer(name: &str) -> Self {
        Self::new(name, FieldType::Integer, FieldMode::Nullable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TableSchema {
    pub fields: Vec<SchemaField>,
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Active table layout for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// `vision_annotations` as repeated `{key, value}` pairs.
    ///
    /// Kept for tables created before the structured layout existed. The
    /// values are JSON blobs stuffed into a flat map, which is a known format
    /// gap rather than the intended long-term shape.
    Legacy,
    /// `vision_annotations` as a nested record
    #[default]
    Structured,
}

impl SchemaVersion {
    pub fn table_schema(self) -> TableSchema {
        match self {
            SchemaVersion::Legacy => legacy_schema(),
            SchemaVersion::Structured => structured_schema(),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Legacy => f.write_str("legacy"),
            SchemaVersion::Structured => f.write_str("structured"),
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" | "v1" => Ok(SchemaVersion::Legacy),
            "structured" | "current" | "v2" => Ok(SchemaVersion::Structured),
            other => Err(format!("unknown schema version: {}", other)),
        }
    }
}

fn key_value_pairs(name: &str) -> SchemaField {
    SchemaField::record(
        name,
        FieldMode::Repeated,
        vec![
            SchemaField::new("key", FieldType::String, FieldMode::Required),
            SchemaField::new("value", FieldType::String, FieldMode::Required),
        ],
    )
}

fn scalar_columns() -> Vec<SchemaField> {
    vec![
        SchemaField::string("project_id"),
        SchemaField::new("id", FieldType::String, FieldMode::Required),
        SchemaField::new("version", FieldType::String, FieldMode::Required),
        SchemaField::new("job_id", FieldType::String, FieldMode::Required),
        SchemaField::string("original_uri"),
        key_value_pairs("exif_annotations"),
    ]
}

fn legacy_schema() -> TableSchema {
    let mut fields = scalar_columns();
    fields.push(key_value_pairs("vision_annotations"));
    // never populated, the column only exists in tables created by older exports
    fields.push(key_value_pairs("annotations"));
    TableSchema { fields }
}

fn bounding_poly() -> SchemaField {
    SchemaField::record(
        "bounding_poly",
        FieldMode::Nullable,
        vec![SchemaField::record(
            "vertices",
            FieldMode::Repeated,
            vec![SchemaField::integer("x"), SchemaField::integer("y")],
        )],
    )
}

fn entity_annotations(name: &str) -> SchemaField {
    SchemaField::record(
        name,
        FieldMode::Repeated,
        vec![
            SchemaField::string("mid"),
            SchemaField::string("description"),
            SchemaField::float("score"),
            bounding_poly(),
            SchemaField::record(
                "locations",
                FieldMode::Repeated,
                vec![SchemaField::record(
                    "lat_lng",
                    FieldMode::Nullable,
                    vec![SchemaField::float("latitude"), SchemaField::float("longitude")],
                )],
            ),
        ],
    )
}

fn structured_schema() -> TableSchema {
    let safe_search = SchemaField::record(
        "safe_search_annotation",
        FieldMode::Nullable,
        vec![
            SchemaField::string("adult"),
            SchemaField::string("spoof"),
            SchemaField::string("medical"),
            SchemaField::string("violence"),
        ],
    );

    let image_properties = SchemaField::record(
        "image_properties_annotation",
        FieldMode::Nullable,
        vec![SchemaField::record(
            "dominant_colors",
            FieldMode::Nullable,
            vec![SchemaField::record(
                "colors",
                FieldMode::Repeated,
                vec![
                    SchemaField::record(
                        "color",
                        FieldMode::Nullable,
                        vec![
                            SchemaField::float("red"),
                            SchemaField::float("green"),
                            SchemaField::float("blue"),
                        ],
                    ),
                    SchemaField::float("score"),
                    SchemaField::float("pixel_fraction"),
                ],
            )],
        )],
    );

    let mut fields = scalar_columns();
    fields.push(SchemaField::record(
        "vision_annotations",
        FieldMode::Nullable,
        vec![
            safe_search,
            entity_annotations("label_annotations"),
            entity_annotations("landmark_annotations"),
            entity_annotations("logo_annotations"),
            image_properties,
        ],
    ));
    TableSchema { fields }
}
