//! Structured vision annotation record (current table schema)
//!
//! Mirrors the subset of an image-annotation response the warehouse keeps:
//! safe-search likelihoods, label/landmark/logo entities with their bounding
//! polygons, and dominant-color statistics. Input keys are accepted in either
//! the API's camelCase or snake_case; output always uses the snake_case
//! column names of [`crate::schema::SchemaVersion::Structured`]. Unknown keys
//! in the payload are ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionAnnotationRecord {
    #[serde(
        default,
        alias = "safeSearchAnnotation",
        skip_serializing_if = "Option::is_none"
    )]
    pub safe_search_annotation: Option<SafeSearchAnnotation>,

    #[serde(default, alias = "labelAnnotations", skip_serializing_if = "Vec::is_empty")]
    pub label_annotations: Vec<EntityAnnotation>,

    #[serde(default, alias = "landmarkAnnotations", skip_serializing_if = "Vec::is_empty")]
    pub landmark_annotations: Vec<EntityAnnotation>,

    #[serde(default, alias = "logoAnnotations", skip_serializing_if = "Vec::is_empty")]
    pub logo_annotations: Vec<EntityAnnotation>,

    #[serde(
        default,
        alias = "imagePropertiesAnnotation",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_properties_annotation: Option<ImageProperties>,
}

/// Likelihood strings such as `VERY_UNLIKELY` or `POSSIBLE`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeSearchAnnotation {
    #[serde(default)]
    pub adult: Option<String>,
    #[serde(default)]
    pub spoof: Option<String>,
    #[serde(default)]
    pub medical: Option<String>,
    #[serde(default)]
    pub violence: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, alias = "boundingPoly", skip_serializing_if = "Option::is_none")]
    pub bounding_poly: Option<BoundingPoly>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<LocationInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

/// Pixel coordinates; the API omits zero-valued axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default, alias = "latLng", skip_serializing_if = "Option::is_none")]
    pub lat_lng: Option<LatLng>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageProperties {
    #[serde(default, alias = "dominantColors", skip_serializing_if = "Option::is_none")]
    pub dominant_colors: Option<DominantColors>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DominantColors {
    #[serde(default)]
    pub colors: Vec<ColorInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, alias = "pixelFraction", skip_serializing_if = "Option::is_none")]
    pub pixel_fraction: Option<f64>,
}

/// RGB channels in the 0-255 range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_camel_case_payload() {
        let payload = r#"{
            "safeSearchAnnotation": {"adult": "VERY_UNLIKELY", "violence": "UNLIKELY"},
            "labelAnnotations": [{"mid": "/m/01yrx", "description": "cat", "score": 0.97}],
            "landmarkAnnotations": [{
                "description": "Eiffel Tower",
                "boundingPoly": {"vertices": [{"x": 10, "y": 20}, {"y": 40}]},
                "locations": [{"latLng": {"latitude": 48.858, "longitude": 2.294}}]
            }],
            "imagePropertiesAnnotation": {
                "dominantColors": {"colors": [{"color": {"red": 12, "green": 200}, "pixelFraction": 0.4}]}
            },
            "fullTextAnnotation": {"text": "ignored"}
        }"#;

        let record: VisionAnnotationRecord = serde_json::from_str(payload).unwrap();

        assert_eq!(
            record.safe_search_annotation.as_ref().unwrap().adult.as_deref(),
            Some("VERY_UNLIKELY")
        );
        assert_eq!(record.label_annotations[0].description.as_deref(), Some("cat"));
        let poly = record.landmark_annotations[0].bounding_poly.as_ref().unwrap();
        assert_eq!(poly.vertices[1], Vertex { x: 0, y: 40 });
        let colors = &record
            .image_properties_annotation
            .as_ref()
            .unwrap()
            .dominant_colors
            .as_ref()
            .unwrap()
            .colors;
        assert_eq!(colors[0].pixel_fraction, Some(0.4));
        assert!(record.logo_annotations.is_empty());
    }

    #[test]
    fn test_serializes_snake_case_columns() {
        let record = VisionAnnotationRecord {
            label_annotations: vec![EntityAnnotation {
                description: Some("dog".into()),
                bounding_poly: Some(BoundingPoly::default()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("label_annotations").is_some());
        assert!(value["label_annotations"][0].get("bounding_poly").is_some());
        assert!(value.get("safe_search_annotation").is_none());
    }
}
