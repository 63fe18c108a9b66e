//! Data models for the area calculator.
//!
//! This module contains the COCO input document as it is deserialized,
//! and the derived records and reports produced from it.

use crate::error::AreaError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// File name used when an annotation references an unknown image id.
pub const UNKNOWN_FILE: &str = "Unknown File";

/// Class name used when an annotation references an unknown category id.
pub const UNKNOWN_OBJECT: &str = "Unknown Object";

/// A parsed COCO annotation document.
///
/// Only the three collections needed for area totals are modelled;
/// `info`, `licenses` and any other keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationDocument {
    /// Images referenced by the annotations.
    pub images: Vec<ImageEntry>,
    /// Object classes.
    pub categories: Vec<CategoryEntry>,
    /// Annotation entries, in file order.
    pub annotations: Vec<AnnotationRecord>,
}

/// One entry of the `images` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageEntry {
    pub id: i64,
    pub file_name: String,
}

/// One entry of the `categories` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    pub id: i64,
    pub name: String,
}

/// One entry of the `annotations` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRecord {
    /// Id of the image this annotation belongs to.
    pub image_id: i64,
    /// Id of the annotated object class.
    pub category_id: i64,
    /// Crowd flag. Exports write it as `0`/`1`, some tools as a boolean.
    /// Only required when a segmentation is present.
    #[serde(default, deserialize_with = "deserialize_iscrowd")]
    pub iscrowd: Option<bool>,
    /// Object outline. `null` is treated the same as a missing key.
    #[serde(default)]
    pub segmentation: Option<Segmentation>,
}

fn deserialize_iscrowd<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IsCrowd {
        Bool(bool),
        Int(i64),
    }

    match IsCrowd::deserialize(deserializer)? {
        IsCrowd::Bool(b) => Ok(Some(b)),
        IsCrowd::Int(i) => Ok(Some(i != 0)),
    }
}

/// Segmentation of an annotation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    /// One or more polygons, each a flat `[x0, y0, x1, y1, ...]` list.
    Polygons(Vec<Vec<f64>>),
    /// Run-length encoded mask. Recognized only so it can be skipped.
    Rle(#[allow(dead_code)] RleMask),
}

/// Run-length encoded mask, compressed (`counts` is a string) or not.
///
/// Parsed only to recognize the mask shape; nothing reads the fields.
#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct RleMask {
    pub size: Vec<u32>,
    pub counts: serde_json::Value,
}

/// Area of a single measured annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectAreaRecord {
    #[serde(rename = "File Name")]
    pub file_name: String,
    #[serde(rename = "Object Name")]
    pub object_name: String,
    #[serde(rename = "Total Area")]
    pub area: f64,
}

/// Summed area of all annotations sharing a (file, class) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedAreaRecord {
    #[serde(rename = "File Name")]
    pub file_name: String,
    #[serde(rename = "Object Name")]
    pub object_name: String,
    #[serde(rename = "Total Area")]
    pub total_area: f64,
}

/// Total area for one image file or one object class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    /// File name or class name, depending on the grouping.
    pub name: String,
    /// Sum of the aggregated areas in this group.
    pub total_area: f64,
    /// Number of aggregated rows that contributed.
    pub entries: usize,
}

/// Counters collected during one measuring pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationStats {
    /// Annotations present in the document.
    pub annotations_seen: usize,
    /// Annotations that produced an area record.
    pub annotations_measured: usize,
    /// Skipped because `iscrowd` was set.
    pub skipped_crowd: usize,
    /// Skipped because there was no `segmentation`.
    pub skipped_no_segmentation: usize,
    /// Skipped because the segmentation was an RLE mask.
    pub skipped_rle: usize,
    /// Polygons whose area was computed.
    pub polygons_measured: usize,
    /// Polygons with an odd coordinate count that were left out.
    pub malformed_polygons: usize,
    /// Measured annotations whose `image_id` had no image entry.
    pub unresolved_images: usize,
    /// Measured annotations whose `category_id` had no category entry.
    pub unresolved_categories: usize,
}

impl AggregationStats {
    /// Total number of annotations that were skipped.
    pub fn skipped(&self) -> usize {
        self.skipped_crowd + self.skipped_no_segmentation + self.skipped_rle
    }
}

/// Metadata about one processed upload.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Name of the uploaded file.
    pub source: String,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Processing time in seconds.
    pub duration_seconds: f64,
}

/// The complete result for one upload.
#[derive(Debug, Clone, Serialize)]
pub struct AreaReport {
    pub metadata: ReportMetadata,
    /// One row per (file, class) pair.
    pub rows: Vec<AggregatedAreaRecord>,
    /// Totals per image file.
    pub by_file: Vec<GroupTotal>,
    /// Totals per object class.
    pub by_object: Vec<GroupTotal>,
    /// Sum over all rows.
    pub grand_total: f64,
    pub stats: AggregationStats,
}

impl AreaReport {
    /// Returns true when no annotation was eligible for measuring.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// What gets presented for one upload.
#[derive(Debug)]
pub enum UploadOutcome {
    /// At least one polygon annotation was measured.
    Table(AreaReport),
    /// The document was valid but had no eligible annotations.
    NoAnnotations(AreaReport),
    /// Processing failed; nothing partial is shown.
    Failed { source: String, error: AreaError },
}

impl UploadOutcome {
    /// Classify the result of processing one upload.
    pub fn from_result(source: &str, result: Result<AreaReport, AreaError>) -> Self {
        match result {
            Ok(report) if report.is_empty() => UploadOutcome::NoAnnotations(report),
            Ok(report) => UploadOutcome::Table(report),
            Err(error) => UploadOutcome::Failed {
                source: source.to_string(),
                error,
            },
        }
    }

    /// Name of the upload this outcome belongs to.
    pub fn source(&self) -> &str {
        match self {
            UploadOutcome::Table(report) | UploadOutcome::NoAnnotations(report) => {
                &report.metadata.source
            }
            UploadOutcome::Failed { source, .. } => source,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, UploadOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report(source: &str) -> AreaReport {
        AreaReport {
            metadata: ReportMetadata {
                source: source.to_string(),
                generated_at: Utc::now(),
                duration_seconds: 0.0,
            },
            rows: Vec::new(),
            by_file: Vec::new(),
            by_object: Vec::new(),
            grand_total: 0.0,
            stats: AggregationStats::default(),
        }
    }

    #[test]
    fn test_iscrowd_accepts_int_and_bool() {
        let int: AnnotationRecord = serde_json::from_str(
            r#"{"image_id": 1, "category_id": 2, "iscrowd": 1, "segmentation": []}"#,
        )
        .unwrap();
        assert_eq!(int.iscrowd, Some(true));

        let boolean: AnnotationRecord =
            serde_json::from_str(r#"{"image_id": 1, "category_id": 2, "iscrowd": false}"#)
                .unwrap();
        assert_eq!(boolean.iscrowd, Some(false));
        assert!(boolean.segmentation.is_none());
    }

    #[test]
    fn test_missing_iscrowd_deserializes_as_none() {
        let record: AnnotationRecord =
            serde_json::from_str(r#"{"image_id": 1, "category_id": 2, "bbox": [0, 0, 1, 1]}"#)
                .unwrap();
        assert!(record.iscrowd.is_none());
        assert!(record.segmentation.is_none());
    }

    #[test]
    fn test_null_segmentation_is_absent() {
        let record: AnnotationRecord = serde_json::from_str(
            r#"{"image_id": 1, "category_id": 2, "iscrowd": 0, "segmentation": null}"#,
        )
        .unwrap();
        assert!(record.segmentation.is_none());
    }

    #[test]
    fn test_invalid_iscrowd_is_rejected() {
        let result: Result<AnnotationRecord, _> = serde_json::from_str(
            r#"{"image_id": 1, "category_id": 2, "iscrowd": "no", "segmentation": []}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_segmentation_forms() {
        let polygons: Segmentation = serde_json::from_str("[[0, 0, 1, 0, 1, 1]]").unwrap();
        assert!(matches!(polygons, Segmentation::Polygons(ref p) if p.len() == 1));

        let compressed: Segmentation =
            serde_json::from_str(r#"{"size": [10, 20], "counts": "abc"}"#).unwrap();
        assert!(matches!(compressed, Segmentation::Rle(_)));

        let uncompressed: Segmentation =
            serde_json::from_str(r#"{"size": [10, 20], "counts": [3, 4, 5]}"#).unwrap();
        assert!(matches!(uncompressed, Segmentation::Rle(_)));
    }

    #[test]
    fn test_record_column_names() {
        let row = AggregatedAreaRecord {
            file_name: "a.jpg".to_string(),
            object_name: "cat".to_string(),
            total_area: 12.0,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"File Name\":\"a.jpg\""));
        assert!(json.contains("\"Object Name\":\"cat\""));
        assert!(json.contains("\"Total Area\":12.0"));
    }

    #[test]
    fn test_outcome_classification() {
        let empty = UploadOutcome::from_result("a.json", Ok(empty_report("a.json")));
        assert!(matches!(empty, UploadOutcome::NoAnnotations(_)));
        assert_eq!(empty.source(), "a.json");

        let mut report = empty_report("b.json");
        report.rows.push(AggregatedAreaRecord {
            file_name: "x.jpg".to_string(),
            object_name: "dog".to_string(),
            total_area: 1.0,
        });
        assert!(matches!(
            UploadOutcome::from_result("b.json", Ok(report)),
            UploadOutcome::Table(_)
        ));

        let failed = UploadOutcome::from_result(
            "c.json",
            Err(AreaError::Format("eof".to_string())),
        );
        assert!(failed.is_failure());
        assert_eq!(failed.source(), "c.json");
    }

    #[test]
    fn test_stats_skipped() {
        let stats = AggregationStats {
            skipped_crowd: 2,
            skipped_no_segmentation: 1,
            skipped_rle: 3,
            ..Default::default()
        };
        assert_eq!(stats.skipped(), 6);
    }
}
