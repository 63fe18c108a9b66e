//! Area measurement and aggregation.
//!
//! This module turns a parsed COCO document into per-annotation areas
//! and sums them per (file name, object class) pair.

use super::geometry::Polygon;
use crate::error::AreaError;
use crate::models::{
    AggregatedAreaRecord, AggregationStats, AnnotationDocument, AreaReport, GroupTotal,
    ObjectAreaRecord, ReportMetadata, Segmentation, UNKNOWN_FILE, UNKNOWN_OBJECT,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for a measuring pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    /// Fail on polygons with an odd coordinate count instead of skipping them.
    pub strict_polygons: bool,
}

/// Parse COCO JSON text into a document.
///
/// The text is checked for well-formedness before its shape, so any
/// syntax error maps to [`AreaError::Format`] even when a missing key or
/// type mismatch comes earlier in the text. Shape problems map to
/// [`AreaError::Schema`].
pub fn parse_document(text: &str) -> Result<AnnotationDocument, AreaError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    serde_json::from_value(value).map_err(AreaError::from)
}

/// Build the image id -> file name and category id -> name lookups.
///
/// A duplicated id keeps the last entry.
pub fn build_lookups(
    document: &AnnotationDocument,
) -> (HashMap<i64, &str>, HashMap<i64, &str>) {
    let mut images = HashMap::with_capacity(document.images.len());
    for image in &document.images {
        if images.insert(image.id, image.file_name.as_str()).is_some() {
            warn!("Duplicate image id {} (keeping '{}')", image.id, image.file_name);
        }
    }

    let mut categories = HashMap::with_capacity(document.categories.len());
    for category in &document.categories {
        if categories.insert(category.id, category.name.as_str()).is_some() {
            warn!("Duplicate category id {} (keeping '{}')", category.id, category.name);
        }
    }

    (images, categories)
}

/// Compute the area of every eligible annotation, in input order.
///
/// Annotations without a segmentation, crowd annotations and RLE masks
/// are skipped. Each remaining annotation yields exactly one record.
///
/// `iscrowd` is only consulted once a segmentation is present; an
/// annotation with a segmentation but no `iscrowd` is a schema error.
pub fn measure_annotations(
    document: &AnnotationDocument,
    options: &AggregateOptions,
) -> Result<(Vec<ObjectAreaRecord>, AggregationStats), AreaError> {
    let (images, categories) = build_lookups(document);

    let mut stats = AggregationStats {
        annotations_seen: document.annotations.len(),
        ..Default::default()
    };
    let mut records = Vec::new();

    for (index, annotation) in document.annotations.iter().enumerate() {
        let Some(segmentation) = &annotation.segmentation else {
            stats.skipped_no_segmentation += 1;
            continue;
        };

        match annotation.iscrowd {
            None => {
                return Err(AreaError::Schema(format!(
                    "annotation #{} has a segmentation but no iscrowd flag",
                    index
                )));
            }
            Some(true) => {
                stats.skipped_crowd += 1;
                continue;
            }
            Some(false) => {}
        }

        let polygons = match segmentation {
            Segmentation::Rle(_) => {
                debug!("Annotation #{} is an RLE mask, skipping", index);
                stats.skipped_rle += 1;
                continue;
            }
            Segmentation::Polygons(polygons) => polygons,
        };

        let mut area = 0.0;
        for (part, coords) in polygons.iter().enumerate() {
            match Polygon::from_flat(coords) {
                Some(polygon) => {
                    area += polygon.area();
                    stats.polygons_measured += 1;
                }
                None if options.strict_polygons => {
                    return Err(AreaError::Schema(format!(
                        "annotation #{} polygon #{} has an odd number of coordinates ({})",
                        index,
                        part,
                        coords.len()
                    )));
                }
                None => {
                    warn!(
                        "Annotation #{} polygon #{} has an odd number of coordinates ({}), skipping",
                        index,
                        part,
                        coords.len()
                    );
                    stats.malformed_polygons += 1;
                }
            }
        }

        if !area.is_finite() {
            return Err(AreaError::Unexpected(format!(
                "area of annotation #{} is not a finite number",
                index
            )));
        }

        let file_name = match images.get(&annotation.image_id) {
            Some(name) => name.to_string(),
            None => {
                stats.unresolved_images += 1;
                UNKNOWN_FILE.to_string()
            }
        };
        let object_name = match categories.get(&annotation.category_id) {
            Some(name) => name.to_string(),
            None => {
                stats.unresolved_categories += 1;
                UNKNOWN_OBJECT.to_string()
            }
        };

        records.push(ObjectAreaRecord {
            file_name,
            object_name,
            area,
        });
        stats.annotations_measured += 1;
    }

    Ok((records, stats))
}

/// Sum record areas per (file name, object name), ordered by that key.
pub fn group_by_file_and_object(records: &[ObjectAreaRecord]) -> Vec<AggregatedAreaRecord> {
    let mut grouped: BTreeMap<(&str, &str), f64> = BTreeMap::new();

    for record in records {
        *grouped
            .entry((record.file_name.as_str(), record.object_name.as_str()))
            .or_default() += record.area;
    }

    grouped
        .into_iter()
        .map(|((file_name, object_name), total_area)| AggregatedAreaRecord {
            file_name: file_name.to_string(),
            object_name: object_name.to_string(),
            total_area,
        })
        .collect()
}

/// Measure and group a parsed document.
pub fn aggregate(
    document: &AnnotationDocument,
    options: &AggregateOptions,
) -> Result<Vec<AggregatedAreaRecord>, AreaError> {
    let (records, _) = measure_annotations(document, options)?;
    Ok(group_by_file_and_object(&records))
}

/// Parse, measure and group COCO JSON text.
#[allow(dead_code)] // Convenience entry point; the CLI goes through `analyze`
pub fn aggregate_json(
    text: &str,
    options: &AggregateOptions,
) -> Result<Vec<AggregatedAreaRecord>, AreaError> {
    let document = parse_document(text)?;
    aggregate(&document, options)
}

fn totals_by<F>(rows: &[AggregatedAreaRecord], key: F) -> Vec<GroupTotal>
where
    F: Fn(&AggregatedAreaRecord) -> &str,
{
    let mut grouped: BTreeMap<&str, (f64, usize)> = BTreeMap::new();

    for row in rows {
        let entry = grouped.entry(key(row)).or_default();
        entry.0 += row.total_area;
        entry.1 += 1;
    }

    grouped
        .into_iter()
        .map(|(name, (total_area, entries))| GroupTotal {
            name: name.to_string(),
            total_area,
            entries,
        })
        .collect()
}

/// Total area per image file.
pub fn totals_by_file(rows: &[AggregatedAreaRecord]) -> Vec<GroupTotal> {
    totals_by(rows, |row| row.file_name.as_str())
}

/// Total area per object class.
pub fn totals_by_object(rows: &[AggregatedAreaRecord]) -> Vec<GroupTotal> {
    totals_by(rows, |row| row.object_name.as_str())
}

/// Sort rows by total area (largest first), ties by key.
pub fn sort_by_area(rows: &mut [AggregatedAreaRecord]) {
    rows.sort_by(|a, b| {
        b.total_area
            .partial_cmp(&a.total_area)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.file_name.cmp(&b.file_name))
            .then_with(|| a.object_name.cmp(&b.object_name))
    });
}

/// Process one uploaded document end to end.
///
/// `source` names the upload in the report; `text` is its raw content.
pub fn analyze(
    source: &str,
    text: &str,
    options: &AggregateOptions,
) -> Result<AreaReport, AreaError> {
    let start_time = Instant::now();

    let document = parse_document(text)?;
    debug!(
        "{}: {} images, {} categories, {} annotations",
        source,
        document.images.len(),
        document.categories.len(),
        document.annotations.len()
    );

    let (records, stats) = measure_annotations(&document, options)?;
    let rows = group_by_file_and_object(&records);
    let by_file = totals_by_file(&rows);
    let by_object = totals_by_object(&rows);
    let grand_total = rows.iter().map(|row| row.total_area).sum();

    info!(
        "{}: measured {} of {} annotations into {} rows",
        source,
        stats.annotations_measured,
        stats.annotations_seen,
        rows.len()
    );

    Ok(AreaReport {
        metadata: ReportMetadata {
            source: source.to_string(),
            generated_at: Utc::now(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        rows,
        by_file,
        by_object,
        grand_total,
        stats,
    })
}
