//! Report rendering.
//!
//! This module renders upload outcomes as terminal tables, Markdown
//! documents or JSON.

use crate::cli::OutputFormat;
use crate::error::AreaError;
use crate::models::{
    AggregatedAreaRecord, AggregationStats, AreaReport, GroupTotal, UploadOutcome,
};
use anyhow::Result;
use prettytable::{format, row, Cell, Row, Table};
use serde_json::json;

/// Column headers of the area table.
pub const COLUMNS: [&str; 3] = ["File Name", "Object Name", "Total Area"];

/// Rendering options shared by the text formats.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Decimal places for areas.
    pub precision: usize,
    /// Include per-file and per-class summary tables and statistics.
    pub include_summaries: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            precision: 2,
            include_summaries: true,
        }
    }
}

/// Render all outcomes in the requested format.
pub fn render(
    outcomes: &[UploadOutcome],
    format: OutputFormat,
    options: &RenderOptions,
) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(join_sections(
            outcomes
                .iter()
                .map(|outcome| generate_table_report(outcome, options)),
        )),
        OutputFormat::Markdown => Ok(join_sections(
            outcomes
                .iter()
                .map(|outcome| generate_markdown_report(outcome, options)),
        )),
        OutputFormat::Json => generate_json_report(outcomes),
    }
}

fn join_sections(sections: impl Iterator<Item = String>) -> String {
    sections.collect::<Vec<_>>().join("\n")
}

/// Message shown when an upload could not be processed.
pub fn failure_message(source: &str, error: &AreaError) -> String {
    match error {
        AreaError::Format(_) => format!(
            "Error: Could not decode JSON from {}. Please ensure it's a valid COCO JSON format.",
            source
        ),
        other => format!("An unexpected error occurred: {}", other),
    }
}

/// Notice shown when an upload had no eligible annotations.
pub fn no_annotations_message(source: &str) -> String {
    format!("No polygon annotations found in {}.", source)
}

fn format_area(area: f64, precision: usize) -> String {
    format!("{:.*}", precision, area)
}

// --- Terminal table ---

/// Render one outcome for the terminal.
pub fn generate_table_report(outcome: &UploadOutcome, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("Calculated Area: {}\n", outcome.source()));

    match outcome {
        UploadOutcome::Table(report) => {
            output.push_str(&area_table(&report.rows, options.precision).to_string());

            if options.include_summaries {
                output.push_str("\nTotals by file:\n");
                output.push_str(
                    &totals_table("File Name", &report.by_file, options.precision).to_string(),
                );
                output.push_str("\nTotals by object:\n");
                output.push_str(
                    &totals_table("Object Name", &report.by_object, options.precision)
                        .to_string(),
                );
                output.push('\n');
                output.push_str(&stats_lines(
                    &report.stats,
                    report.grand_total,
                    options.precision,
                ));
            }
        }
        UploadOutcome::NoAnnotations(report) => {
            output.push_str(&format!(
                "{}\n",
                no_annotations_message(&report.metadata.source)
            ));
            if options.include_summaries {
                output.push_str(&stats_lines(
                    &report.stats,
                    report.grand_total,
                    options.precision,
                ));
            }
        }
        UploadOutcome::Failed { source, error } => {
            output.push_str(&format!("{}\n", failure_message(source, error)));
        }
    }

    output
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table
}

fn area_table(rows: &[AggregatedAreaRecord], precision: usize) -> Table {
    let mut table = new_table();
    table.set_titles(row![COLUMNS[0], COLUMNS[1], COLUMNS[2]]);

    for record in rows {
        table.add_row(Row::new(vec![
            Cell::new(&record.file_name),
            Cell::new(&record.object_name),
            Cell::new(&format_area(record.total_area, precision)).style_spec("r"),
        ]));
    }

    table
}

fn totals_table(label: &str, totals: &[GroupTotal], precision: usize) -> Table {
    let mut table = new_table();
    table.set_titles(row![label, "Total Area", "Entries"]);

    for total in totals {
        table.add_row(Row::new(vec![
            Cell::new(&total.name),
            Cell::new(&format_area(total.total_area, precision)).style_spec("r"),
            Cell::new(&total.entries.to_string()).style_spec("r"),
        ]));
    }

    table
}

fn stats_lines(stats: &AggregationStats, grand_total: f64, precision: usize) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Grand total area: {}", format_area(grand_total, precision)));
    lines.push(format!(
        "Annotations: {} measured, {} skipped of {} (crowd: {}, no segmentation: {}, RLE: {})",
        stats.annotations_measured,
        stats.skipped(),
        stats.annotations_seen,
        stats.skipped_crowd,
        stats.skipped_no_segmentation,
        stats.skipped_rle
    ));
    lines.push(format!("Polygons measured: {}", stats.polygons_measured));
    if stats.malformed_polygons > 0 {
        lines.push(format!(
            "Malformed polygons skipped: {}",
            stats.malformed_polygons
        ));
    }
    if stats.unresolved_images > 0 || stats.unresolved_categories > 0 {
        lines.push(format!(
            "Unresolved ids: {} image, {} category",
            stats.unresolved_images, stats.unresolved_categories
        ));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

// --- Markdown ---

/// Render one outcome as a Markdown section.
pub fn generate_markdown_report(outcome: &UploadOutcome, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("## Calculated Area: {}\n\n", outcome.source()));

    match outcome {
        UploadOutcome::Table(report) => {
            output.push_str(&generate_metadata_section(report));
            output.push_str(&generate_rows_section(&report.rows, options.precision));

            if options.include_summaries {
                output.push_str(&generate_totals_section(
                    "Totals by File",
                    "File Name",
                    &report.by_file,
                    options.precision,
                ));
                output.push_str(&generate_totals_section(
                    "Totals by Object",
                    "Object Name",
                    &report.by_object,
                    options.precision,
                ));
                output.push_str(&generate_stats_section(report, options.precision));
            }
        }
        UploadOutcome::NoAnnotations(report) => {
            output.push_str(&generate_metadata_section(report));
            output.push_str(&format!(
                "> ⚠️ {}\n\n",
                no_annotations_message(&report.metadata.source)
            ));
            if options.include_summaries {
                output.push_str(&generate_stats_section(report, options.precision));
            }
        }
        UploadOutcome::Failed { source, error } => {
            output.push_str(&format!("> ❌ {}\n\n", failure_message(source, error)));
        }
    }

    output
}

fn generate_metadata_section(report: &AreaReport) -> String {
    format!(
        "*Generated: {} | Duration: {:.3}s*\n\n",
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.metadata.duration_seconds
    )
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn generate_rows_section(rows: &[AggregatedAreaRecord], precision: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("| {} | {} | {} |\n", COLUMNS[0], COLUMNS[1], COLUMNS[2]));
    section.push_str("|:---|:---|---:|\n");

    for record in rows {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            escape_cell(&record.file_name),
            escape_cell(&record.object_name),
            format_area(record.total_area, precision)
        ));
    }
    section.push('\n');

    section
}

fn generate_totals_section(
    title: &str,
    label: &str,
    totals: &[GroupTotal],
    precision: usize,
) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", title));
    section.push_str(&format!("| {} | Total Area | Entries |\n", label));
    section.push_str("|:---|---:|:---:|\n");

    for total in totals {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            escape_cell(&total.name),
            format_area(total.total_area, precision),
            total.entries
        ));
    }
    section.push('\n');

    section
}

fn generate_stats_section(report: &AreaReport, precision: usize) -> String {
    let stats = &report.stats;
    let mut section = String::new();

    section.push_str("### Statistics\n\n");
    section.push_str(&format!(
        "- **Grand Total Area:** {}\n",
        format_area(report.grand_total, precision)
    ));
    section.push_str(&format!(
        "- **Annotations:** {} measured of {}\n",
        stats.annotations_measured, stats.annotations_seen
    ));
    section.push_str(&format!(
        "- **Skipped:** {} crowd, {} without segmentation, {} RLE\n",
        stats.skipped_crowd, stats.skipped_no_segmentation, stats.skipped_rle
    ));
    section.push_str(&format!("- **Polygons:** {}\n", stats.polygons_measured));
    if stats.malformed_polygons > 0 {
        section.push_str(&format!(
            "- **Malformed Polygons:** {}\n",
            stats.malformed_polygons
        ));
    }
    if stats.unresolved_images > 0 || stats.unresolved_categories > 0 {
        section.push_str(&format!(
            "- **Unresolved Ids:** {} image, {} category\n",
            stats.unresolved_images, stats.unresolved_categories
        ));
    }
    section.push('\n');

    section
}

// --- JSON ---

fn outcome_to_json(outcome: &UploadOutcome) -> serde_json::Value {
    match outcome {
        UploadOutcome::Table(report) => json!({
            "source": report.metadata.source,
            "status": "ok",
            "report": report,
        }),
        UploadOutcome::NoAnnotations(report) => json!({
            "source": report.metadata.source,
            "status": "no_annotations",
            "message": no_annotations_message(&report.metadata.source),
            "report": report,
        }),
        UploadOutcome::Failed { source, error } => json!({
            "source": source,
            "status": "error",
            "error": {
                "kind": error.kind(),
                "message": failure_message(source, error),
                "detail": error.to_string(),
            },
        }),
    }
}

/// Generate a JSON array with one entry per outcome.
pub fn generate_json_report(outcomes: &[UploadOutcome]) -> Result<String> {
    let values: Vec<serde_json::Value> = outcomes.iter().map(outcome_to_json).collect();
    serde_json::to_string_pretty(&values).map_err(Into::into)
}
