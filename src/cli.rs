//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// coco-area - polygon area totals for COCO annotation files
///
/// Reads COCO JSON annotation exports, measures every polygon-annotated
/// object with the shoelace formula and sums the areas per image file
/// and object class.
///
/// Examples:
///   coco-area _annotations.coco.json
///   coco-area exports/ --recursive --format markdown -o areas.md
///   coco-area train.json valid.json --sort area --precision 0
///   coco-area --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// COCO JSON files or directories containing them
    ///
    /// Each file is processed on its own; a failure in one file does not
    /// stop the others.
    #[arg(value_name = "INPUT", required_unless_present = "init_config")]
    pub inputs: Vec<PathBuf>,

    /// Output format (table, markdown, json)
    ///
    /// Defaults to the config file setting, or table.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .coco-area.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "COCO_AREA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Row order of the area table
    #[arg(long, value_name = "ORDER")]
    pub sort: Option<SortOrder>,

    /// Decimal places for areas in table and markdown output
    #[arg(long, value_name = "DIGITS")]
    pub precision: Option<usize>,

    /// Fail a file that contains a polygon with an odd coordinate count
    ///
    /// Without this flag such polygons are skipped with a warning.
    #[arg(long)]
    pub strict: bool,

    /// Omit the per-file and per-class summary tables
    #[arg(long)]
    pub no_summary: bool,

    /// Recurse into subdirectories when an input is a directory
    #[arg(short, long)]
    pub recursive: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .coco-area.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Terminal table (default)
    #[default]
    Table,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

/// Row order of the area table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// By file name, then object name
    #[default]
    Key,
    /// Largest total area first
    Area,
}

/// Largest accepted `--precision`.
pub const MAX_PRECISION: usize = 10;

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.inputs.is_empty() {
            return Err("At least one input file or directory is required".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(precision) = self.precision {
            if precision > MAX_PRECISION {
                return Err(format!("Precision must be at most {}", MAX_PRECISION));
            }
        }

        for input in &self.inputs {
            if !input.exists() {
                return Err(format!("Input does not exist: {}", input.display()));
            }
        }

        if let Some(ref output) = self.output {
            if output.is_dir() {
                return Err(format!("Output path is a directory: {}", output.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            inputs: vec![PathBuf::from("fixtures/sample.json")],
            format: None,
            output: None,
            config: None,
            sort: None,
            precision: None,
            strict: false,
            no_summary: false,
            recursive: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.inputs = vec![PathBuf::from("fixtures/does-not-exist.json")];
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_no_inputs() {
        let mut args = make_args();
        args.inputs.clear();
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_precision() {
        let mut args = make_args();
        args.precision = Some(MAX_PRECISION);
        assert!(args.validate().is_ok());
        args.precision = Some(MAX_PRECISION + 1);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "coco-area",
            "a.json",
            "b.json",
            "--format",
            "json",
            "--sort",
            "area",
            "--strict",
        ])
        .unwrap();

        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.sort, Some(SortOrder::Area));
        assert!(args.strict);
    }
}
