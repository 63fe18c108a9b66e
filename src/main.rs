//! coco-area - polygon area totals for COCO annotation files
//!
//! A CLI tool that reads COCO JSON annotation exports, measures every
//! polygon-annotated object and reports the summed area per image file
//! and object class.
//!
//! Exit codes:
//!   0 - Every input was processed (including inputs without polygon annotations)
//!   1 - Runtime or config error, or at least one input could not be processed

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;

use analysis::AggregateOptions;
use anyhow::{Context, Result};
use cli::{Args, SortOrder};
use config::{Config, DEFAULT_CONFIG_FILE};
use error::AreaError;
use indicatif::{ProgressBar, ProgressStyle};
use models::UploadOutcome;
use report::RenderOptions;
use scanner::InputFile;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging (config may turn on verbose output)
    init_logging(config.log_level(&args))?;

    info!("coco-area v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Effective config: {:?}", config);

    match run(&args, &config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .coco-area.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to change the output format, precision and sorting.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` takes precedence over the CLI level.
///
/// Logs go to stderr so that stdout only carries reports.
fn init_logging(level: tracing::Level) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` path must load. A broken default file only
/// produces a warning.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", DEFAULT_CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

/// Process every input and write the report. Returns exit code (0 or 1).
fn run(args: &Args, config: &Config) -> Result<i32> {
    let inputs = scanner::collect_inputs(&args.inputs, config.general.recursive)?;
    if inputs.is_empty() {
        anyhow::bail!("No JSON files found in the given inputs");
    }
    info!("Processing {} file(s)", inputs.len());

    let options = AggregateOptions {
        strict_polygons: config.aggregation.strict_polygons,
    };

    let progress = progress_bar(inputs.len(), args.quiet);
    let mut outcomes = Vec::with_capacity(inputs.len());

    for input in &inputs {
        progress.set_message(input.name.clone());

        let outcome = process_upload(input, &options, config.report.sort);
        if let UploadOutcome::Failed { source, error } = &outcome {
            warn!("{}: {}", source, error);
        }
        outcomes.push(outcome);

        progress.inc(1);
    }
    progress.finish_and_clear();

    let render_options = RenderOptions {
        precision: config.report.precision,
        include_summaries: config.report.include_summaries,
    };
    let output = report::render(&outcomes, config.report.format, &render_options)?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                println!("✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    if failed > 0 {
        error!("{} of {} file(s) could not be processed", failed, outcomes.len());
        return Ok(1);
    }

    Ok(0)
}

/// Handle one upload: read, analyze, order rows.
///
/// Never fails as a whole; errors become a `Failed` outcome.
fn process_upload(
    input: &InputFile,
    options: &AggregateOptions,
    sort: SortOrder,
) -> UploadOutcome {
    let result = input
        .read()
        .map_err(AreaError::from)
        .and_then(|text| analysis::analyze(&input.name, &text, options))
        .map(|mut report| {
            if sort == SortOrder::Area {
                analysis::sort_by_area(&mut report.rows);
            }
            report
        });

    UploadOutcome::from_result(&input.name, result)
}

/// Progress bar for multi-file runs; hidden for a single file or --quiet.
fn progress_bar(len: usize, quiet: bool) -> ProgressBar {
    if quiet || len < 2 {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn input(path: &str) -> InputFile {
        scanner::collect_inputs(&[PathBuf::from(path)], false)
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_process_upload_sample() {
        let outcome = process_upload(
            &input("fixtures/sample.json"),
            &AggregateOptions::default(),
            SortOrder::Key,
        );

        match outcome {
            UploadOutcome::Table(report) => {
                assert_eq!(report.rows.len(), 5);
                assert_eq!(report.rows[0].file_name, "Unknown File");
            }
            other => panic!("expected a table, got {:?}", other),
        }
    }

    #[test]
    fn test_process_upload_sorted_by_area() {
        let outcome = process_upload(
            &input("fixtures/sample.json"),
            &AggregateOptions::default(),
            SortOrder::Area,
        );

        match outcome {
            UploadOutcome::Table(report) => {
                assert_eq!(report.rows[0].object_name, "dog");
                assert_eq!(report.rows[0].total_area, 100.0);
            }
            other => panic!("expected a table, got {:?}", other),
        }
    }

    #[test]
    fn test_process_upload_failures_are_outcomes() {
        let truncated = process_upload(
            &input("fixtures/truncated.json"),
            &AggregateOptions::default(),
            SortOrder::Key,
        );
        assert!(matches!(
            truncated,
            UploadOutcome::Failed {
                error: AreaError::Format(_),
                ..
            }
        ));

        let crowd = process_upload(
            &input("fixtures/crowd_only.json"),
            &AggregateOptions::default(),
            SortOrder::Key,
        );
        assert!(matches!(crowd, UploadOutcome::NoAnnotations(_)));
    }

    #[test]
    fn test_process_upload_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.json");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let outcome = process_upload(
            &input(path.to_str().unwrap()),
            &AggregateOptions::default(),
            SortOrder::Key,
        );
        assert!(matches!(
            outcome,
            UploadOutcome::Failed {
                error: AreaError::Unexpected(_),
                ..
            }
        ));
    }
}
