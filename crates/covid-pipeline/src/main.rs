//! CLI entry point for the case/death pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use covid_pipeline::reporting::{EntitySummary, format_table, summarize};
use covid_pipeline::{Pipeline, PipelineConfig, PipelineResult, RunSummary};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Pandemic case/death time-series pipeline",
    long_about = "Reads a directory of daily case/death reports, reconciles country names \
                  and report layouts, rolls countries up to continents and the World, and \
                  writes one enriched CSV.\n\n\
                  EXAMPLES:\n  \
                  # Default data/ layout\n  \
                  covid-pipeline\n\n  \
                  # Custom locations and a 14-day moving average\n  \
                  covid-pipeline -i reports/ -o out/series.csv --window 14\n\n  \
                  # Check a corpus without writing anything\n  \
                  covid-pipeline --dry-run --summary 20"
)]
struct Args {
    /// Directory of daily report files (MM-DD-YYYY.csv)
    #[arg(short, long, default_value = "data/raw_data")]
    input: PathBuf,

    /// Population reference table (country, population)
    #[arg(long, default_value = "data/populations_df.csv")]
    populations: PathBuf,

    /// Continent reference table (country_name, continent)
    #[arg(long, default_value = "data/continents.csv")]
    continents: PathBuf,

    /// Output CSV path
    #[arg(short, long, default_value = "data/processed_data.csv")]
    output: PathBuf,

    /// JSON file of ordered {"pattern", "canonical"} rules replacing the built-in ones
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Trailing window of the daily deaths moving average
    #[arg(long, default_value_t = covid_pipeline::config::DEFAULT_MOVING_AVERAGE_WINDOW)]
    window: usize,

    /// Run every stage but do not write the output table
    #[arg(long)]
    dry_run: bool,

    /// Print the N entities with the most cases
    #[arg(long, value_name = "N")]
    summary: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only the run summary (and entity summaries when
    /// `--summary` is given) is printed.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: &'a RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    entities: Option<Vec<EntitySummary>>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.is_dir() {
        return Err(anyhow!("Input directory not found: {}", args.input.display()));
    }

    let mut config_builder = PipelineConfig::builder()
        .input_dir(&args.input)
        .populations_path(&args.populations)
        .continents_path(&args.continents)
        .output_path(&args.output)
        .moving_average_window(args.window)
        .save_to_disk(!args.dry_run);

    if let Some(ref rules) = args.rules {
        config_builder = config_builder.rules_path(rules);
    }

    let config = config_builder.build()?;
    let pipeline = Pipeline::builder().config(config).build()?;

    if args.dry_run {
        info!("Dry run: the output table will not be written");
    }

    match pipeline.run() {
        Ok(result) => handle_pipeline_output(&result, &args),
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            error!("Pipeline failed: {}", e);
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

/// Handle pipeline output based on CLI flags.
///
/// - Default: human-readable summary on stdout
/// - `--json`: JSON on stdout only
fn handle_pipeline_output(result: &PipelineResult, args: &Args) -> Result<()> {
    let entities = args.summary.map(|n| {
        let mut all = summarize(&result.records);
        all.truncate(n);
        all
    });

    if args.json {
        let output = JsonOutput {
            summary: &result.summary,
            entities,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let summary = &result.summary;
    if !summary.normalize.unmapped.is_empty() {
        info!(
            "{} country names passed through without a rule",
            summary.normalize.unmapped.len()
        );
    }
    if !summary.ingest.skipped_files.is_empty() {
        warn!(
            "Skipped {} report files: {}",
            summary.ingest.skipped_files.len(),
            summary.ingest.skipped_files.join(", ")
        );
    }

    print_human_readable_summary(result, args);

    if let Some(entities) = entities {
        println!();
        print!("{}", format_table(&entities));
    }

    Ok(())
}

/// Print a human-readable summary of the run.
fn print_human_readable_summary(result: &PipelineResult, args: &Args) {
    let summary = &result.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("PIPELINE COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} reports, {} rows, {} skipped)",
        args.input.display(),
        summary.ingest.files_read,
        summary.ingest.rows_read,
        summary.ingest.skipped_files.len()
    );
    match &summary.output_path {
        Some(path) => println!("Output: {} ({} rows)", path, summary.rows_written),
        None => println!("Output: not written (dry run, {} rows)", result.records.len()),
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Reports: {} legacy, {} current, {} unrecognized",
        summary.normalize.legacy_reports,
        summary.normalize.current_reports,
        summary.normalize.unrecognized_reports.len()
    );
    println!(
        "  Entities: {} countries, {} continents over {} dates",
        summary.aggregate.countries, summary.aggregate.continents, summary.aggregate.dates
    );
    println!(
        "  Missing reference data: {} without population, {} without continent",
        summary.aggregate.missing_population.len(),
        summary.aggregate.missing_continent.len()
    );
    println!();

    match &summary.last_date {
        Some(date) => println!("Processed data until: {}", date),
        None => println!("Processed data until: -"),
    }
    println!("{}", "=".repeat(80));
}
