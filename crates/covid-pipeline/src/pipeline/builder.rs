//! Main pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating a run from raw reports to the enriched table.

use crate::aggregate::Aggregator;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::enrich::Enricher;
use crate::error::Result;
use crate::ingest::Ingestor;
use crate::normalize::{CountryResolver, Normalizer};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::reference::ReferenceData;
use crate::reporting::write_records;
use crate::types::{DATE_FORMAT, PipelineResult, RunSummary};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The case/death pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use covid_pipeline::{Pipeline, PipelineConfig};
///
/// let result = Pipeline::builder()
///     .config(
///         PipelineConfig::builder()
///             .input_dir("data/raw_data")
///             .output_path("data/processed_data.csv")
///             .build()?,
///     )
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
///
/// println!("Processed data until: {:?}", result.last_date());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    resolver: Option<CountryResolver>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Runs may be moved onto a worker thread
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once.
    ///
    /// Either the whole table is produced (and written, unless
    /// `save_to_disk` is off) or an error is returned and nothing is written.
    pub fn run(&self) -> Result<PipelineResult> {
        match self.run_internal() {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Pipeline completed: {} rows",
                    result.records.len()
                )));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Builder override, then the configured rules file, then the built-in rules.
    fn resolver(&self) -> Result<CountryResolver> {
        if let Some(resolver) = &self.resolver {
            return Ok(resolver.clone());
        }
        match &self.config.rules_path {
            Some(path) => {
                info!("Loading canonicalization rules from {}", path.display());
                CountryResolver::from_json_file(path)
            }
            None => Ok(CountryResolver::builtin()),
        }
    }

    fn run_internal(&self) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let config = &self.config;

        info!("Starting case/death pipeline...");
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            0.0,
            "Loading reference data...",
        ));

        let reference = ReferenceData::load(&config.populations_path, &config.continents_path)?;
        let resolver = self.resolver()?;
        info!("Using {} canonicalization rules", resolver.rules().len());

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            1.0,
            "Reference data loaded",
        ));

        // Step 1: Ingest
        info!("Step 1: Reading daily reports...");
        let ingestor = Ingestor::new(config.file_extension.as_str());
        let (reports, ingest_stats) =
            ingestor.ingest_with(&config.input_dir, |done, total, name| {
                self.report_progress(ProgressUpdate::with_items(
                    PipelineStage::Ingesting,
                    name,
                    done,
                    total,
                    format!("Reading {}", name),
                ));
            })?;

        // Step 2: Normalize
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Normalizing,
            0.0,
            format!("Normalizing {} reports...", reports.len()),
        ));
        info!("Step 2: Normalizing reports...");
        let (normalized, normalize_stats) = Normalizer::new(resolver).normalize(&reports)?;
        drop(reports);

        // Step 3: Aggregate
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Aggregating,
            0.0,
            format!("Aggregating {} country-day records...", normalized.len()),
        ));
        info!("Step 3: Aggregating...");
        let (aggregated, aggregate_stats) = Aggregator::new(&reference).aggregate(&normalized);

        // Step 4: Enrich
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Enriching,
            0.0,
            "Computing daily metrics...",
        ));
        info!("Step 4: Computing daily metrics...");
        let records = Enricher::new(config.moving_average_window).enrich(aggregated);

        // Step 5: Write
        let output_path = if config.save_to_disk {
            self.report_progress(ProgressUpdate::new(
                PipelineStage::Writing,
                0.0,
                format!("Writing {}...", config.output_path.display()),
            ));
            info!("Step 5: Writing output table...");
            write_records(&records, &config.output_path)?;
            Some(config.output_path.display().to_string())
        } else {
            info!("Step 5: Skipping output (save_to_disk disabled)");
            None
        };

        let first_date = records.iter().map(|r| r.base.date).min();
        let last_date = records.iter().map(|r| r.base.date).max();

        let summary = RunSummary {
            duration_ms: start_time.elapsed().as_millis() as u64,
            ingest: ingest_stats,
            normalize: normalize_stats,
            aggregate: aggregate_stats,
            rows_written: if output_path.is_some() { records.len() } else { 0 },
            first_date: first_date.map(|d| d.format(DATE_FORMAT).to_string()),
            last_date: last_date.map(|d| d.format(DATE_FORMAT).to_string()),
            output_path,
        };

        info!(
            "Pipeline finished in {} ms: {} rows",
            summary.duration_ms,
            records.len()
        );

        Ok(PipelineResult { records, summary })
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    resolver: Option<CountryResolver>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this resolver instead of the one named by `rules_path`.
    pub fn resolver(mut self, resolver: CountryResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            resolver: self.resolver,
            progress_reporter: self.progress_reporter,
        })
    }
}
