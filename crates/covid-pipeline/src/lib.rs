//! Pandemic Case/Death Pipeline Library
//!
//! Turns a directory of heterogeneous daily case/death reports into one
//! clean, enriched time series per country, per continent and for the World.
//!
//! # Overview
//!
//! A run is a fixed sequence of stages:
//!
//! - **Ingest**: read every `MM-DD-YYYY` report file, dated by its file name
//! - **Normalize**: map each report's layout onto canonical columns and
//!   reconcile country spellings through ordered rules
//! - **Aggregate**: roll countries up to continents and the World, joined
//!   with population and continent reference tables
//! - **Enrich**: daily deltas, a trailing deaths moving average and deaths
//!   per million
//! - **Write**: persist the table as CSV, atomically
//!
//! Corrupt files, unknown names and countries missing from the reference
//! tables are absorbed and counted in the [`RunSummary`]. Only a missing
//! reference table or an empty corpus stops a run.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use covid_pipeline::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .input_dir("data/raw_data")
//!     .populations_path("data/populations_df.csv")
//!     .continents_path("data/continents.csv")
//!     .output_path("data/processed_data.csv")
//!     .build()?;
//!
//! let result = Pipeline::builder().config(config).build()?.run()?;
//! println!("Processed data until: {:?}", result.last_date());
//! ```
//!
//! # Stages on their own
//!
//! Each stage is usable without the pipeline:
//!
//! ```rust,ignore
//! use covid_pipeline::{Aggregator, Enricher, Ingestor, Normalizer, ReferenceData};
//!
//! let (reports, _) = Ingestor::default().ingest(Path::new("data/raw_data"))?;
//! let (records, _) = Normalizer::default().normalize(&reports)?;
//! let reference = ReferenceData::load(populations, continents)?;
//! let (rows, _) = Aggregator::new(&reference).aggregate(&records);
//! let enriched = Enricher::default().enrich(rows);
//! ```

pub mod aggregate;
pub mod config;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod pipeline;
pub mod reference;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use aggregate::Aggregator;
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use enrich::Enricher;
pub use error::{PipelineError, ResultExt};
pub use ingest::{DailyReport, Ingestor};
pub use normalize::{CanonicalRule, CountryResolver, Normalizer, ReportLayout, Resolution, RuleSpec};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage, ProgressReporter,
    ProgressUpdate,
};
pub use reference::ReferenceData;
pub use types::{
    AggregateStats, AggregatedRecord, EnrichedRecord, EntityKind, IngestStats, NormalizeStats,
    NormalizedRecord, PipelineResult, RawRecord, RunSummary, WORLD,
};
