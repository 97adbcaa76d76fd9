use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the synthetic entity summing every country.
pub const WORLD: &str = "World";

/// Date format used for every date written by the pipeline.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of a daily report, after its layout has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub country: String,
    pub region: Option<String>,
    pub confirmed: u64,
    pub deaths: u64,
}

/// A canonical (country, date) observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub date: NaiveDate,
    pub country: String,
    pub confirmed: u64,
    pub deaths: u64,
}

/// Aggregation level of an entity.
///
/// The declaration order is also the output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Country,
    Continent,
    World,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Continent => "continent",
            Self::World => "world",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row per (entity, date) after rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub entity: String,
    pub kind: EntityKind,
    /// Continent of a country, the continent itself, or `World`.
    pub continent: Option<String>,
    pub date: NaiveDate,
    pub confirmed: u64,
    pub deaths: u64,
    pub population: Option<u64>,
}

/// An aggregated row plus its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub base: AggregatedRecord,
    pub daily_confirmed: i64,
    pub daily_deaths: i64,
    /// Trailing moving average of `daily_deaths`, absent until the window is full.
    pub flat_ma: Option<f64>,
    /// Deaths per million inhabitants, absent without a positive population.
    pub death_rate: Option<f64>,
}

/// Counters collected while reading the report directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub files_read: usize,
    pub skipped_files: Vec<String>,
    pub rows_read: usize,
}

/// Counters collected while normalizing reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub legacy_reports: usize,
    pub current_reports: usize,
    /// Reports whose columns matched neither known layout.
    pub unrecognized_reports: Vec<String>,
    /// Rows without any usable country field.
    pub dropped_rows: usize,
    /// Raw names that matched no rule and were kept as-is, sorted.
    pub unmapped: Vec<String>,
    /// Distinct (country, date) pairs after merging.
    pub records: usize,
}

/// Counters collected while rolling countries up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub countries: usize,
    pub continents: usize,
    pub dates: usize,
    /// Countries absent from the population table, sorted.
    pub missing_population: Vec<String>,
    /// Countries absent from the continent table, sorted.
    pub missing_continent: Vec<String>,
}

/// What a pipeline run did, suitable for logs and JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub duration_ms: u64,
    pub ingest: IngestStats,
    pub normalize: NormalizeStats,
    pub aggregate: AggregateStats,
    pub rows_written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub records: Vec<EnrichedRecord>,
    pub summary: RunSummary,
}

impl PipelineResult {
    /// Latest date present in the output, if any.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.base.date).max()
    }
}
