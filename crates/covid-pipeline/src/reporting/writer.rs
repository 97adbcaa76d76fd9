use crate::error::{Result, ResultExt};
use crate::types::{DATE_FORMAT, EnrichedRecord};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Column order of the persisted table.
pub const OUTPUT_COLUMNS: [&str; 11] = [
    "date",
    "country",
    "confirmed",
    "deaths",
    "population",
    "daily_confirmed",
    "daily_deaths",
    "flat_ma",
    "death_rate",
    "continent",
    "kind",
];

/// Build the output frame, one row per record in the given order.
pub fn to_dataframe(records: &[EnrichedRecord]) -> Result<DataFrame> {
    let dates: Vec<String> = records
        .iter()
        .map(|r| r.base.date.format(DATE_FORMAT).to_string())
        .collect();
    let entities: Vec<&str> = records.iter().map(|r| r.base.entity.as_str()).collect();
    let confirmed: Vec<u64> = records.iter().map(|r| r.base.confirmed).collect();
    let deaths: Vec<u64> = records.iter().map(|r| r.base.deaths).collect();
    let population: Vec<Option<u64>> = records.iter().map(|r| r.base.population).collect();
    let daily_confirmed: Vec<i64> = records.iter().map(|r| r.daily_confirmed).collect();
    let daily_deaths: Vec<i64> = records.iter().map(|r| r.daily_deaths).collect();
    let flat_ma: Vec<Option<f64>> = records.iter().map(|r| r.flat_ma).collect();
    let death_rate: Vec<Option<f64>> = records.iter().map(|r| r.death_rate).collect();
    let continent: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.base.continent.as_deref())
        .collect();
    let kind: Vec<&str> = records.iter().map(|r| r.base.kind.as_str()).collect();

    let df = DataFrame::new(vec![
        Column::new("date".into(), dates),
        Column::new("country".into(), entities),
        Column::new("confirmed".into(), confirmed),
        Column::new("deaths".into(), deaths),
        Column::new("population".into(), population),
        Column::new("daily_confirmed".into(), daily_confirmed),
        Column::new("daily_deaths".into(), daily_deaths),
        Column::new("flat_ma".into(), flat_ma),
        Column::new("death_rate".into(), death_rate),
        Column::new("continent".into(), continent),
        Column::new("kind".into(), kind),
    ])
    .context("Building output frame")?;

    Ok(df)
}

/// Write the records as CSV, replacing `path` atomically.
///
/// The table is written to a temporary file next to `path` and renamed over
/// it, so readers never see a partial file and a failed run leaves any
/// previous output in place.
pub fn write_records(records: &[EnrichedRecord], path: &Path) -> Result<()> {
    let mut df = to_dataframe(records)?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .context(format!("Creating output directory '{}'", parent.display()))?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)
        .context(format!("Creating temporary file in '{}'", parent.display()))?;
    debug!("Writing {} rows to {}", df.height(), temp_file.path().display());

    CsvWriter::new(&mut temp_file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut df)
        .context(format!("Writing '{}'", path.display()))?;

    temp_file
        .persist(path)
        .map_err(|e| e.error)
        .context(format!("Replacing '{}'", path.display()))?;

    info!("Dataset saved: {}", path.display());
    Ok(())
}
