//! Static country reference data.
//!
//! Population and continent tables are loaded once into an immutable
//! [`ReferenceData`] that the aggregator borrows. Either table failing to load
//! aborts the run: without them every per-capita figure would be wrong.

use crate::error::{PipelineError, Result};
use crate::utils::{clean_name, count_column, string_column};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Country → (population, continent) lookup with precomputed rollups.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    populations: HashMap<String, u64>,
    continents: HashMap<String, String>,
    world_population: u64,
    continent_populations: BTreeMap<String, u64>,
}

impl ReferenceData {
    /// Build from in-memory pairs.
    ///
    /// Duplicate population rows keep the largest value; duplicate continent
    /// rows keep the first one seen.
    pub fn new<P, C>(populations: P, continents: C) -> Self
    where
        P: IntoIterator<Item = (String, u64)>,
        C: IntoIterator<Item = (String, String)>,
    {
        let mut population_map: HashMap<String, u64> = HashMap::new();
        for (country, population) in populations {
            let entry = population_map.entry(country).or_insert(population);
            *entry = (*entry).max(population);
        }

        let mut continent_map: HashMap<String, String> = HashMap::new();
        for (country, continent) in continents {
            continent_map.entry(country).or_insert(continent);
        }

        let world_population = population_map.values().sum();

        let mut continent_populations: BTreeMap<String, u64> = BTreeMap::new();
        for (country, population) in &population_map {
            if let Some(continent) = continent_map.get(country) {
                *continent_populations.entry(continent.clone()).or_insert(0) += population;
            }
        }

        Self {
            populations: population_map,
            continents: continent_map,
            world_population,
            continent_populations,
        }
    }

    /// Load both reference tables from CSV.
    ///
    /// - populations: `country`, `population`
    /// - continents: `country_name`, `continent`; the country is the text
    ///   before the first comma of `country_name`
    pub fn load(populations_path: &Path, continents_path: &Path) -> Result<Self> {
        info!(
            "Loading reference tables {} and {}",
            populations_path.display(),
            continents_path.display()
        );

        let populations =
            read_populations(populations_path).map_err(|e| reference_error(populations_path, e))?;
        let continents =
            read_continents(continents_path).map_err(|e| reference_error(continents_path, e))?;

        debug!(
            "Reference data: {} populations, {} continent assignments",
            populations.len(),
            continents.len()
        );

        Ok(Self::new(populations, continents))
    }

    pub fn population(&self, country: &str) -> Option<u64> {
        self.populations.get(country).copied()
    }

    pub fn continent(&self, country: &str) -> Option<&str> {
        self.continents.get(country).map(String::as_str)
    }

    /// Sum of every country population in the table.
    pub fn world_population(&self) -> u64 {
        self.world_population
    }

    /// Sum of the populations of a continent's countries.
    pub fn continent_population(&self, continent: &str) -> Option<u64> {
        self.continent_populations.get(continent).copied()
    }
}

fn reference_error(path: &Path, error: PipelineError) -> PipelineError {
    PipelineError::Reference {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

fn read_table(path: &Path) -> Result<DataFrame> {
    Ok(CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?)
}

fn required_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    string_column(df, name)?.ok_or_else(|| PipelineError::ColumnNotFound(name.to_string()))
}

fn read_populations(path: &Path) -> Result<Vec<(String, u64)>> {
    let df = read_table(path)?;
    let countries = required_strings(&df, "country")?;
    if string_column(&df, "population")?.is_none() {
        return Err(PipelineError::ColumnNotFound("population".to_string()));
    }
    let populations = count_column(&df, "population")?;

    Ok(countries
        .into_iter()
        .zip(populations)
        .filter_map(|(country, population)| country.map(|c| (c, population)))
        .collect())
}

fn read_continents(path: &Path) -> Result<Vec<(String, String)>> {
    let df = read_table(path)?;
    let names = required_strings(&df, "country_name")?;
    let continents = required_strings(&df, "continent")?;

    Ok(names
        .into_iter()
        .zip(continents)
        .filter_map(|(name, continent)| {
            let country = name
                .as_deref()
                .and_then(|n| n.split(',').next())
                .and_then(clean_name)?;
            Some((country, continent?))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn reference() -> ReferenceData {
        ReferenceData::new(
            vec![
                ("A".to_string(), 100),
                ("B".to_string(), 200),
                ("C".to_string(), 50),
            ],
            vec![
                ("A".to_string(), "Europe".to_string()),
                ("B".to_string(), "Europe".to_string()),
                ("C".to_string(), "Asia".to_string()),
            ],
        )
    }

    #[test]
    fn test_world_population_is_computed() {
        let data = ReferenceData::new(
            vec![("A".to_string(), 100), ("B".to_string(), 200)],
            Vec::new(),
        );
        assert_eq!(data.world_population(), 300);
    }

    #[test]
    fn test_continent_population() {
        let data = reference();
        assert_eq!(data.continent_population("Europe"), Some(300));
        assert_eq!(data.continent_population("Asia"), Some(50));
        assert_eq!(data.continent_population("Oceania"), None);
    }

    #[test]
    fn test_duplicate_rows() {
        let data = ReferenceData::new(
            vec![("A".to_string(), 100), ("A".to_string(), 120)],
            vec![
                ("A".to_string(), "Europe".to_string()),
                ("A".to_string(), "Asia".to_string()),
            ],
        );
        assert_eq!(data.population("A"), Some(120));
        assert_eq!(data.world_population(), 120);
        assert_eq!(data.continent("A"), Some("Europe"));
    }

    #[test]
    fn test_load_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let populations = dir.path().join("populations.csv");
        let continents = dir.path().join("continents.csv");
        fs::write(
            &populations,
            "country,population\nGreece,10423054\nItaly,60461826\n",
        )
        .unwrap();
        fs::write(
            &continents,
            "country_name,continent\n\"Greece, Hellenic Republic\",Europe\nItaly,Europe\n",
        )
        .unwrap();

        let data = ReferenceData::load(&populations, &continents).unwrap();

        assert_eq!(data.population("Greece"), Some(10_423_054));
        assert_eq!(data.continent("Greece"), Some("Europe"));
        assert_eq!(data.continent_population("Europe"), Some(70_884_880));
    }

    #[test]
    fn test_missing_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let continents = dir.path().join("continents.csv");
        fs::write(&continents, "country_name,continent\nItaly,Europe\n").unwrap();

        let err = ReferenceData::load(&dir.path().join("nope.csv"), &continents).unwrap_err();
        assert!(err.is_reference_failure());
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let populations = dir.path().join("populations.csv");
        let continents = dir.path().join("continents.csv");
        fs::write(&populations, "name,pop\nItaly,60461826\n").unwrap();
        fs::write(&continents, "country_name,continent\nItaly,Europe\n").unwrap();

        let err = ReferenceData::load(&populations, &continents).unwrap_err();
        assert_eq!(err.error_code(), "REFERENCE_UNAVAILABLE");
        assert!(err.to_string().contains("country"));
    }
}
