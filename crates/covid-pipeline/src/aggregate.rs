//! Hierarchical rollup of country series.
//!
//! Produces one row per (entity, date) for every country, every continent
//! with at least one reporting country, and the World. Countries missing
//! from the reference tables still count towards World (and towards their
//! continent when only the population is missing); they just carry a null
//! population.

use crate::reference::ReferenceData;
use crate::types::{AggregateStats, AggregatedRecord, EntityKind, NormalizedRecord, WORLD};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

type Totals = (u64, u64);

/// Rolls country records up to continents and the World.
pub struct Aggregator<'a> {
    reference: &'a ReferenceData,
}

impl<'a> Aggregator<'a> {
    pub fn new(reference: &'a ReferenceData) -> Self {
        Self { reference }
    }

    /// Aggregate normalized records.
    ///
    /// Output order is countries, then continents, then World, each sorted
    /// by (name, date).
    pub fn aggregate(&self, records: &[NormalizedRecord]) -> (Vec<AggregatedRecord>, AggregateStats) {
        info!("Aggregating {} country-day records...", records.len());

        let mut countries: BTreeMap<(&str, NaiveDate), Totals> = BTreeMap::new();
        for record in records {
            add(
                countries.entry((record.country.as_str(), record.date)).or_default(),
                record.confirmed,
                record.deaths,
            );
        }

        let mut continents: BTreeMap<(&str, NaiveDate), Totals> = BTreeMap::new();
        let mut world: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
        let mut missing_population: BTreeSet<String> = BTreeSet::new();
        let mut missing_continent: BTreeSet<String> = BTreeSet::new();
        let mut output = Vec::with_capacity(countries.len());

        for (&(country, date), &(confirmed, deaths)) in &countries {
            let continent = self.reference.continent(country);
            let population = self.reference.population(country);

            if population.is_none() {
                missing_population.insert(country.to_string());
            }
            match continent {
                Some(continent) => add(
                    continents.entry((continent, date)).or_default(),
                    confirmed,
                    deaths,
                ),
                None => {
                    missing_continent.insert(country.to_string());
                }
            }
            add(world.entry(date).or_default(), confirmed, deaths);

            output.push(AggregatedRecord {
                entity: country.to_string(),
                kind: EntityKind::Country,
                continent: continent.map(str::to_string),
                date,
                confirmed,
                deaths,
                population,
            });
        }

        for (&(continent, date), &(confirmed, deaths)) in &continents {
            output.push(AggregatedRecord {
                entity: continent.to_string(),
                kind: EntityKind::Continent,
                continent: Some(continent.to_string()),
                date,
                confirmed,
                deaths,
                population: self.reference.continent_population(continent),
            });
        }

        let world_population = self.reference.world_population();
        for (&date, &(confirmed, deaths)) in &world {
            output.push(AggregatedRecord {
                entity: WORLD.to_string(),
                kind: EntityKind::World,
                continent: Some(WORLD.to_string()),
                date,
                confirmed,
                deaths,
                population: Some(world_population),
            });
        }

        if !missing_population.is_empty() {
            warn!(
                "{} countries have no population reference; their per-capita metrics will be empty",
                missing_population.len()
            );
            debug!("Countries without population: {:?}", missing_population);
        }
        if !missing_continent.is_empty() {
            warn!(
                "{} countries have no continent reference and only count towards World",
                missing_continent.len()
            );
            debug!("Countries without continent: {:?}", missing_continent);
        }

        let stats = AggregateStats {
            countries: countries.keys().map(|(c, _)| *c).collect::<BTreeSet<_>>().len(),
            continents: continents.keys().map(|(c, _)| *c).collect::<BTreeSet<_>>().len(),
            dates: world.len(),
            missing_population: missing_population.into_iter().collect(),
            missing_continent: missing_continent.into_iter().collect(),
        };

        info!(
            "Aggregated {} rows: {} countries, {} continents, {} dates",
            output.len(),
            stats.countries,
            stats.continents,
            stats.dates
        );

        (output, stats)
    }
}

fn add(totals: &mut Totals, confirmed: u64, deaths: u64) {
    totals.0 += confirmed;
    totals.1 += deaths;
}
