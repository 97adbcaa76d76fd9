use crate::enrich::death_rate;
use crate::types::{DATE_FORMAT, EnrichedRecord, EntityKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latest standing of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity: String,
    pub kind: EntityKind,
    pub continent: Option<String>,
    pub population: Option<u64>,
    pub first_case: Option<NaiveDate>,
    pub first_death: Option<NaiveDate>,
    pub total_cases: u64,
    pub total_deaths: u64,
    pub deaths_per_million: Option<f64>,
    /// Share of confirmed cases that died, absent before the first case.
    pub deaths_to_cases: Option<f64>,
}

/// One summary per entity, most cases first.
///
/// Totals come from each entity's latest row; ties are broken by kind and
/// name so the order is stable.
pub fn summarize(records: &[EnrichedRecord]) -> Vec<EntitySummary> {
    let mut by_entity: BTreeMap<(EntityKind, &str), EntitySummary> = BTreeMap::new();
    let mut latest: BTreeMap<(EntityKind, &str), NaiveDate> = BTreeMap::new();

    for record in records {
        let base = &record.base;
        let key = (base.kind, base.entity.as_str());

        let summary = by_entity.entry(key).or_insert_with(|| EntitySummary {
            entity: base.entity.clone(),
            kind: base.kind,
            continent: base.continent.clone(),
            population: base.population,
            first_case: None,
            first_death: None,
            total_cases: 0,
            total_deaths: 0,
            deaths_per_million: None,
            deaths_to_cases: None,
        });

        if base.confirmed > 0 {
            summary.first_case = Some(summary.first_case.map_or(base.date, |d| d.min(base.date)));
        }
        if base.deaths > 0 {
            summary.first_death = Some(summary.first_death.map_or(base.date, |d| d.min(base.date)));
        }

        let newest = latest.entry(key).or_insert(base.date);
        if base.date >= *newest {
            *newest = base.date;
            summary.total_cases = base.confirmed;
            summary.total_deaths = base.deaths;
        }
    }

    let mut summaries: Vec<EntitySummary> = by_entity
        .into_values()
        .map(|mut summary| {
            summary.deaths_per_million = death_rate(summary.total_deaths, summary.population);
            summary.deaths_to_cases = (summary.total_cases > 0)
                .then(|| summary.total_deaths as f64 / summary.total_cases as f64);
            summary
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_cases
            .cmp(&a.total_cases)
            .then_with(|| (a.kind, &a.entity).cmp(&(b.kind, &b.entity)))
    });
    summaries
}

/// Render summaries as a fixed-width text table.
pub fn format_table(summaries: &[EntitySummary]) -> String {
    let mut out = format!(
        "{:<32} {:<10} {:<14} {:>12} {:>10} {:>12} {:>12} {:>10} {:>8}\n",
        "Entity", "Kind", "Continent", "Cases", "Deaths", "First case", "First death", "Deaths/M", "CFR %"
    );

    for s in summaries {
        out.push_str(&format!(
            "{:<32} {:<10} {:<14} {:>12} {:>10} {:>12} {:>12} {:>10} {:>8}\n",
            s.entity,
            s.kind,
            s.continent.as_deref().unwrap_or("-"),
            s.total_cases,
            s.total_deaths,
            format_date(s.first_case),
            format_date(s.first_death),
            s.deaths_per_million
                .map_or_else(|| "-".to_string(), |v| format!("{:.1}", v)),
            s.deaths_to_cases
                .map_or_else(|| "-".to_string(), |v| format!("{:.2}", v * 100.0)),
        ));
    }
    out
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.format(DATE_FORMAT).to_string())
}
