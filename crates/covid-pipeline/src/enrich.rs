//! Derived per-entity metrics.
//!
//! Every entity's series is ordered by date before any delta is taken, so
//! the result does not depend on how the input was ordered.

use crate::config::DEFAULT_MOVING_AVERAGE_WINDOW;
use crate::types::{AggregatedRecord, EnrichedRecord};
use std::collections::VecDeque;
use tracing::info;

/// Adds daily deltas, the deaths moving average and deaths per million.
#[derive(Debug, Clone, Copy)]
pub struct Enricher {
    window: usize,
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new(DEFAULT_MOVING_AVERAGE_WINDOW)
    }
}

impl Enricher {
    /// A window of 0 is treated as 1.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Enrich every row.
    ///
    /// Output is sorted by (kind, entity, date).
    pub fn enrich(&self, mut records: Vec<AggregatedRecord>) -> Vec<EnrichedRecord> {
        records.sort_by(|a, b| {
            (a.kind, &a.entity, a.date).cmp(&(b.kind, &b.entity, b.date))
        });

        let mut output = Vec::with_capacity(records.len());
        let mut start = 0;
        while start < records.len() {
            let end = records[start..]
                .iter()
                .position(|r| r.kind != records[start].kind || r.entity != records[start].entity)
                .map_or(records.len(), |offset| start + offset);
            self.enrich_series(&records[start..end], &mut output);
            start = end;
        }

        info!(
            "Enriched {} rows (moving average window {})",
            output.len(),
            self.window
        );
        output
    }

    /// One entity's date-ordered series.
    fn enrich_series(&self, series: &[AggregatedRecord], output: &mut Vec<EnrichedRecord>) {
        let mut previous: Option<&AggregatedRecord> = None;
        let mut trailing: VecDeque<i64> = VecDeque::with_capacity(self.window);
        let mut trailing_sum: i64 = 0;

        for record in series {
            let (daily_confirmed, daily_deaths) = match previous {
                Some(prev) => (
                    delta(record.confirmed, prev.confirmed),
                    delta(record.deaths, prev.deaths),
                ),
                None => (0, 0),
            };

            trailing.push_back(daily_deaths);
            trailing_sum += daily_deaths;
            if trailing.len() > self.window {
                trailing_sum -= trailing.pop_front().unwrap_or_default();
            }
            let flat_ma = (trailing.len() == self.window)
                .then(|| trailing_sum as f64 / self.window as f64);

            output.push(EnrichedRecord {
                base: record.clone(),
                daily_confirmed,
                daily_deaths,
                flat_ma,
                death_rate: death_rate(record.deaths, record.population),
            });
            previous = Some(record);
        }
    }
}

/// Signed difference; cumulative counts do get revised downwards.
fn delta(current: u64, previous: u64) -> i64 {
    current as i64 - previous as i64
}

/// Deaths per million inhabitants.
pub fn death_rate(deaths: u64, population: Option<u64>) -> Option<f64> {
    match population {
        Some(population) if population > 0 => Some(deaths as f64 * 1e6 / population as f64),
        _ => None,
    }
}
