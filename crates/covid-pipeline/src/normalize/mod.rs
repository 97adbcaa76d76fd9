//! Report normalization.
//!
//! Turns raw daily reports of either upstream layout into one canonical
//! (date, country, confirmed, deaths) series:
//! - detects each report's [`ReportLayout`] and maps its columns
//! - resolves country spellings through a [`CountryResolver`]
//! - sums rows sharing a (country, date), e.g. provinces of one country
//! - returns rows ordered by (country, date)

mod layout;
mod rules;

pub use layout::{LayoutColumns, ReportLayout};
pub use rules::{CanonicalRule, CountryResolver, Resolution, RuleSpec};

use crate::error::Result;
use crate::ingest::DailyReport;
use crate::types::{NormalizeStats, NormalizedRecord, RawRecord};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Normalizes daily reports into canonical country records.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    resolver: CountryResolver,
}

impl Normalizer {
    pub fn new(resolver: CountryResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &CountryResolver {
        &self.resolver
    }

    /// Normalize a set of reports in any order.
    pub fn normalize(
        &self,
        reports: &[DailyReport],
    ) -> Result<(Vec<NormalizedRecord>, NormalizeStats)> {
        info!("Normalizing {} reports...", reports.len());

        let mut stats = NormalizeStats::default();
        let mut raw = Vec::new();

        for report in reports {
            let Some(layout) = ReportLayout::detect(&report.frame) else {
                let name = report.source.display().to_string();
                warn!("Skipping {}: no country column of a known layout", name);
                stats.unrecognized_reports.push(name);
                continue;
            };

            match layout {
                ReportLayout::Legacy => stats.legacy_reports += 1,
                ReportLayout::Current => stats.current_reports += 1,
            }

            let (records, dropped) = layout.extract(report)?;
            if dropped > 0 {
                debug!(
                    "Dropped {} rows without a country in {}",
                    dropped,
                    report.source.display()
                );
            }
            stats.dropped_rows += dropped;
            raw.extend(records);
        }

        stats.unrecognized_reports.sort();

        let (records, unmapped) = self.merge(raw);
        stats.records = records.len();
        stats.unmapped = unmapped;

        info!(
            "Normalized to {} country-day records ({} legacy / {} current reports, {} rows dropped)",
            stats.records, stats.legacy_reports, stats.current_reports, stats.dropped_rows
        );

        Ok((records, stats))
    }

    /// Canonicalize names and sum duplicate (country, date) pairs.
    ///
    /// Returns the merged records ordered by (country, date) along with the
    /// sorted raw names that no rule matched.
    pub fn merge(&self, raw: Vec<RawRecord>) -> (Vec<NormalizedRecord>, Vec<String>) {
        let mut totals: BTreeMap<(String, NaiveDate), (u64, u64)> = BTreeMap::new();
        let mut unmapped: BTreeSet<String> = BTreeSet::new();

        for record in raw {
            let country = match self.resolver.resolve(&record.country) {
                Resolution::Mapped(canonical) => canonical.to_string(),
                Resolution::Unmapped(name) => {
                    if unmapped.insert(name.to_string()) {
                        debug!("No rule for '{}', keeping it as a country", name);
                    }
                    name.to_string()
                }
            };

            let entry = totals.entry((country, record.date)).or_insert((0, 0));
            entry.0 += record.confirmed;
            entry.1 += record.deaths;
        }

        let records = totals
            .into_iter()
            .map(|((country, date), (confirmed, deaths))| NormalizedRecord {
                date,
                country,
                confirmed,
                deaths,
            })
            .collect();

        (records, unmapped.into_iter().collect())
    }
}
