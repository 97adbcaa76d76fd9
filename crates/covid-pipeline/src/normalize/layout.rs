//! Upstream report layouts.
//!
//! Daily reports changed shape once: early files carry `Province/State` and
//! `Country/Region` (plus a `Last Update` timestamp), later files switch to
//! `Province_State` and `Country_Region` with county-level rows. The layout is
//! decided once per file and each variant maps its own columns onto
//! [`RawRecord`].

use crate::error::Result;
use crate::ingest::DailyReport;
use crate::types::RawRecord;
use crate::utils::{count_column, has_column, string_column};
use polars::prelude::*;

/// Columns a layout reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutColumns {
    pub country: &'static str,
    /// Country column of the other layout, used when `country` is blank.
    pub fallback_country: &'static str,
    pub region: &'static str,
    pub confirmed: &'static str,
    pub deaths: &'static str,
}

/// The two historical report layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    /// `Province/State`, `Country/Region`, `Last Update`, ...
    Legacy,
    /// `FIPS`, `Admin2`, `Province_State`, `Country_Region`, `Last_Update`, ...
    Current,
}

impl ReportLayout {
    /// Detect the layout from the frame's columns.
    ///
    /// `Country_Region` wins when both country columns are present.
    pub fn detect(df: &DataFrame) -> Option<Self> {
        if has_column(df, Self::Current.columns().country) {
            Some(Self::Current)
        } else if has_column(df, Self::Legacy.columns().country) {
            Some(Self::Legacy)
        } else {
            None
        }
    }

    pub fn columns(&self) -> LayoutColumns {
        match self {
            Self::Legacy => LayoutColumns {
                country: "Country/Region",
                fallback_country: "Country_Region",
                region: "Province/State",
                confirmed: "Confirmed",
                deaths: "Deaths",
            },
            Self::Current => LayoutColumns {
                country: "Country_Region",
                fallback_country: "Country/Region",
                region: "Province_State",
                confirmed: "Confirmed",
                deaths: "Deaths",
            },
        }
    }

    /// Map a report's rows onto raw records.
    ///
    /// Returns the records and the number of rows dropped for lacking any
    /// country value.
    pub fn extract(&self, report: &DailyReport) -> Result<(Vec<RawRecord>, usize)> {
        let columns = self.columns();
        let df = &report.frame;
        let height = df.height();

        let primary = string_column(df, columns.country)?.unwrap_or_else(|| vec![None; height]);
        let fallback =
            string_column(df, columns.fallback_country)?.unwrap_or_else(|| vec![None; height]);
        let regions = string_column(df, columns.region)?.unwrap_or_else(|| vec![None; height]);
        let confirmed = count_column(df, columns.confirmed)?;
        let deaths = count_column(df, columns.deaths)?;

        let mut records = Vec::with_capacity(height);
        let mut dropped = 0;

        for (idx, (country, fallback_country)) in primary.into_iter().zip(fallback).enumerate() {
            let Some(country) = country.or(fallback_country) else {
                dropped += 1;
                continue;
            };

            records.push(RawRecord {
                date: report.date,
                country,
                region: regions[idx].clone(),
                confirmed: confirmed[idx],
                deaths: deaths[idx],
            });
        }

        Ok((records, dropped))
    }
}
