//! Report ingestion.
//!
//! Reads every per-day report in a directory and tags it with the date
//! encoded in its filename. Files that cannot be dated or parsed are left out
//! of the corpus and recorded in [`IngestStats::skipped_files`]; the only fatal
//! outcomes are an unreadable directory and a corpus with no usable file.

mod loader;

use crate::error::{PipelineError, Result, ResultExt};
use crate::types::IngestStats;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Positional date format at the end of each report file stem.
pub const REPORT_DATE_FORMAT: &str = "%m-%d-%Y";

const REPORT_DATE_LEN: usize = 10;

/// One day's report as published, columns untouched.
#[derive(Debug, Clone)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub source: PathBuf,
    pub frame: DataFrame,
}

/// Reads a directory of daily report files.
#[derive(Debug, Clone)]
pub struct Ingestor {
    extension: String,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new("csv")
    }
}

impl Ingestor {
    pub fn new(extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Load every dated report in `dir`.
    ///
    /// Files are visited in path order so repeated runs log identically;
    /// nothing downstream depends on that order.
    pub fn ingest(&self, dir: &Path) -> Result<(Vec<DailyReport>, IngestStats)> {
        self.ingest_with(dir, |_, _, _| {})
    }

    /// Like [`Ingestor::ingest`], calling `on_file(done, total, name)` after
    /// each candidate file.
    pub fn ingest_with<F>(
        &self,
        dir: &Path,
        mut on_file: F,
    ) -> Result<(Vec<DailyReport>, IngestStats)>
    where
        F: FnMut(usize, usize, &str),
    {
        info!("Reading daily reports from {}", dir.display());

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .context(format!("Reading report directory '{}'", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && self.has_report_extension(path))
            .collect();
        paths.sort();

        let mut stats = IngestStats::default();
        let mut reports = Vec::with_capacity(paths.len());

        let total = paths.len();
        for (idx, path) in paths.into_iter().enumerate() {
            let name = display_name(&path);
            on_file(idx + 1, total, &name);

            let Some(date) = report_date_from_path(&path) else {
                warn!("Skipping {}: no MM-DD-YYYY date in file name", name);
                stats.skipped_files.push(name);
                continue;
            };

            match loader::load_report_csv(&path) {
                Ok(frame) => {
                    debug!("Loaded {} ({} rows) for {}", name, frame.height(), date);
                    stats.files_read += 1;
                    stats.rows_read += frame.height();
                    reports.push(DailyReport {
                        date,
                        source: path,
                        frame,
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable report {}: {}", name, e);
                    stats.skipped_files.push(name);
                }
            }
        }

        if reports.is_empty() {
            return Err(PipelineError::EmptyCorpus(dir.to_path_buf()));
        }

        info!(
            "Read {} reports ({} rows), skipped {}",
            stats.files_read,
            stats.rows_read,
            stats.skipped_files.len()
        );

        Ok((reports, stats))
    }

    fn has_report_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

/// Extract the report date from the last ten characters of a file stem.
///
/// `03-01-2020.csv` and `daily_03-01-2020.csv` both yield 2020-03-01.
pub fn report_date_from_path(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    let start = stem.len().checked_sub(REPORT_DATE_LEN)?;
    let encoded = stem.get(start..)?;
    NaiveDate::parse_from_str(encoded, REPORT_DATE_FORMAT).ok()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
