//! CSV loading for single report files.

use anyhow::{Result, anyhow};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Load one report file with every column read as text.
///
/// Upstream files disagree on numeric formatting across revisions, so no
/// dtype inference happens here; the normalizer parses counts itself.
pub(crate) fn load_report_csv(path: &Path) -> Result<DataFrame> {
    // Strategy 1: Standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) if df.width() > 0 => return Ok(df),
        Ok(_) => {
            debug!("Standard loading of {} produced no columns", path.display());
        }
        Err(e) => {
            debug!("Standard loading of {} failed: {}", path.display(), e);
        }
    }

    // Strategy 2: Pre-clean content
    let content = std::fs::read_to_string(path)?;
    let cleaned = clean_csv_content(&content);
    if cleaned.is_empty() {
        return Err(anyhow!("{} has no content", path.display()));
    }

    CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(cleaned))
        .finish()
        .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))
}

/// Drop blank lines and collapse doubled quote artifacts.
fn clean_csv_content(content: &str) -> String {
    content
        .trim_start_matches('\u{feff}')
        .replace("\"\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_report_reads_all_columns_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("03-01-2020.csv");
        fs::write(
            &path,
            "Province/State,Country/Region,Last Update,Confirmed,Deaths\n\
             Hubei,Mainland China,2020-03-01T10:13:19,66907,2761\n",
        )
        .unwrap();

        let df = load_report_csv(&path).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.column("Confirmed").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_clean_csv_content_drops_blank_lines() {
        let cleaned = clean_csv_content("\u{feff}a,b\n\n1,2\n   \n");
        assert_eq!(cleaned, "a,b\n1,2");
    }

    #[test]
    fn test_load_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("03-02-2020.csv");
        fs::write(&path, "").unwrap();

        assert!(load_report_csv(&path).is_err());
    }
}
