//! Shared helpers for pulling typed values out of report tables.
//!
//! Report files are read with every column as text, so the helpers here do
//! the parsing the stages need: trimmed names and non-negative counts.

use crate::error::Result;
use polars::prelude::*;

// =============================================================================
// Column Name Utilities
// =============================================================================

/// Strip a UTF-8 byte order mark and surrounding whitespace from a header.
///
/// Early daily reports carry a BOM on their first column, which would
/// otherwise hide `Province/State` from layout detection.
pub fn clean_column_name(name: &str) -> &str {
    name.trim_start_matches('\u{feff}').trim()
}

/// Whether the frame has a column with exactly this (cleaned) name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names()
        .into_iter()
        .any(|col| clean_column_name(col.as_str()) == name)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 3] = [',', ' ', '_'];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust,ignore
/// use covid_pipeline::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string(" 1,234 "), "1234");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Try to parse a string as a numeric value (f64).
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Parse a cumulative count.
///
/// Integers and floats ("12", "12.0") are accepted, floats are rounded.
/// Negative and non-finite values count as missing.
pub fn parse_count(s: &str) -> Option<u64> {
    let value = parse_numeric_string(s)?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.round() as u64)
}

/// Normalize a free-text name: trimmed, `None` when blank.
pub fn clean_name(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// =============================================================================
// Column Extraction Utilities
// =============================================================================

/// Read a column as optional strings, whatever its stored dtype.
///
/// Returns `Ok(None)` when the frame has no such column.
pub fn string_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Some(col) = find_column(df, name) else {
        return Ok(None);
    };

    let series = col.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|opt| opt.and_then(clean_name))
        .collect();

    Ok(Some(values))
}

/// Read a count column; absent columns and missing cells become 0.
pub fn count_column(df: &DataFrame, name: &str) -> Result<Vec<u64>> {
    let Some(col) = find_column(df, name) else {
        return Ok(vec![0; df.height()]);
    };

    let series = col.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|opt| opt.and_then(parse_count).unwrap_or(0))
        .collect();

    Ok(values)
}

fn find_column<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Column> {
    df.get_columns()
        .iter()
        .find(|col| clean_column_name(col.name().as_str()) == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_column_name_strips_bom() {
        assert_eq!(clean_column_name("\u{feff}Province/State"), "Province/State");
        assert_eq!(clean_column_name(" Deaths "), "Deaths");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("15"), Some(15));
        assert_eq!(parse_count("15.0"), Some(15));
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_count("n/a"), None);
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  Azerbaijan"), Some("Azerbaijan".to_string()));
        assert_eq!(clean_name("   "), None);
    }

    #[test]
    fn test_string_and_count_columns() {
        let df = DataFrame::new(vec![
            Column::new("\u{feff}Country".into(), &[Some("Italy"), None, Some(" ")]),
            Column::new("Confirmed".into(), &[Some(3i64), None, Some(7)]),
        ])
        .unwrap();

        let countries = string_column(&df, "Country").unwrap().unwrap();
        assert_eq!(countries, vec![Some("Italy".to_string()), None, None]);

        assert_eq!(count_column(&df, "Confirmed").unwrap(), vec![3, 0, 7]);
        assert_eq!(count_column(&df, "Deaths").unwrap(), vec![0, 0, 0]);
        assert!(string_column(&df, "Province").unwrap().is_none());
        assert!(has_column(&df, "Country"));
    }
}
