//! Custom error types for the case/death pipeline.
//!
//! Only structural failures surface here. Local anomalies (a corrupt report
//! file, an unmapped country name, a country without reference data) are
//! absorbed by the stage that meets them and only show up in the run summary.
//!
//! Errors are serializable so a caller can hand them to a UI or write them
//! into a JSON report.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input directory produced no usable report file.
    #[error("No usable report files found in '{}'", .0.display())]
    EmptyCorpus(PathBuf),

    /// A reference table (population or continent) could not be loaded.
    #[error("Failed to load reference table '{}': {reason}", path.display())]
    Reference { path: PathBuf, reason: String },

    /// A canonicalization rule carries an invalid regex.
    #[error("Invalid canonicalization rule '{pattern}': {reason}")]
    InvalidRule { pattern: String, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Column was not found in a table.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, independent of the message text.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyCorpus(_) => "EMPTY_CORPUS",
            Self::Reference { .. } => "REFERENCE_UNAVAILABLE",
            Self::InvalidRule { .. } => "INVALID_RULE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error came from missing or unreadable reference data.
    pub fn is_reference_failure(&self) -> bool {
        match self {
            Self::Reference { .. } => true,
            Self::WithContext { source, .. } => source.is_reference_failure(),
            _ => false,
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PipelineError::EmptyCorpus(PathBuf::from("raw")).error_code(),
            "EMPTY_CORPUS"
        );
        assert_eq!(
            PipelineError::ColumnNotFound("country".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_is_reference_failure() {
        let error = PipelineError::Reference {
            path: PathBuf::from("populations.csv"),
            reason: "missing".to_string(),
        };
        assert!(error.is_reference_failure());
        assert!(error.with_context("Loading reference data").is_reference_failure());
        assert!(!PipelineError::InvalidConfig("x".to_string()).is_reference_failure());
    }

    #[test]
    fn test_error_serialization() {
        let error = PipelineError::ColumnNotFound("Country_Region".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Country_Region"));
    }

    #[test]
    fn test_with_context() {
        let error = PipelineError::InvalidConfig("window".to_string())
            .with_context("Building pipeline");
        assert!(error.to_string().contains("Building pipeline"));
        assert_eq!(error.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_empty_corpus_message_names_directory() {
        let error = PipelineError::EmptyCorpus(PathBuf::from("data/raw_data"));
        assert!(error.to_string().contains("data/raw_data"));
    }
}
