//! Configuration types for the case/death pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default trailing window for the daily deaths moving average.
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 7;

/// Configuration for the pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use covid_pipeline::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .input_dir("data/raw_data")
///     .populations_path("data/populations_df.csv")
///     .continents_path("data/continents.csv")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding one report file per day.
    /// Default: "data/raw_data"
    pub input_dir: PathBuf,

    /// Extension of report files inside `input_dir` (without the dot).
    /// Default: "csv"
    pub file_extension: String,

    /// Reference table mapping country to population.
    /// Default: "data/populations_df.csv"
    pub populations_path: PathBuf,

    /// Reference table mapping country to continent.
    /// Default: "data/continents.csv"
    pub continents_path: PathBuf,

    /// Where the enriched table is written.
    /// Default: "data/processed_data.csv"
    pub output_path: PathBuf,

    /// Optional JSON file replacing the built-in canonicalization rules.
    /// Default: None
    pub rules_path: Option<PathBuf>,

    /// Number of trailing points averaged into `flat_ma`.
    /// Default: 7
    pub moving_average_window: usize,

    /// Whether to persist the enriched table.
    /// When false, the table is only returned in memory.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/raw_data"),
            file_extension: "csv".to_string(),
            populations_path: PathBuf::from("data/populations_df.csv"),
            continents_path: PathBuf::from("data/continents.csv"),
            output_path: PathBuf::from("data/processed_data.csv"),
            rules_path: None,
            moving_average_window: DEFAULT_MOVING_AVERAGE_WINDOW,
            save_to_disk: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.moving_average_window == 0 {
            return Err(ConfigValidationError::InvalidWindow(
                self.moving_average_window,
            ));
        }

        let extension = self.file_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(ConfigValidationError::EmptyExtension);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid moving average window: {0} (must be at least 1)")]
    InvalidWindow(usize),

    #[error("Report file extension must not be empty")]
    EmptyExtension,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    input_dir: Option<PathBuf>,
    file_extension: Option<String>,
    populations_path: Option<PathBuf>,
    continents_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    moving_average_window: Option<usize>,
    save_to_disk: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the directory of daily report files.
    pub fn input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(path.into());
        self
    }

    /// Set the report file extension (e.g. "csv").
    pub fn file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = Some(extension.into());
        self
    }

    /// Set the population reference table.
    pub fn populations_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.populations_path = Some(path.into());
        self
    }

    /// Set the continent reference table.
    pub fn continents_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.continents_path = Some(path.into());
        self
    }

    /// Set the output table path.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Load canonicalization rules from a JSON file instead of the built-in list.
    ///
    /// The file holds an ordered array of `{"pattern": ..., "canonical": ...}`
    /// objects; order is significant.
    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    /// Set the moving average window.
    ///
    /// # Arguments
    /// * `window` - Number of trailing points, at least 1
    pub fn moving_average_window(mut self, window: usize) -> Self {
        self.moving_average_window = Some(window);
        self
    }

    /// Enable or disable writing the enriched table to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            input_dir: self.input_dir.unwrap_or(defaults.input_dir),
            file_extension: self
                .file_extension
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or(defaults.file_extension),
            populations_path: self.populations_path.unwrap_or(defaults.populations_path),
            continents_path: self.continents_path.unwrap_or(defaults.continents_path),
            output_path: self.output_path.unwrap_or(defaults.output_path),
            rules_path: self.rules_path,
            moving_average_window: self
                .moving_average_window
                .unwrap_or(DEFAULT_MOVING_AVERAGE_WINDOW),
            save_to_disk: self.save_to_disk.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
