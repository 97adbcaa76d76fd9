//! Pipeline module.
//!
//! This module provides the pipeline orchestrating a run and its progress
//! reporting types.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
