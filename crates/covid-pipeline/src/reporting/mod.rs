//! Output of the enriched table.
//!
//! - [`write_records`] persists the table as CSV, atomically
//! - [`summarize`] condenses it to one [`EntitySummary`] per entity
//!
//! # Example
//!
//! ```rust,ignore
//! use covid_pipeline::reporting::{format_table, summarize, write_records};
//!
//! write_records(&result.records, Path::new("data/processed_data.csv"))?;
//! print!("{}", format_table(&summarize(&result.records)[..10]));
//! ```

mod summary;
mod writer;

pub use summary::{EntitySummary, format_table, summarize};
pub use writer::{OUTPUT_COLUMNS, to_dataframe, write_records};
