//! Output writers for the cohort feature-preparation pipeline.
//!
//! - [`write_snapshot`]: the pre-encoding inspection table
//! - [`write_encoded`]: the fully encoded modeling table
//! - [`write_quality_report`]: the run's data-quality report as JSON
//!
//! Both tables are written with the key columns first.

mod common;
mod report;
mod tables;

pub use common::{ensure_parent_dir, keys_first};
pub use report::write_quality_report;
pub use tables::{write_csv, write_encoded, write_snapshot};
