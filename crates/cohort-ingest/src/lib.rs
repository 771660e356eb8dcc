//! Data ingestion for the cohort feature-preparation pipeline.
//!
//! This crate loads every input of a run into memory:
//!
//! - **Tables**: CSV files read into Polars DataFrames, with declared keys
//!   verified unique at load time
//! - **Column registry**: the `column_name, keep, numeric, categorical, data_type`
//!   file driving column selection and dispatch
//! - **Pipeline config**: the TOML file describing sources, keys and outputs
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use cohort_ingest::{load_pipeline_config, load_registry, load_table};
//!
//! let config = load_pipeline_config(Path::new("pipeline.toml"))?;
//! let registry = load_registry(&config.registry.path)?;
//! let primary = load_table(&config.primary.path, "primary", Some(&config.keys.primary()))?;
//! ```

mod config;
mod error;
mod keys;
mod registry;
mod table;

// === Error Types ===
pub use error::{IngestError, Result};

// === Tables ===
pub use table::{load_table, read_csv_table};
pub use keys::{first_duplicate_key, verify_unique_key};

// === Registry ===
pub use registry::{load_registry, parse_flag};

// === Config ===
pub use config::{load_pipeline_config, parse_pipeline_config};
