//! Data model types for the cohort feature-preparation pipeline.
//!
//! This crate holds the plain types every other crate agrees on:
//!
//! - [`table`]: [`KeyedTable`], a DataFrame with a declared unique key
//! - [`registry`]: the column registry that drives filtering and column dispatch
//! - [`source`]: auxiliary source declarations (join key, selection policy, columns)
//! - [`config`]: the pipeline configuration file layout
//! - [`quality`]: the per-run data-quality report

pub mod config;
pub mod quality;
pub mod registry;
pub mod source;
pub mod table;

pub use config::{
    EncodingOptions, KeyColumns, NormalizeOptions, OutputPaths, PipelineConfig, PrimarySpec,
    RegistrySpec,
};
pub use quality::{ColumnQuality, QualityReport, QualityWarning, SourceSummary, WarningKind};
pub use registry::{ColumnRegistry, ColumnRole, DeclaredType, RegistryEntry};
pub use source::{ColumnRange, JoinKey, SelectionPolicy, SourceSpec};
pub use table::KeyedTable;
