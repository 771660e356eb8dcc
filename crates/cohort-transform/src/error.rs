//! Error types for the transform stages.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Structural failures that abort a pipeline run.
///
/// Per-value problems (unparseable numbers, rare levels) are never reported
/// through this type; they are counted in the quality report instead.
#[derive(Debug, Error)]
pub enum TransformError {
    /// More than one row per key survived record selection.
    #[error("duplicate key {key} in {table} after selection ({count} rows)")]
    DuplicateKey {
        table: String,
        key: String,
        count: usize,
    },

    /// A kept registry column is absent from the joined table.
    #[error("registry column '{column}' is not present in the joined table")]
    UnknownColumn { column: String },

    /// A column would be added under a name that already exists.
    #[error("column '{column}' from {origin} collides with an existing column")]
    ColumnCollision { column: String, origin: String },

    /// A source declaration names a column its table does not have.
    #[error("column '{column}' is not present in source {table}")]
    MissingSourceColumn { table: String, column: String },

    /// A join or key column is missing.
    #[error("key column '{column}' is missing from {table}")]
    MissingKeyColumn { table: String, column: String },

    /// A positional column window is reversed.
    #[error("column range {start}..{end} for source {table} is reversed")]
    InvalidColumnRange {
        table: String,
        start: usize,
        end: usize,
    },

    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;
