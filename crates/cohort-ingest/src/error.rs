//! Error types for data ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading pipeline inputs.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Input file not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === CSV Parsing Errors ===
    /// Failed to parse CSV with Polars.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV file has no header row.
    #[error("CSV file is empty: {path}")]
    EmptyCsv { path: PathBuf },

    // === Key Errors ===
    /// Declared key column absent from the table.
    #[error("key column '{column}' not found in {table}")]
    MissingKeyColumn { table: String, column: String },

    /// Declared key is not unique.
    #[error("duplicate key {key} in {table} ({count} rows)")]
    DuplicateKey {
        table: String,
        key: String,
        count: usize,
    },

    // === Registry Errors ===
    /// Required column not found in the registry file.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Invalid value in a registry field.
    #[error("invalid {field} value '{value}' for column '{column}' in {path}")]
    InvalidValue {
        field: String,
        value: String,
        column: String,
        path: PathBuf,
    },

    /// Malformed registry record.
    #[error("failed to read registry {path}: {message}")]
    Registry { path: PathBuf, message: String },

    // === Config Errors ===
    /// Pipeline configuration could not be parsed.
    #[error("invalid pipeline config {path}: {message}")]
    Config { path: PathBuf, message: String },

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
