//! CSV table loading.

use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use cohort_model::KeyedTable;

use crate::error::{IngestError, Result};
use crate::keys::verify_unique_key;

/// Reads a CSV file with a single header row into a Polars DataFrame.
///
/// Column types are inferred from the whole file so a text value late in a
/// mostly numeric column keeps the column textual. Empty fields load as null;
/// no other type conversion happens here.
pub fn read_csv_table(path: &Path) -> Result<DataFrame> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    if metadata.len() == 0 {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "csv loaded"
    );
    Ok(df)
}

/// Reads a CSV file and, when `key` is given, verifies the key is unique.
///
/// A duplicate key is fatal: every later join would silently multiply or
/// drop rows.
pub fn load_table(path: &Path, name: &str, key: Option<&[String]>) -> Result<KeyedTable> {
    let df = read_csv_table(path)?;
    let key = key.map(<[String]>::to_vec).unwrap_or_default();
    if !key.is_empty() {
        verify_unique_key(&df, name, &key)?;
    }
    Ok(KeyedTable::new(name, key, df))
}
