//! Column registry loading.
//!
//! The registry file has one row per candidate column with the headers
//! `column_name`, `keep`, `numeric`, `categorical` and `data_type`. Extra
//! columns (descriptions, notes) are ignored.

use std::collections::HashMap;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::debug;

use cohort_model::{ColumnRegistry, DeclaredType, RegistryEntry};

use crate::error::{IngestError, Result};

const REQUIRED_HEADERS: [&str; 5] = ["column_name", "keep", "numeric", "categorical", "data_type"];

#[derive(Debug, Deserialize)]
struct RegistryRecord {
    column_name: String,
    keep: String,
    numeric: String,
    categorical: String,
    data_type: String,
}

/// Parses a registry flag cell.
///
/// Accepts `1`/`0` (also written as floats), `true`/`false`, `yes`/`no` and
/// `y`/`n`. A blank cell reads as unset.
///
/// # Examples
///
/// ```
/// use cohort_ingest::parse_flag;
///
/// assert_eq!(parse_flag("1"), Some(true));
/// assert_eq!(parse_flag("0.0"), Some(false));
/// assert_eq!(parse_flag(""), Some(false));
/// assert_eq!(parse_flag("maybe"), None);
/// ```
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" | "y" => Some(true),
        "" | "0" | "0.0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Loads the column registry from a CSV file.
///
/// Fails when a required header is absent, a flag is unreadable, or a
/// column name appears twice.
pub fn load_registry(path: &Path) -> Result<ColumnRegistry> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| map_open_error(path, e))?;

    let headers = reader.headers().map_err(|e| IngestError::Registry {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    for required in REQUIRED_HEADERS {
        if !headers.iter().any(|h| h == required) {
            return Err(IngestError::MissingColumn {
                column: required.to_string(),
                path: path.to_path_buf(),
            });
        }
    }

    let mut entries = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for record in reader.deserialize::<RegistryRecord>() {
        let record = record.map_err(|e| IngestError::Registry {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if record.column_name.is_empty() {
            continue;
        }
        let entry = RegistryEntry {
            keep: flag(path, &record, "keep", &record.keep)?,
            numeric: flag(path, &record, "numeric", &record.numeric)?,
            categorical: flag(path, &record, "categorical", &record.categorical)?,
            data_type: DeclaredType::from_label(&record.data_type),
            column_name: record.column_name,
        };
        *seen.entry(entry.column_name.clone()).or_insert(0) += 1;
        entries.push(entry);
    }

    if let Some(entry) = entries.iter().find(|e| seen[&e.column_name] > 1) {
        return Err(IngestError::DuplicateKey {
            table: format!("column registry {}", path.display()),
            key: format!("(column_name={})", entry.column_name),
            count: seen[&entry.column_name],
        });
    }

    let registry = ColumnRegistry::new(entries);
    debug!(
        path = %path.display(),
        entries = registry.len(),
        kept = registry.kept().count(),
        "column registry loaded"
    );
    Ok(registry)
}

fn flag(path: &Path, record: &RegistryRecord, field: &str, value: &str) -> Result<bool> {
    parse_flag(value).ok_or_else(|| IngestError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        column: record.column_name.clone(),
        path: path.to_path_buf(),
    })
}

fn map_open_error(path: &Path, error: csv::Error) -> IngestError {
    match error.into_kind() {
        csv::ErrorKind::Io(source) if source.kind() == std::io::ErrorKind::NotFound => {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        }
        csv::ErrorKind::Io(source) => IngestError::FileRead {
            path: path.to_path_buf(),
            source,
        },
        other => IngestError::Registry {
            path: path.to_path_buf(),
            message: format!("{other:?}"),
        },
    }
}
