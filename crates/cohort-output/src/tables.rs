//! CSV table writers.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::info;

use crate::common::{ensure_parent_dir, keys_first};

/// Writes a table as CSV with a header row, key columns first.
///
/// Missing values are written as empty fields.
pub fn write_csv(df: &DataFrame, keys: &[String], path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut ordered = keys_first(df, keys)?;
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut ordered)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Writes the pre-encoding snapshot table.
pub fn write_snapshot(df: &DataFrame, keys: &[String], path: &Path) -> Result<()> {
    write_csv(df, keys, path)?;
    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "snapshot written"
    );
    Ok(())
}

/// Writes the encoded modeling table.
pub fn write_encoded(df: &DataFrame, keys: &[String], path: &Path) -> Result<()> {
    write_csv(df, keys, path)?;
    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "encoded table written"
    );
    Ok(())
}
