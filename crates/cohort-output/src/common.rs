//! Shared helpers for output writers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;

/// Ensure a parent directory exists for a file path.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    Ok(())
}

/// Reorders a table so the key columns come first.
///
/// Key columns that are absent are ignored; the remaining columns keep their
/// relative order.
pub fn keys_first(df: &DataFrame, keys: &[String]) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    let ordered: Vec<&str> = keys
        .iter()
        .filter(|key| names.contains(key))
        .chain(names.iter().filter(|name| !keys.contains(name)))
        .map(String::as_str)
        .collect();
    df.select(ordered).context("reorder key columns")
}
