//! Key uniqueness checks.

use std::collections::HashMap;

use polars::prelude::DataFrame;

use cohort_common::{KEY_SEPARATOR, row_keys};

use crate::error::{IngestError, Result};

/// Finds the first key (in row order) that occurs more than once.
///
/// Returns the rendered key and its occurrence count. Rows with an incomplete
/// key are ignored; they cannot match any other table.
pub fn first_duplicate_key(df: &DataFrame, key: &[String]) -> Result<Option<(String, usize)>> {
    let keys = row_keys(df, key)?;
    let mut counts: HashMap<&str, usize> = HashMap::with_capacity(keys.len());
    for value in keys.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    Ok(keys
        .iter()
        .flatten()
        .find(|value| counts.get(value.as_str()).copied().unwrap_or(0) > 1)
        .map(|value| {
            let count = counts[value.as_str()];
            (render_key(key, value), count)
        }))
}

/// Verifies that `key` identifies every row of `df` uniquely.
pub fn verify_unique_key(df: &DataFrame, table: &str, key: &[String]) -> Result<()> {
    for column in key {
        if df.column(column).is_err() {
            return Err(IngestError::MissingKeyColumn {
                table: table.to_string(),
                column: column.clone(),
            });
        }
    }
    match first_duplicate_key(df, key)? {
        Some((rendered, count)) => Err(IngestError::DuplicateKey {
            table: table.to_string(),
            key: rendered,
            count,
        }),
        None => Ok(()),
    }
}

/// Renders a joined key as `(RID=1, VISCODE=bl)`.
fn render_key(columns: &[String], joined: &str) -> String {
    let parts: Vec<String> = columns
        .iter()
        .zip(joined.split(KEY_SEPARATOR))
        .map(|(column, value)| format!("{column}={value}"))
        .collect();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{Column, DataFrame};

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("RID".into(), &[1i64, 2, 2, 3]),
            Column::new("VISCODE".into(), &["bl", "bl", "m06", "bl"]),
        ])
        .unwrap()
    }

    #[test]
    fn composite_key_is_unique() {
        let key = vec!["RID".to_string(), "VISCODE".to_string()];
        assert!(verify_unique_key(&frame(), "primary", &key).is_ok());
    }

    #[test]
    fn subject_key_reports_first_duplicate() {
        let key = vec!["RID".to_string()];
        let duplicate = first_duplicate_key(&frame(), &key).unwrap();
        assert_eq!(duplicate, Some(("(RID=2)".to_string(), 2)));
    }

    #[test]
    fn missing_key_column_is_reported() {
        let key = vec!["PTID".to_string()];
        let result = verify_unique_key(&frame(), "tomm40", &key);
        assert!(matches!(result, Err(IngestError::MissingKeyColumn { .. })));
    }
}
