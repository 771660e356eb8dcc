//! Registry-driven column filtering.

use polars::prelude::DataFrame;
use tracing::warn;

use cohort_model::{ColumnRegistry, QualityReport, WarningKind};

use crate::error::{Result, TransformError};

/// Keeps the key columns followed by every kept registry column.
///
/// Kept columns appear in registry order. A kept entry whose column is
/// absent is an error; entries with `keep = 0` are never resolved. Columns
/// present in the table but absent from the registry are dropped and
/// reported as warnings.
pub fn filter_columns(
    df: &DataFrame,
    registry: &ColumnRegistry,
    key_columns: &[String],
    report: &mut QualityReport,
) -> Result<DataFrame> {
    let mut selected: Vec<&str> = Vec::with_capacity(key_columns.len() + registry.len());
    for key in key_columns {
        if df.column(key).is_err() {
            return Err(TransformError::MissingKeyColumn {
                table: "joined table".to_string(),
                column: key.clone(),
            });
        }
        selected.push(key);
    }

    for entry in registry.kept() {
        if key_columns.contains(&entry.column_name) {
            continue;
        }
        if df.column(&entry.column_name).is_err() {
            return Err(TransformError::UnknownColumn {
                column: entry.column_name.clone(),
            });
        }
        if entry.has_flag_conflict() {
            warn!(
                column = %entry.column_name,
                "column is flagged both numeric and categorical, treating as categorical"
            );
            report.warn(
                WarningKind::FlagConflict,
                &entry.column_name,
                "flagged numeric and categorical; encoded as categorical",
            );
        }
        selected.push(&entry.column_name);
    }

    let unregistered: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !key_columns.contains(name) && !registry.contains(name))
        .collect();
    if !unregistered.is_empty() {
        warn!(
            count = unregistered.len(),
            "columns without a registry entry were dropped"
        );
        for column in unregistered {
            report.warn(
                WarningKind::UnregisteredColumn,
                column,
                "no registry entry; excluded",
            );
        }
    }

    Ok(df.select(selected)?)
}

#[cfg(test)]
mod tests {
    use cohort_model::{DeclaredType, RegistryEntry};
    use polars::prelude::*;

    use super::*;

    fn entry(name: &str, keep: bool) -> RegistryEntry {
        RegistryEntry {
            column_name: name.to_string(),
            keep,
            numeric: true,
            categorical: false,
            data_type: DeclaredType::Numeric,
        }
    }

    fn keys() -> Vec<String> {
        vec!["RID".to_string(), "VISCODE".to_string()]
    }

    #[test]
    fn keeps_registry_order_after_keys() {
        let df = df! {
            "RID" => [1i64],
            "AGE" => [70.0f64],
            "VISCODE" => ["bl"],
            "MMSE" => [28i64],
            "EXAMDATE" => ["2010-01-01"],
            "NOTES" => ["x"],
        }
        .unwrap();
        let registry = ColumnRegistry::new(vec![
            entry("MMSE", true),
            entry("EXAMDATE", false),
            entry("AGE", true),
            entry("GONE", false),
        ]);
        let mut report = QualityReport::new();
        let filtered = filter_columns(&df, &registry, &keys(), &mut report).unwrap();
        assert_eq!(
            filtered.get_column_names_str(),
            vec!["RID", "VISCODE", "MMSE", "AGE"]
        );
        assert_eq!(report.warning_count(WarningKind::UnregisteredColumn), 1);
        assert_eq!(report.warnings[0].column, "NOTES");
    }

    #[test]
    fn kept_column_absent_from_table_is_fatal() {
        let df = df! { "RID" => [1i64], "VISCODE" => ["bl"] }.unwrap();
        let registry = ColumnRegistry::new(vec![entry("CDRSB", true)]);
        let err = filter_columns(&df, &registry, &keys(), &mut QualityReport::new()).unwrap_err();
        assert!(matches!(err, TransformError::UnknownColumn { column } if column == "CDRSB"));
    }

    #[test]
    fn flag_conflict_is_reported() {
        let df = df! { "RID" => [1i64], "VISCODE" => ["bl"], "APOE4" => [1i64] }.unwrap();
        let mut conflicted = entry("APOE4", true);
        conflicted.categorical = true;
        let registry = ColumnRegistry::new(vec![conflicted]);
        let mut report = QualityReport::new();
        filter_columns(&df, &registry, &keys(), &mut report).unwrap();
        assert_eq!(report.warning_count(WarningKind::FlagConflict), 1);
    }
}
