//! Numeric normalization.
//!
//! Runs after column filtering. Blank text becomes missing everywhere, censor
//! marks are stripped from the configured columns, and every numeric column
//! still stored as text is coerced to `Float64`. Values that do not parse
//! become missing and are counted, never raised.

use polars::prelude::*;
use tracing::{debug, warn};

use cohort_common::{column_texts, is_blank, is_numeric_dtype, parse_f64};
use cohort_model::{ColumnRegistry, KeyColumns, NormalizeOptions, QualityReport, WarningKind};

use crate::error::Result;
use crate::handlers::HandlerRegistry;

/// Leading symbols that mark a value as below or above a detection limit.
const CENSOR_MARKS: [char; 3] = ['<', '>', '='];

/// Replaces blank and whitespace-only text with missing, in every text column.
pub fn blanks_to_missing(df: &DataFrame, report: &mut QualityReport) -> Result<DataFrame> {
    let mut out = df.clone();
    for column in df.get_columns() {
        if column.dtype() != &DataType::String {
            continue;
        }
        let values = column.str()?;
        let blanks = values.into_iter().flatten().filter(|v| is_blank(v)).count();
        if blanks == 0 {
            continue;
        }
        let cleaned: Vec<Option<&str>> = values
            .into_iter()
            .map(|v| v.filter(|s| !is_blank(s)))
            .collect();
        out.with_column(Series::new(column.name().clone(), cleaned))?;
        report.column_mut(column.name()).blanks_to_missing += blanks;
    }
    Ok(out)
}

/// Removes leading censor marks (`<`, `>`, `=`) from a text value.
///
/// Returns the stripped value and whether anything was removed.
///
/// # Examples
///
/// ```
/// use cohort_transform::strip_censor_mark;
///
/// assert_eq!(strip_censor_mark("<10.5"), ("10.5", true));
/// assert_eq!(strip_censor_mark(">=1700"), ("1700", true));
/// assert_eq!(strip_censor_mark("231.4"), ("231.4", false));
/// ```
pub fn strip_censor_mark(value: &str) -> (&str, bool) {
    let trimmed = value.trim();
    let stripped = trimmed.trim_start_matches(CENSOR_MARKS).trim_start();
    (stripped, stripped.len() != trimmed.len())
}

/// Strips censor marks from every cell of a text column.
///
/// Numeric columns carry no marks and are returned as they are.
pub fn strip_censor_marks(column: &Column) -> Result<(Column, usize)> {
    if is_numeric_dtype(column.dtype()) {
        return Ok((column.clone(), 0));
    }
    let mut stripped_count = 0;
    let values: Vec<Option<String>> = column_texts(column)?
        .into_iter()
        .map(|v| {
            v.map(|text| {
                let (stripped, changed) = strip_censor_mark(&text);
                if changed {
                    stripped_count += 1;
                }
                stripped.to_string()
            })
        })
        .collect();
    Ok((
        Series::new(column.name().clone(), values).into_column(),
        stripped_count,
    ))
}

/// Coerces a column to `Float64`.
///
/// Numeric columns are returned unchanged. Text cells that do not parse as a
/// number become missing; the second value is how many did so.
pub fn coerce_numeric(column: &Column) -> Result<(Column, usize)> {
    if is_numeric_dtype(column.dtype()) {
        return Ok((column.clone(), 0));
    }
    let mut failures = 0;
    let values: Vec<Option<f64>> = column_texts(column)?
        .into_iter()
        .map(|v| {
            let text = v?;
            let parsed = parse_f64(&text);
            if parsed.is_none() && !is_blank(&text) {
                failures += 1;
            }
            parsed
        })
        .collect();
    Ok((
        Series::new(column.name().clone(), values).into_column(),
        failures,
    ))
}

/// Normalization stage over a filtered table.
///
/// Key columns only get blank handling; they are never stripped or coerced.
pub fn normalize_columns(
    df: &DataFrame,
    registry: &ColumnRegistry,
    keys: &KeyColumns,
    options: &NormalizeOptions,
    handlers: &HandlerRegistry,
    report: &mut QualityReport,
) -> Result<DataFrame> {
    let mut out = blanks_to_missing(df, report)?;

    for name in options.censored.iter().filter(|name| !keys.contains(name)) {
        let Ok(column) = out.column(name) else {
            warn!(column = %name, "censored column is not present, skipping");
            report.warn(
                WarningKind::MissingColumn,
                name,
                "censored column not present after filtering",
            );
            continue;
        };
        let (stripped, marks) = strip_censor_marks(column)?;
        let (coerced, failures) = coerce_numeric(&stripped)?;
        out.with_column(coerced)?;
        let quality = report.column_mut(name);
        quality.censor_marks_stripped += marks;
        quality.coerced_to_missing += failures;
    }

    for entry in registry.kept() {
        if keys.contains(&entry.column_name) || options.censored.contains(&entry.column_name) {
            continue;
        }
        let Ok(column) = out.column(&entry.column_name) else {
            continue;
        };
        let handler = handlers.get(entry.role());
        if let Some(normalized) = handler.normalize(column, report.column_mut(&entry.column_name))? {
            out.with_column(normalized)?;
        }
    }

    let coerced = report.total_coerced_to_missing();
    if coerced > 0 {
        warn!(values = coerced, "values could not be read as numbers and are now missing");
    }
    debug!(columns = out.width(), "numeric normalization complete");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_values(column: &Column) -> Vec<Option<f64>> {
        column
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn censored_value_normalizes_to_number() {
        let column = Column::new("ABETA".into(), &["<10.5", ">1700", "231.4"]);
        let (stripped, marks) = strip_censor_marks(&column).unwrap();
        let (coerced, failures) = coerce_numeric(&stripped).unwrap();
        assert_eq!(marks, 2);
        assert_eq!(failures, 0);
        assert_eq!(
            f64_values(&coerced),
            vec![Some(10.5), Some(1700.0), Some(231.4)]
        );
    }

    #[test]
    fn blank_never_coerces_to_zero() {
        let df = DataFrame::new(vec![Column::new(
            "MMSE".into(),
            &[Some("28"), Some(" "), Some(""), None],
        )])
        .unwrap();
        let mut report = QualityReport::new();
        let cleaned = blanks_to_missing(&df, &mut report).unwrap();
        let (coerced, failures) = coerce_numeric(cleaned.column("MMSE").unwrap()).unwrap();
        assert_eq!(f64_values(&coerced), vec![Some(28.0), None, None, None]);
        assert_eq!(failures, 0);
        assert_eq!(report.column("MMSE").unwrap().blanks_to_missing, 2);
    }

    #[test]
    fn unparseable_text_becomes_missing_and_is_counted() {
        let column = Column::new("CDRSB".into(), &["1.5", "n/a", "2"]);
        let (coerced, failures) = coerce_numeric(&column).unwrap();
        assert_eq!(f64_values(&coerced), vec![Some(1.5), None, Some(2.0)]);
        assert_eq!(failures, 1);
    }

    #[test]
    fn numeric_columns_pass_through() {
        let column = Column::new("AGE".into(), &[70i64, 80]);
        let (coerced, failures) = coerce_numeric(&column).unwrap();
        assert_eq!(coerced.dtype(), &DataType::Int64);
        assert_eq!(failures, 0);
    }
}
