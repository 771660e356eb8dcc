//! Trailing-year derivation.
//!
//! Some year columns arrive as free text with the year at the end (for
//! example `"Retired 2005"`). Both output tables apply the same derivation
//! through [`apply_trailing_year`].

use polars::prelude::*;

use cohort_common::{column_texts, parse_f64};

use crate::error::Result;

/// Reads the last four characters of a value as a number.
///
/// # Examples
///
/// ```
/// use cohort_transform::trailing_year;
///
/// assert_eq!(trailing_year("Retired 2005"), Some(2005.0));
/// assert_eq!(trailing_year("1998"), Some(1998.0));
/// assert_eq!(trailing_year("n/a"), None);
/// ```
pub fn trailing_year(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(3)
        .map_or(0, |(idx, _)| idx);
    parse_f64(&trimmed[start..])
}

/// A table with the trailing-year column replaced.
#[derive(Debug, Clone)]
pub struct DerivedYear {
    pub frame: DataFrame,
    /// Present values whose last four characters were not a number.
    pub unparsed: usize,
}

/// Replaces `column` with its trailing-year value as `Float64`.
///
/// Returns `None` when the column is absent. Missing values stay missing.
pub fn apply_trailing_year(df: &DataFrame, column: &str) -> Result<Option<DerivedYear>> {
    let Ok(source) = df.column(column) else {
        return Ok(None);
    };
    let mut unparsed = 0;
    let years: Vec<Option<f64>> = column_texts(source)?
        .into_iter()
        .map(|value| {
            let year = trailing_year(&value?);
            if year.is_none() {
                unparsed += 1;
            }
            year
        })
        .collect();

    let mut frame = df.clone();
    frame.with_column(Series::new(column.into(), years))?;
    Ok(Some(DerivedYear { frame, unparsed }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_four_characters() {
        assert_eq!(trailing_year("12/2005"), Some(2005.0));
        assert_eq!(trailing_year("05"), Some(5.0));
        assert_eq!(trailing_year(""), None);
    }

    #[test]
    fn numeric_years_survive_float_storage() {
        let df = df! { "PTRTYR" => [Some(2005.0f64), None, Some(1999.0)] }.unwrap();
        let derived = apply_trailing_year(&df, "PTRTYR").unwrap().unwrap();
        let years: Vec<Option<f64>> = derived
            .frame
            .column("PTRTYR")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(years, vec![Some(2005.0), None, Some(1999.0)]);
        assert_eq!(derived.unparsed, 0);
    }

    #[test]
    fn absent_column_is_reported_as_none() {
        let df = df! { "AGE" => [70.0f64] }.unwrap();
        assert!(apply_trailing_year(&df, "PTRTYR").unwrap().is_none());
    }
}
