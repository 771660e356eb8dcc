//! Polars value helpers.
//!
//! Every stage of the pipeline needs the same handful of conversions: a cell
//! rendered as text (for keys, level labels and string cleaning) and a cell
//! rendered as a number (for coercion). Keeping them here guarantees that an
//! integer subject id `1` and a text subject id `"1"` hash to the same key in
//! every table.

use polars::prelude::*;

/// Separator placed between the parts of a composite row key.
///
/// The unit separator cannot appear in CSV text produced by the sources, so a
/// joined key is never ambiguous.
pub const KEY_SEPARATOR: char = '\u{1f}';

/// Converts a Polars `AnyValue` to text, returning `None` for `Null`.
///
/// Floating-point values are rendered without trailing zeros so that a coded
/// value read as `2.0` produces the same text as one read as `2`.
///
/// # Examples
///
/// ```
/// use polars::prelude::AnyValue;
/// use cohort_common::any_to_text;
///
/// assert_eq!(any_to_text(AnyValue::Null), None);
/// assert_eq!(any_to_text(AnyValue::Float64(2.0)), Some("2".to_string()));
/// assert_eq!(any_to_text(AnyValue::String("bl")), Some("bl".to_string()));
/// ```
pub fn any_to_text(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(v.to_string()),
        AnyValue::Int16(v) => Some(v.to_string()),
        AnyValue::Int32(v) => Some(v.to_string()),
        AnyValue::Int64(v) => Some(v.to_string()),
        AnyValue::UInt8(v) => Some(v.to_string()),
        AnyValue::UInt16(v) => Some(v.to_string()),
        AnyValue::UInt32(v) => Some(v.to_string()),
        AnyValue::UInt64(v) => Some(v.to_string()),
        AnyValue::Float32(v) => Some(format_numeric(f64::from(v))),
        AnyValue::Float64(v) => Some(format_numeric(v)),
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Boolean(b) => Some(b.to_string()),
        other => {
            let s = other.to_string();
            if s.starts_with('"') && s.ends_with('"') && s.len() >= 2 {
                Some(s[1..s.len() - 1].to_string())
            } else {
                Some(s)
            }
        }
    }
}

/// Formats a floating-point number without trailing zeros after the decimal point.
///
/// # Examples
///
/// ```
/// use cohort_common::format_numeric;
///
/// assert_eq!(format_numeric(2005.0), "2005");
/// assert_eq!(format_numeric(10.50), "10.5");
/// assert_eq!(format_numeric(-4.0), "-4");
/// ```
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.');
        if trimmed.is_empty() || trimmed == "-" {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        s
    }
}

/// Returns true when the value is empty or whitespace only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Parses a string as `f64`, returning `None` for blank or unparseable text.
///
/// Blank text never parses as zero.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Returns true for integer and floating-point dtypes.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Renders every cell of a column as text, keeping nulls as `None`.
///
/// Integers render without a decimal point and floats without trailing zeros,
/// which is the form used for keys, level labels and trailing-year extraction.
pub fn column_texts(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    match column.dtype() {
        DataType::String => {
            let ca = column.str()?;
            Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = column.cast(&DataType::Float64)?;
            let ca = cast.as_materialized_series().f64()?;
            Ok(ca.into_iter().map(|v| v.map(format_numeric)).collect())
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let cast = column.cast(&DataType::Int64)?;
            let ca = cast.as_materialized_series().i64()?;
            Ok(ca.into_iter().map(|v| v.map(|n| n.to_string())).collect())
        }
        _ => {
            let series = column.as_materialized_series();
            let mut values = Vec::with_capacity(series.len());
            for idx in 0..series.len() {
                values.push(any_to_text(series.get(idx)?));
            }
            Ok(values)
        }
    }
}

/// Reads a column as `f64` values.
///
/// Numeric columns are cast directly; text columns are parsed cell by cell,
/// so an unparseable or blank cell becomes `None`.
pub fn column_f64_values(column: &Column) -> PolarsResult<Vec<Option<f64>>> {
    if is_numeric_dtype(column.dtype()) {
        let cast = column.cast(&DataType::Float64)?;
        let ca = cast.as_materialized_series().f64()?;
        return Ok(ca.into_iter().collect());
    }
    Ok(column_texts(column)?
        .into_iter()
        .map(|v| v.as_deref().and_then(parse_f64))
        .collect())
}

/// Builds one key per row from the named columns.
///
/// A row whose key has any null (or blank) part yields `None`; such rows can
/// never match another table.
pub fn row_keys(df: &DataFrame, columns: &[String]) -> PolarsResult<Vec<Option<String>>> {
    let parts: Vec<Vec<Option<String>>> = columns
        .iter()
        .map(|name| column_texts(df.column(name)?))
        .collect::<PolarsResult<_>>()?;

    let mut keys = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let mut key = String::new();
        let mut complete = true;
        for (position, values) in parts.iter().enumerate() {
            match values[row].as_deref().map(str::trim) {
                Some(part) if !part.is_empty() => {
                    if position > 0 {
                        key.push(KEY_SEPARATOR);
                    }
                    key.push_str(part);
                }
                _ => {
                    complete = false;
                    break;
                }
            }
        }
        keys.push(complete.then_some(key));
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_to_text_integers_and_floats() {
        assert_eq!(any_to_text(AnyValue::Int64(-4)), Some("-4".to_string()));
        assert_eq!(any_to_text(AnyValue::Float64(-4.0)), Some("-4".to_string()));
        assert_eq!(any_to_text(AnyValue::Float64(1.25)), Some("1.25".to_string()));
    }

    #[test]
    fn test_format_numeric_keeps_integer_zeros() {
        assert_eq!(format_numeric(40.0), "40");
        assert_eq!(format_numeric(0.0), "0");
        assert_eq!(format_numeric(100.5), "100.5");
    }

    #[test]
    fn test_parse_f64_blank_is_not_zero() {
        assert_eq!(parse_f64(""), None);
        assert_eq!(parse_f64("   "), None);
        assert_eq!(parse_f64(" 10.5 "), Some(10.5));
        assert_eq!(parse_f64("<10.5"), None);
    }

    #[test]
    fn test_column_texts_mixed_dtypes() {
        let ints = Column::new("a".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(
            column_texts(&ints).unwrap(),
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
        let floats = Column::new("b".into(), &[2.0f64, 2.5]);
        assert_eq!(
            column_texts(&floats).unwrap(),
            vec![Some("2".to_string()), Some("2.5".to_string())]
        );
    }

    #[test]
    fn test_row_keys_composite_and_null() {
        let df = DataFrame::new(vec![
            Column::new("RID".into(), &[Some(1i64), Some(2), None]),
            Column::new("VISCODE".into(), &["bl", "m06", "bl"]),
        ])
        .unwrap();
        let keys = row_keys(&df, &["RID".to_string(), "VISCODE".to_string()]).unwrap();
        assert_eq!(keys[0], Some(format!("1{KEY_SEPARATOR}bl")));
        assert_eq!(keys[1], Some(format!("2{KEY_SEPARATOR}m06")));
        assert_eq!(keys[2], None);
    }

    #[test]
    fn test_row_keys_int_and_text_agree() {
        let ints = DataFrame::new(vec![Column::new("RID".into(), &[7i64])]).unwrap();
        let texts = DataFrame::new(vec![Column::new("RID".into(), &["7"])]).unwrap();
        let key = ["RID".to_string()];
        assert_eq!(row_keys(&ints, &key).unwrap(), row_keys(&texts, &key).unwrap());
    }
}
