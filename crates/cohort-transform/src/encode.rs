//! Categorical encoding.
//!
//! Text categoricals are cleaned, their rare levels collapsed into a bucket
//! token, and then expanded into `u8` indicator columns. Numeric-coded
//! categoricals skip the cleaning and bucketing and are downcast to the
//! smallest integer type that holds their codes before the same expansion.
//!
//! Expansion drops one reference level per column: the first level in sort
//! order. Text levels sort lexically and coded levels numerically, so the
//! output schema depends only on the set of levels, not on row order.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use polars::prelude::*;
use tracing::{debug, warn};

use cohort_common::{column_f64_values, column_texts, is_numeric_dtype, parse_f64};
use cohort_model::{
    ColumnRegistry, ColumnRole, EncodingOptions, KeyColumns, QualityReport, WarningKind,
};

use crate::error::{Result, TransformError};
use crate::handlers::{Encoded, HandlerRegistry};

/// Cleans one raw categorical value.
///
/// Lowercases, replaces spaces and slashes with underscores and removes
/// periods. The unknown sentinel maps to the unknown token when it is the
/// whole value. Values that clean to nothing become missing.
///
/// # Examples
///
/// ```
/// use cohort_model::EncodingOptions;
/// use cohort_transform::clean_level;
///
/// let options = EncodingOptions::default();
/// assert_eq!(clean_level("Some College", &options).as_deref(), Some("some_college"));
/// assert_eq!(clean_level("Yes/No", &options).as_deref(), Some("yes_no"));
/// assert_eq!(clean_level("Ph.D.", &options).as_deref(), Some("phd"));
/// assert_eq!(clean_level("-4", &options).as_deref(), Some("unknown"));
/// assert_eq!(clean_level("-45", &options).as_deref(), Some("-45"));
/// ```
pub fn clean_level(raw: &str, options: &EncodingOptions) -> Option<String> {
    let trimmed = raw.trim();
    if is_unknown_sentinel(trimmed, &options.unknown_sentinel) {
        return Some(options.unknown_token.clone());
    }
    let cleaned: String = trimmed
        .to_lowercase()
        .chars()
        .filter(|&c| c != '.')
        .map(|c| if c == ' ' || c == '/' { '_' } else { c })
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn is_unknown_sentinel(value: &str, sentinel: &str) -> bool {
    if value == sentinel {
        return true;
    }
    match (parse_f64(value), parse_f64(sentinel)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Values after rare-level collapsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collapsed {
    pub values: Vec<Option<String>>,
    /// Retained levels, most frequent first.
    pub kept: Vec<String>,
    /// Number of values rewritten to the bucket token.
    pub bucketed: usize,
}

/// Keeps the `max_levels` most frequent levels and rewrites the rest to
/// `bucket_token`.
///
/// Levels rank by count, then by first appearance. The bucket token itself
/// never takes a slot, so collapsing an already collapsed column changes
/// nothing. Missing values stay missing.
pub fn collapse_rare(values: &[Option<String>], max_levels: usize, bucket_token: &str) -> Collapsed {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for value in values.iter().flatten() {
        if value == bucket_token {
            continue;
        }
        match position.get(value.as_str()) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                position.insert(value.as_str(), counts.len());
                counts.push((value.as_str(), 1));
            }
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(max_levels);
    let retained: HashSet<&str> = counts.iter().map(|(level, _)| *level).collect();

    let mut bucketed = 0;
    let collapsed = values
        .iter()
        .map(|value| {
            value.as_deref().map(|v| {
                if v == bucket_token || retained.contains(v) {
                    v.to_string()
                } else {
                    bucketed += 1;
                    bucket_token.to_string()
                }
            })
        })
        .collect();

    Collapsed {
        values: collapsed,
        kept: counts.iter().map(|(level, _)| (*level).to_string()).collect(),
        bucketed,
    }
}

/// Sort order used to pick the reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOrder {
    Lexical,
    Numeric,
}

/// Indicator columns for one categorical column.
#[derive(Debug)]
pub struct Expansion {
    /// Distinct non-missing levels, reference included.
    pub levels: usize,
    pub reference: Option<String>,
    pub columns: Vec<Column>,
}

/// Expands labels into `<name>_<level>` indicator columns.
///
/// One column per distinct level except the reference level. Each row has at
/// most one indicator set; a missing value sets none.
pub fn expand_levels(name: &str, values: &[Option<String>], order: LevelOrder) -> Expansion {
    let mut levels: Vec<&str> = values
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    match order {
        LevelOrder::Lexical => levels.sort_unstable(),
        LevelOrder::Numeric => levels.sort_by(|a, b| compare_numeric(a, b)),
    }

    let columns = levels
        .iter()
        .skip(1)
        .map(|level| {
            let flags: Vec<u8> = values
                .iter()
                .map(|v| u8::from(v.as_deref() == Some(*level)))
                .collect();
            Column::new(format!("{name}_{level}").into(), flags)
        })
        .collect();

    Expansion {
        levels: levels.len(),
        reference: levels.first().map(|level| (*level).to_string()),
        columns,
    }
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    match (parse_f64(a), parse_f64(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Casts a numeric-coded column to the smallest integer type holding its codes.
///
/// Columns with fractional codes stay `Float64`. Text cells that are not
/// numbers become missing; the second value counts them.
pub fn downcast_integer(column: &Column) -> Result<(Column, usize)> {
    let values = column_f64_values(column)?;
    let failures = if is_numeric_dtype(column.dtype()) {
        0
    } else {
        column_texts(column)?
            .iter()
            .zip(&values)
            .filter(|(text, value)| text.is_some() && value.is_none())
            .count()
    };
    let name = column.name().clone();

    let integral = values
        .iter()
        .flatten()
        .all(|v| v.is_finite() && v.fract() == 0.0);
    if !integral {
        return Ok((Series::new(name, values).into_column(), failures));
    }

    let codes: Vec<Option<i64>> = values.iter().map(|v| v.map(|x| x as i64)).collect();
    let min = codes.iter().flatten().min().copied().unwrap_or(0);
    let max = codes.iter().flatten().max().copied().unwrap_or(0);
    let series = Series::new(name, codes).cast(&smallest_integer_type(min, max))?;
    Ok((series.into_column(), failures))
}

fn smallest_integer_type(min: i64, max: i64) -> DataType {
    let fits = |lo: i64, hi: i64| min >= lo && max <= hi;
    if fits(i64::from(i8::MIN), i64::from(i8::MAX)) {
        DataType::Int8
    } else if fits(i64::from(i16::MIN), i64::from(i16::MAX)) {
        DataType::Int16
    } else if fits(i64::from(i32::MIN), i64::from(i32::MAX)) {
        DataType::Int32
    } else {
        DataType::Int64
    }
}

/// Encoding stage over a normalized table.
///
/// Text categoricals are encoded first, then coded ones, each in registry
/// order. Every encoded column is dropped and its indicators appended at the
/// end of the table. Key and non-categorical columns keep their positions;
/// key columns are never encoded, whatever their registry flags say.
pub fn encode_categoricals(
    df: &DataFrame,
    registry: &ColumnRegistry,
    keys: &KeyColumns,
    options: &EncodingOptions,
    handlers: &HandlerRegistry,
    report: &mut QualityReport,
) -> Result<DataFrame> {
    let mut out = df.clone();
    let categorical = registry
        .kept_with_role(ColumnRole::CategoricalText)
        .into_iter()
        .chain(registry.kept_with_role(ColumnRole::CategoricalCoded))
        .filter(|name| !keys.contains(name));

    for name in categorical {
        let Ok(column) = out.column(name) else {
            warn!(column = %name, "categorical column is not present, skipping");
            report.warn(
                WarningKind::MissingColumn,
                name,
                "categorical column not present after filtering",
            );
            continue;
        };
        let handler = handlers.get(registry.role_of(name));
        let Encoded::Expand(indicators) = handler.encode(column, options, report.column_mut(name))?
        else {
            continue;
        };

        if indicators.is_empty() && report.column(name).is_some_and(|q| q.levels == 0) {
            warn!(column = %name, "categorical column has no values, no indicators emitted");
            report.warn(
                WarningKind::EmptyCategorical,
                name,
                "no non-missing values; no indicator columns",
            );
        }

        out = out.drop(name)?;
        if let Some(clash) = indicators.iter().find(|c| out.column(c.name()).is_ok()) {
            return Err(TransformError::ColumnCollision {
                column: clash.name().to_string(),
                origin: format!("indicators of {name}"),
            });
        }
        out = out.hstack(&indicators)?;
        debug!(column = %name, indicators = indicators.len(), "column encoded");
    }

    Ok(out)
}
