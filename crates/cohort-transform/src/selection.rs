//! Record selection for auxiliary sources.
//!
//! Reduces a source table to at most one row per join key and projects it to
//! the declared columns. Selection is applied to the raw table as loaded and
//! produces a new table; re-selecting an already selected table is a no-op.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use tracing::debug;

use cohort_common::{column_texts, is_numeric_dtype, parse_f64, row_keys};
use cohort_model::{KeyColumns, KeyedTable, SelectionPolicy, SourceSpec};

use crate::error::{Result, TransformError};

/// A source reduced to one row per join key.
#[derive(Debug, Clone)]
pub struct SelectedSource {
    pub table: KeyedTable,
    pub input_rows: usize,
    /// Rows dropped because a join key part was missing.
    pub missing_key_rows: usize,
}

/// Applies a source's selection policy and column projection.
pub fn select_records(
    data: &DataFrame,
    spec: &SourceSpec,
    keys: &KeyColumns,
) -> Result<SelectedSource> {
    let join = spec.join_columns(keys);
    for column in &join {
        if data.column(column).is_err() {
            return Err(TransformError::MissingKeyColumn {
                table: format!("source {}", spec.name),
                column: column.clone(),
            });
        }
    }

    let row_key = row_keys(data, &join)?;
    let missing_key_rows = row_key.iter().filter(|k| k.is_none()).count();

    let indices = match &spec.selection {
        SelectionPolicy::Unique => complete_rows(&row_key),
        SelectionPolicy::LatestBy { timestamp } => {
            let column = source_column(data, spec, timestamp)?;
            latest_rows(&row_key, &timestamp_keys(column)?)
        }
        SelectionPolicy::Matching { field, value } => {
            let column = source_column(data, spec, field)?;
            let matching = matching_rows(&row_key, &column_texts(column)?, value);
            ensure_unique(spec, &join, &row_key, &matching)?;
            matching
        }
    };

    let taken = take_rows(data, &indices)?;
    let projected = project_columns(&taken, spec, &join)?;
    debug!(
        source = %spec.name,
        policy = %spec.selection.label(),
        input_rows = data.height(),
        selected_rows = projected.height(),
        missing_key_rows,
        "records selected"
    );

    Ok(SelectedSource {
        table: KeyedTable::new(spec.name.clone(), join, projected),
        input_rows: data.height(),
        missing_key_rows,
    })
}

fn source_column<'a>(data: &'a DataFrame, spec: &SourceSpec, name: &str) -> Result<&'a Column> {
    data.column(name)
        .map_err(|_| TransformError::MissingSourceColumn {
            table: spec.name.clone(),
            column: name.to_string(),
        })
}

fn complete_rows(row_key: &[Option<String>]) -> Vec<usize> {
    row_key
        .iter()
        .enumerate()
        .filter_map(|(idx, key)| key.as_ref().map(|_| idx))
        .collect()
}

/// Orderable form of a timestamp cell.
///
/// Variant order is the ranking across kinds: a missing value ranks below
/// anything present.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum Stamp {
    Missing,
    Text(String),
    Time(NaiveDateTime),
    Number(f64),
}

fn parse_stamp(value: &str) -> Stamp {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Stamp::Missing;
    }
    const DATETIME_FORMATS: [&str; 7] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Stamp::Time(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Stamp::Time(d.and_time(NaiveTime::MIN));
        }
    }
    match parse_f64(trimmed) {
        Some(number) => Stamp::Number(number),
        None => Stamp::Text(trimmed.to_string()),
    }
}

fn timestamp_keys(column: &Column) -> Result<Vec<Stamp>> {
    if is_numeric_dtype(column.dtype()) {
        let cast = column.cast(&DataType::Float64)?;
        let values = cast.as_materialized_series().f64()?;
        return Ok(values
            .into_iter()
            .map(|v| v.map_or(Stamp::Missing, Stamp::Number))
            .collect());
    }
    Ok(column_texts(column)?
        .into_iter()
        .map(|v| v.as_deref().map_or(Stamp::Missing, parse_stamp))
        .collect())
}

/// Keeps the row with the greatest timestamp per key.
///
/// Only a strictly greater timestamp replaces the current pick, so equal
/// timestamps keep the earliest row. Output follows first appearance of each key.
fn latest_rows(row_key: &[Option<String>], stamps: &[Stamp]) -> Vec<usize> {
    let mut order: Vec<&str> = Vec::new();
    let mut best: HashMap<&str, usize> = HashMap::new();
    for (idx, key) in row_key.iter().enumerate() {
        let Some(key) = key.as_deref() else {
            continue;
        };
        match best.get_mut(key) {
            Some(current) => {
                if stamps[idx] > stamps[*current] {
                    *current = idx;
                }
            }
            None => {
                order.push(key);
                best.insert(key, idx);
            }
        }
    }
    order.iter().map(|key| best[key]).collect()
}

fn matching_rows(row_key: &[Option<String>], field: &[Option<String>], value: &str) -> Vec<usize> {
    let wanted = value.trim();
    row_key
        .iter()
        .zip(field)
        .enumerate()
        .filter(|(_, (key, cell))| {
            key.is_some() && cell.as_deref().map(str::trim) == Some(wanted)
        })
        .map(|(idx, _)| idx)
        .collect()
}

fn ensure_unique(
    spec: &SourceSpec,
    join: &[String],
    row_key: &[Option<String>],
    indices: &[usize],
) -> Result<()> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &idx in indices {
        if let Some(key) = row_key[idx].as_deref() {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    let duplicate = indices
        .iter()
        .filter_map(|&idx| row_key[idx].as_deref())
        .find(|key| counts[key] > 1);
    match duplicate {
        Some(key) => Err(TransformError::DuplicateKey {
            table: format!("source {}", spec.name),
            key: describe_key(join, key),
            count: counts[key],
        }),
        None => Ok(()),
    }
}

pub(crate) fn describe_key(join: &[String], key: &str) -> String {
    let parts: Vec<String> = join
        .iter()
        .zip(key.split(cohort_common::KEY_SEPARATOR))
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    format!("({})", parts.join(", "))
}

pub(crate) fn take_rows(data: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    if indices.len() == data.height() && indices.iter().enumerate().all(|(i, &idx)| i == idx) {
        return Ok(data.clone());
    }
    let idx = IdxCa::from_vec(
        "row".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(data.take(&idx)?)
}

/// Restricts a selected table to its join columns plus the declared value
/// columns, then applies the source prefix.
fn project_columns(data: &DataFrame, spec: &SourceSpec, join: &[String]) -> Result<DataFrame> {
    let value_columns: Vec<String> = data
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !join.contains(name))
        .collect();

    let chosen: Vec<String> = if let Some(columns) = &spec.columns {
        for column in columns {
            if data.column(column).is_err() {
                return Err(TransformError::MissingSourceColumn {
                    table: spec.name.clone(),
                    column: column.clone(),
                });
            }
        }
        columns
            .iter()
            .filter(|c| !join.contains(c))
            .cloned()
            .collect()
    } else if let Some(range) = spec.column_range {
        if range.start > range.end {
            return Err(TransformError::InvalidColumnRange {
                table: spec.name.clone(),
                start: range.start,
                end: range.end,
            });
        }
        value_columns[range.window(value_columns.len())].to_vec()
    } else {
        value_columns
    };

    let mut projected = data.select(join.iter().chain(chosen.iter()).map(String::as_str))?;
    if spec.prefix.is_some() {
        for column in &chosen {
            projected.rename(column, spec.output_name(column).into())?;
        }
    }
    Ok(projected)
}
