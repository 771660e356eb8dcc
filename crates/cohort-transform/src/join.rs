//! Left join of selected sources onto the primary table.

use std::collections::HashMap;

use polars::prelude::*;

use cohort_common::row_keys;
use cohort_model::KeyedTable;

use crate::error::{Result, TransformError};
use crate::selection::describe_key;

/// Row-level outcome of one left join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub columns_added: usize,
}

/// Left-joins `source` onto `base` on the source's key columns.
///
/// The result has exactly the rows of `base`, in the same order, with the
/// source's value columns appended. Unmatched rows get missing values. A
/// source column whose name already exists in `base` is an error, as is a
/// source key that is not unique.
pub fn left_join(base: &DataFrame, source: &KeyedTable) -> Result<(DataFrame, JoinStats)> {
    let on = &source.key;
    for column in on {
        if base.column(column).is_err() {
            return Err(TransformError::MissingKeyColumn {
                table: "joined table".to_string(),
                column: column.clone(),
            });
        }
        if source.data.column(column).is_err() {
            return Err(TransformError::MissingKeyColumn {
                table: format!("source {}", source.name),
                column: column.clone(),
            });
        }
    }

    let value_columns = source.value_columns();
    if let Some(column) = value_columns.iter().find(|c| base.column(c).is_ok()) {
        return Err(TransformError::ColumnCollision {
            column: column.clone(),
            origin: format!("source {}", source.name),
        });
    }

    let lookup = source_lookup(source)?;
    let base_keys = row_keys(base, on)?;
    let mut matched_rows = 0;
    let positions = base_keys.iter().map(|key| {
        let hit = key.as_deref().and_then(|k| lookup.get(k)).copied();
        if hit.is_some() {
            matched_rows += 1;
        }
        hit
    });
    let idx = IdxCa::from_iter_options("row".into(), positions);

    let appended: Vec<Column> = if matched_rows == 0 {
        value_columns
            .iter()
            .map(|name| {
                let dtype = source.data.column(name)?.dtype().clone();
                Ok(Column::full_null(name.as_str().into(), base.height(), &dtype))
            })
            .collect::<Result<_>>()?
    } else {
        source
            .data
            .select(value_columns.iter().map(String::as_str))?
            .take(&idx)?
            .get_columns()
            .to_vec()
    };
    let joined = base.hstack(&appended)?;
    debug_assert_eq!(joined.height(), base.height());

    Ok((
        joined,
        JoinStats {
            matched_rows,
            unmatched_rows: base.height() - matched_rows,
            columns_added: value_columns.len(),
        },
    ))
}

fn source_lookup(source: &KeyedTable) -> Result<HashMap<String, IdxSize>> {
    let keys = row_keys(&source.data, &source.key)?;
    let mut lookup = HashMap::with_capacity(keys.len());
    for (row, key) in keys.into_iter().enumerate() {
        let Some(key) = key else {
            continue;
        };
        if lookup.insert(key.clone(), row as IdxSize).is_some() {
            let count = row_keys(&source.data, &source.key)?
                .iter()
                .filter(|k| k.as_deref() == Some(key.as_str()))
                .count();
            return Err(TransformError::DuplicateKey {
                table: format!("source {}", source.name),
                key: describe_key(&source.key, &key),
                count,
            });
        }
    }
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> DataFrame {
        df! {
            "RID" => [1i64, 2, 3, 1],
            "VISCODE" => ["bl", "bl", "bl", "m12"],
            "AGE" => [70.1f64, 65.0, 80.2, 71.1],
        }
        .unwrap()
    }

    #[test]
    fn preserves_rows_and_fills_unmatched_with_missing() {
        let demo = KeyedTable::new(
            "demographics",
            vec!["RID".to_string()],
            df! { "RID" => [3i64, 1], "PTHAND" => [2i64, 1] }.unwrap(),
        );
        let (joined, stats) = left_join(&primary(), &demo).unwrap();
        assert_eq!(joined.height(), 4);
        let hand: Vec<Option<i64>> = joined
            .column("PTHAND")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(hand, vec![Some(1), None, Some(2), Some(1)]);
        assert_eq!(stats.matched_rows, 3);
        assert_eq!(stats.unmatched_rows, 1);
        assert_eq!(stats.columns_added, 1);
    }

    #[test]
    fn joins_on_subject_and_visit() {
        let scores = KeyedTable::new(
            "adas",
            vec!["RID".to_string(), "VISCODE".to_string()],
            df! {
                "RID" => [1i64, 1],
                "VISCODE" => ["m12", "bl"],
                "ADAS_Q1" => [4i64, 2],
            }
            .unwrap(),
        );
        let (joined, _) = left_join(&primary(), &scores).unwrap();
        let q1: Vec<Option<i64>> = joined
            .column("ADAS_Q1")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(q1, vec![Some(2), None, None, Some(4)]);
    }

    #[test]
    fn text_and_integer_keys_match() {
        let genes = KeyedTable::new(
            "tomm40",
            vec!["RID".to_string()],
            df! { "RID" => ["2"], "TOMM40_A1" => ["S"] }.unwrap(),
        );
        let (_, stats) = left_join(&primary(), &genes).unwrap();
        assert_eq!(stats.matched_rows, 1);
    }

    #[test]
    fn name_collision_is_fatal() {
        let clash = KeyedTable::new(
            "clash",
            vec!["RID".to_string()],
            df! { "RID" => [1i64], "AGE" => [1.0f64] }.unwrap(),
        );
        let err = left_join(&primary(), &clash).unwrap_err();
        assert!(matches!(err, TransformError::ColumnCollision { .. }));
    }

    #[test]
    fn empty_source_contributes_all_missing() {
        let empty = KeyedTable::new(
            "empty",
            vec!["RID".to_string()],
            df! { "RID" => Vec::<i64>::new(), "X" => Vec::<f64>::new() }.unwrap(),
        );
        let (joined, stats) = left_join(&primary(), &empty).unwrap();
        assert_eq!(joined.height(), 4);
        assert_eq!(joined.column("X").unwrap().null_count(), 4);
        assert_eq!(stats.matched_rows, 0);
    }
}
