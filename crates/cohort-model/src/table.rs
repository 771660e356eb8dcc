//! Keyed table type.

use polars::prelude::DataFrame;

/// A loaded table together with the key columns declared unique for it.
///
/// The key is a declaration, not an index: the data keeps its key columns as
/// ordinary columns so they can be written out unchanged.
#[derive(Debug, Clone)]
pub struct KeyedTable {
    /// Name used in logs and error messages (source name or file stem).
    pub name: String,
    /// Columns whose combined values identify a row.
    pub key: Vec<String>,
    /// The table contents.
    pub data: DataFrame,
}

impl KeyedTable {
    pub fn new(name: impl Into<String>, key: Vec<String>, data: DataFrame) -> Self {
        Self {
            name: name.into(),
            key,
            data,
        }
    }

    /// Returns the number of rows.
    pub fn height(&self) -> usize {
        self.data.height()
    }

    /// Returns true if `column` is one of the key columns.
    pub fn is_key(&self, column: &str) -> bool {
        self.key.iter().any(|k| k == column)
    }

    /// Returns the non-key column names in table order.
    pub fn value_columns(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| !self.is_key(name))
            .collect()
    }
}
