//! Auxiliary source declarations.
//!
//! A source is any table joined onto the primary table. Each one declares how
//! it is keyed, how multiple records per subject are reduced to one, and which
//! of its columns survive into the joined table.

use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::KeyColumns;

/// Key shared between a source and the primary table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKey {
    /// Joined on the subject identifier alone.
    #[default]
    Subject,
    /// Joined on (subject identifier, visit code).
    SubjectVisit,
}

impl JoinKey {
    /// Returns the concrete key column names for this join.
    pub fn columns(self, keys: &KeyColumns) -> Vec<String> {
        match self {
            Self::Subject => vec![keys.subject.clone()],
            Self::SubjectVisit => vec![keys.subject.clone(), keys.visit.clone()],
        }
    }
}

/// How a source is reduced to at most one row per join key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// The source is already unique on its join key; verified at load time.
    #[default]
    Unique,
    /// Keep the row with the greatest timestamp per subject.
    LatestBy { timestamp: String },
    /// Keep rows whose `field` equals `value`; at most one may remain per subject.
    Matching { field: String, value: String },
}

impl SelectionPolicy {
    pub fn label(&self) -> String {
        match self {
            Self::Unique => "unique".to_string(),
            Self::LatestBy { timestamp } => format!("latest by {timestamp}"),
            Self::Matching { field, value } => format!("{field} == {value}"),
        }
    }
}

/// Half-open positional window over a source's non-key columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    /// Clamps the window to `len` columns.
    ///
    /// # Examples
    ///
    /// ```
    /// use cohort_model::ColumnRange;
    ///
    /// let range = ColumnRange { start: 5, end: 20 };
    /// assert_eq!(range.window(30), 5..20);
    /// assert_eq!(range.window(8), 5..8);
    /// assert_eq!(range.window(3), 3..3);
    /// ```
    pub fn window(self, len: usize) -> Range<usize> {
        let end = self.end.min(len);
        let start = self.start.min(end);
        start..end
    }
}

/// Declaration of one auxiliary source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Short name used in logs, reports and error messages.
    pub name: String,
    /// CSV file holding the source.
    pub path: PathBuf,
    #[serde(default)]
    pub join: JoinKey,
    #[serde(default)]
    pub selection: SelectionPolicy,
    /// Named non-key columns to retain, in this order.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// Positional window of non-key columns to retain.
    #[serde(default)]
    pub column_range: Option<ColumnRange>,
    /// Prefix applied to every retained non-key column.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl SourceSpec {
    /// Key columns shared with the primary table.
    pub fn join_columns(&self, keys: &KeyColumns) -> Vec<String> {
        self.join.columns(keys)
    }

    /// Key verified as unique when the raw file is loaded.
    ///
    /// Only sources declared unique are checked before selection; the other
    /// policies legitimately hold several rows per subject.
    pub fn load_key(&self, keys: &KeyColumns) -> Option<Vec<String>> {
        match self.selection {
            SelectionPolicy::Unique => Some(self.join_columns(keys)),
            SelectionPolicy::LatestBy { .. } | SelectionPolicy::Matching { .. } => None,
        }
    }

    /// Final name of a retained source column after prefixing.
    pub fn output_name(&self, column: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{column}"),
            None => column.to_string(),
        }
    }
}
