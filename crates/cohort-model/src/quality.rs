//! Data-quality report for a pipeline run.
//!
//! Per-value failures never abort a run. They are counted here instead, one
//! [`ColumnQuality`] per touched column, alongside per-source join statistics
//! and configuration warnings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Join statistics for one auxiliary source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub name: String,
    pub policy: String,
    /// Rows in the source file.
    pub input_rows: usize,
    /// Rows left after record selection.
    pub selected_rows: usize,
    /// Rows dropped because the subject identifier was missing.
    pub missing_subject_rows: usize,
    /// Primary rows that found a matching source row.
    pub matched_rows: usize,
    /// Primary rows left with missing source columns.
    pub unmatched_rows: usize,
    /// Columns appended to the joined table.
    pub columns_added: usize,
}

/// Per-column counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnQuality {
    /// Blank or whitespace-only text turned into missing.
    pub blanks_to_missing: usize,
    /// Values whose leading censoring mark was stripped.
    pub censor_marks_stripped: usize,
    /// Non-missing values that failed numeric coercion.
    pub coerced_to_missing: usize,
    /// Values rewritten to the rare-level bucket token.
    pub bucketed: usize,
    /// Distinct levels remaining after bucketing.
    pub levels: usize,
    /// Indicator columns emitted for this column.
    pub indicators: usize,
}

impl ColumnQuality {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A joined column has no registry entry; it is excluded.
    UnregisteredColumn,
    /// A registry entry sets both the numeric and the categorical flag.
    FlagConflict,
    /// A column named for special handling is absent from the table.
    MissingColumn,
    /// A categorical column has no non-missing values.
    EmptyCategorical,
}

/// A non-fatal configuration or data condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityWarning {
    pub kind: WarningKind,
    pub column: String,
    pub message: String,
}

/// Everything worth auditing about one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    pub sources: Vec<SourceSummary>,
    pub columns: BTreeMap<String, ColumnQuality>,
    pub warnings: Vec<QualityWarning>,
}

impl QualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutable counters for `column`, creating them if needed.
    pub fn column_mut(&mut self, column: &str) -> &mut ColumnQuality {
        self.columns.entry(column.to_string()).or_default()
    }

    pub fn column(&self, column: &str) -> Option<&ColumnQuality> {
        self.columns.get(column)
    }

    pub fn warn(&mut self, kind: WarningKind, column: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(QualityWarning {
            kind,
            column: column.into(),
            message: message.into(),
        });
    }

    pub fn warning_count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    /// Total values forced to missing by numeric coercion across all columns.
    pub fn total_coerced_to_missing(&self) -> usize {
        self.columns.values().map(|c| c.coerced_to_missing).sum()
    }

    /// Total values rewritten to the bucket token across all columns.
    pub fn total_bucketed(&self) -> usize {
        self.columns.values().map(|c| c.bucketed).sum()
    }

    /// Drops column entries that recorded nothing.
    pub fn prune(&mut self) {
        self.columns.retain(|_, quality| !quality.is_empty());
    }
}
