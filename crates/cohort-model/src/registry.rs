//! Column registry: which columns to keep and how to treat them.
//!
//! Each registry row carries a `keep` flag, a `numeric` flag, a `categorical`
//! flag and the declared source type. The flags resolve to exactly one
//! [`ColumnRole`], which the transform crate uses to pick a column handler.

use serde::{Deserialize, Serialize};

/// Declared storage type of a source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    /// Stored as free text (`object`, `string`, `str`, `text`).
    Text,
    /// Stored as numbers (`float64`, `int64`, ...).
    Numeric,
}

impl DeclaredType {
    /// Resolves a declared type label from the registry file.
    ///
    /// Text labels are matched case-insensitively; anything else is numeric.
    ///
    /// # Examples
    ///
    /// ```
    /// use cohort_model::DeclaredType;
    ///
    /// assert_eq!(DeclaredType::from_label("object"), DeclaredType::Text);
    /// assert_eq!(DeclaredType::from_label("float64"), DeclaredType::Numeric);
    /// ```
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "object" | "string" | "str" | "text" | "category" => Self::Text,
            _ => Self::Numeric,
        }
    }
}

/// How a kept column is handled by the normalizer and the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Carried through unchanged.
    Passthrough,
    /// Numeric column stored as numbers.
    Numeric,
    /// Numeric column stored as text; coerced cell by cell.
    NumericFromText,
    /// Categorical column stored as text; cleaned, bucketed, then expanded.
    CategoricalText,
    /// Categorical column stored as numeric codes; downcast, then expanded.
    CategoricalCoded,
}

impl ColumnRole {
    pub fn is_categorical(self) -> bool {
        matches!(self, Self::CategoricalText | Self::CategoricalCoded)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Numeric | Self::NumericFromText)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Numeric => "numeric",
            Self::NumericFromText => "numeric (from text)",
            Self::CategoricalText => "categorical (text)",
            Self::CategoricalCoded => "categorical (coded)",
        }
    }
}

/// One row of the column registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub column_name: String,
    pub keep: bool,
    pub numeric: bool,
    pub categorical: bool,
    pub data_type: DeclaredType,
}

impl RegistryEntry {
    /// Resolves the entry's flags to a single role.
    ///
    /// The categorical flag wins when both flags are set; callers report that
    /// case through [`RegistryEntry::has_flag_conflict`].
    pub fn role(&self) -> ColumnRole {
        match (self.categorical, self.numeric, self.data_type) {
            (true, _, DeclaredType::Text) => ColumnRole::CategoricalText,
            (true, _, DeclaredType::Numeric) => ColumnRole::CategoricalCoded,
            (false, true, DeclaredType::Text) => ColumnRole::NumericFromText,
            (false, true, DeclaredType::Numeric) => ColumnRole::Numeric,
            (false, false, _) => ColumnRole::Passthrough,
        }
    }

    /// Returns true when the entry is flagged both numeric and categorical.
    pub fn has_flag_conflict(&self) -> bool {
        self.numeric && self.categorical
    }
}

/// The full column registry, in file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnRegistry {
    pub entries: Vec<RegistryEntry>,
}

impl ColumnRegistry {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by exact column name.
    pub fn get(&self, column: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|entry| entry.column_name == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Entries with the keep flag set, in registry order.
    pub fn kept(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(|entry| entry.keep)
    }

    /// Names of kept columns resolving to `role`, in registry order.
    pub fn kept_with_role(&self, role: ColumnRole) -> Vec<&str> {
        self.kept()
            .filter(|entry| entry.role() == role)
            .map(|entry| entry.column_name.as_str())
            .collect()
    }

    /// Role of a column, or passthrough when the registry does not list it.
    pub fn role_of(&self, column: &str) -> ColumnRole {
        self.get(column)
            .map_or(ColumnRole::Passthrough, RegistryEntry::role)
    }
}
