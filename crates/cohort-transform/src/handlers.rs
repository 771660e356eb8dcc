//! Column handlers and their registry.
//!
//! Each [`ColumnRole`] resolved from the column registry maps to one
//! [`ColumnHandler`]. The normalization and encoding stages look a column's
//! handler up by role instead of branching on registry flags themselves.
//!
//! # Example
//!
//! ```ignore
//! use cohort_transform::handlers::default_handlers;
//!
//! let handler = default_handlers().get(entry.role());
//! if let Some(column) = handler.normalize(column, quality)? {
//!     frame.with_column(column)?;
//! }
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use polars::prelude::Column;

use cohort_model::{ColumnQuality, ColumnRole, EncodingOptions};

use crate::encode::{LevelOrder, clean_level, collapse_rare, downcast_integer, expand_levels};
use crate::error::Result;
use crate::numeric::coerce_numeric;

/// Result of encoding one column.
#[derive(Debug)]
pub enum Encoded {
    /// The column stays as it is.
    Keep,
    /// The column is replaced by these indicator columns.
    Expand(Vec<Column>),
}

/// Per-column processing for one registry role.
pub trait ColumnHandler: Send + Sync {
    /// The role this handler serves.
    fn role(&self) -> ColumnRole;

    /// Returns a human-readable description of the handler.
    fn description(&self) -> &'static str {
        "Column handler"
    }

    /// Normalization-stage transform.
    ///
    /// Returns `None` when the column is left unchanged.
    fn normalize(&self, _column: &Column, _quality: &mut ColumnQuality) -> Result<Option<Column>> {
        Ok(None)
    }

    /// Encoding-stage transform.
    fn encode(
        &self,
        _column: &Column,
        _options: &EncodingOptions,
        _quality: &mut ColumnQuality,
    ) -> Result<Encoded> {
        Ok(Encoded::Keep)
    }
}

/// Columns kept without any transformation.
pub struct PassthroughHandler;

impl ColumnHandler for PassthroughHandler {
    fn role(&self) -> ColumnRole {
        ColumnRole::Passthrough
    }

    fn description(&self) -> &'static str {
        "Kept as loaded"
    }
}

/// Numeric columns, whether the source stored them as numbers or as text.
pub struct NumericHandler {
    role: ColumnRole,
}

impl ColumnHandler for NumericHandler {
    fn role(&self) -> ColumnRole {
        self.role
    }

    fn description(&self) -> &'static str {
        "Coerced to a number; unparseable values become missing"
    }

    fn normalize(&self, column: &Column, quality: &mut ColumnQuality) -> Result<Option<Column>> {
        let (coerced, failures) = coerce_numeric(column)?;
        quality.coerced_to_missing += failures;
        Ok(Some(coerced))
    }
}

/// Text categoricals: cleaned, rare levels bucketed, expanded to indicators.
pub struct TextCategoricalHandler;

impl ColumnHandler for TextCategoricalHandler {
    fn role(&self) -> ColumnRole {
        ColumnRole::CategoricalText
    }

    fn description(&self) -> &'static str {
        "Cleaned, rare levels bucketed, one-hot encoded"
    }

    fn encode(
        &self,
        column: &Column,
        options: &EncodingOptions,
        quality: &mut ColumnQuality,
    ) -> Result<Encoded> {
        let raw = cohort_common::column_texts(column)?;
        let cleaned: Vec<Option<String>> = raw
            .iter()
            .map(|v| v.as_deref().and_then(|text| clean_level(text, options)))
            .collect();
        quality.coerced_to_missing += raw
            .iter()
            .zip(&cleaned)
            .filter(|(before, after)| before.is_some() && after.is_none())
            .count();

        let collapsed = collapse_rare(&cleaned, options.max_levels, &options.bucket_token);
        quality.bucketed += collapsed.bucketed;

        let expansion = expand_levels(column.name(), &collapsed.values, LevelOrder::Lexical);
        quality.levels = expansion.levels;
        quality.indicators = expansion.columns.len();
        Ok(Encoded::Expand(expansion.columns))
    }
}

/// Categoricals stored as numeric codes: downcast, then expanded to indicators.
pub struct CodedCategoricalHandler;

impl ColumnHandler for CodedCategoricalHandler {
    fn role(&self) -> ColumnRole {
        ColumnRole::CategoricalCoded
    }

    fn description(&self) -> &'static str {
        "Downcast to the smallest integer type, one-hot encoded"
    }

    fn encode(
        &self,
        column: &Column,
        _options: &EncodingOptions,
        quality: &mut ColumnQuality,
    ) -> Result<Encoded> {
        let (codes, failures) = downcast_integer(column)?;
        quality.coerced_to_missing += failures;
        let labels = cohort_common::column_texts(&codes)?;
        let expansion = expand_levels(column.name(), &labels, LevelOrder::Numeric);
        quality.levels = expansion.levels;
        quality.indicators = expansion.columns.len();
        Ok(Encoded::Expand(expansion.columns))
    }
}

/// Registry of column handlers indexed by role.
///
/// Roles without a registered handler fall back to the passthrough handler.
pub struct HandlerRegistry {
    handlers: HashMap<ColumnRole, Box<dyn ColumnHandler>>,
    fallback: Box<dyn ColumnHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry with the given fallback handler.
    pub fn new(fallback: Box<dyn ColumnHandler>) -> Self {
        Self {
            handlers: HashMap::new(),
            fallback,
        }
    }

    /// Registers a handler for its role, replacing any previous one.
    pub fn register(&mut self, handler: Box<dyn ColumnHandler>) {
        self.handlers.insert(handler.role(), handler);
    }

    pub fn get(&self, role: ColumnRole) -> &dyn ColumnHandler {
        self.handlers
            .get(&role)
            .map_or(self.fallback.as_ref(), |h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns the registered roles in role order.
    pub fn roles(&self) -> Vec<ColumnRole> {
        let mut roles: Vec<ColumnRole> = self.handlers.keys().copied().collect();
        roles.sort();
        roles
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        let mut registry = Self::new(Box::new(PassthroughHandler));
        registry.register(Box::new(PassthroughHandler));
        registry.register(Box::new(NumericHandler {
            role: ColumnRole::Numeric,
        }));
        registry.register(Box::new(NumericHandler {
            role: ColumnRole::NumericFromText,
        }));
        registry.register(Box::new(TextCategoricalHandler));
        registry.register(Box::new(CodedCategoricalHandler));
        registry
    }
}

static DEFAULT_HANDLERS: OnceLock<HandlerRegistry> = OnceLock::new();

/// Returns the shared handler registry covering every role.
pub fn default_handlers() -> &'static HandlerRegistry {
    DEFAULT_HANDLERS.get_or_init(HandlerRegistry::default)
}
