//! Transform stages for the cohort feature-preparation pipeline.
//!
//! - **selection**: one record per join key (unique, latest by timestamp, or matching a value)
//! - **join**: row-preserving left join of selected sources onto the primary table
//! - **filter**: registry-driven column selection
//! - **numeric**: blank handling, censor-mark stripping and numeric coercion
//! - **derived**: the trailing-year derivation shared by both output tables
//! - **encode**: level cleaning, rare-level collapsing and indicator expansion
//! - **handlers**: per-role column handlers looked up by the stages above
//! - **pipeline**: the stage sequence for a full run

pub mod derived;
pub mod encode;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod join;
pub mod numeric;
pub mod pipeline;
pub mod selection;

pub use derived::{DerivedYear, apply_trailing_year, trailing_year};
pub use encode::{
    Collapsed, Expansion, LevelOrder, clean_level, collapse_rare, downcast_integer,
    encode_categoricals, expand_levels,
};
pub use error::{Result, TransformError};
pub use filter::filter_columns;
pub use handlers::{ColumnHandler, Encoded, HandlerRegistry, default_handlers};
pub use join::{JoinStats, left_join};
pub use numeric::{
    blanks_to_missing, coerce_numeric, normalize_columns, strip_censor_mark, strip_censor_marks,
};
pub use pipeline::{
    PrepInputs, PrepOutput, PrepSettings, SourceInput, Stage, StageEvent, assemble, run, run_with,
};
pub use selection::{SelectedSource, select_records};
