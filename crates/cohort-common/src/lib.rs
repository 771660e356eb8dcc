//! Shared utilities for the cohort feature-preparation crates.

mod values;

pub use values::{
    KEY_SEPARATOR, any_to_text, column_f64_values, column_texts, format_numeric,
    is_numeric_dtype, is_blank, parse_f64, row_keys,
};
