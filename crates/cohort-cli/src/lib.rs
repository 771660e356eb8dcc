//! Library components of the `cohort-prep` command-line runner.

pub mod logging;
pub mod pipeline;
