//! CLI argument definitions for `cohort-prep`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cohort-prep",
    version,
    about = "Assemble, filter and encode a patient-level feature table",
    long_about = "Assemble a patient-level feature table from a primary longitudinal table\n\
                  and auxiliary sources, filter it with a column registry, normalize numeric\n\
                  columns and one-hot encode categoricals.\n\n\
                  Writes an unencoded snapshot table and a fully encoded table."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline described by a config file.
    Run(RunArgs),

    /// Show the resolved role of every entry in a column registry.
    Registry(RegistryArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Pipeline config file (TOML).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Write all outputs into this directory instead of the configured paths.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of most frequent levels kept per text categorical.
    #[arg(long = "max-levels", value_name = "N")]
    pub max_levels: Option<usize>,

    /// Skip writing the JSON quality report.
    #[arg(long = "no-report")]
    pub no_report: bool,

    /// Run every stage and print the summary without writing any file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct RegistryArgs {
    /// Column registry file (CSV).
    #[arg(value_name = "REGISTRY")]
    pub path: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
