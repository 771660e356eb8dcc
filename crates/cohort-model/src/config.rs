//! Pipeline configuration.
//!
//! The configuration is read from a TOML file by `cohort-ingest`; this module
//! only defines its shape and defaults. Paths are stored as written and are
//! resolved against the config file's directory by [`PipelineConfig::resolve_paths`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::source::SourceSpec;

/// Names of the subject and visit key columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColumns {
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_visit")]
    pub visit: String,
}

fn default_subject() -> String {
    "RID".to_string()
}

fn default_visit() -> String {
    "VISCODE".to_string()
}

impl Default for KeyColumns {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            visit: default_visit(),
        }
    }
}

impl KeyColumns {
    /// The primary table key: (subject, visit).
    pub fn primary(&self) -> Vec<String> {
        vec![self.subject.clone(), self.visit.clone()]
    }

    /// Whether `column` is the subject or the visit key.
    pub fn contains(&self, column: &str) -> bool {
        self.subject == column || self.visit == column
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimarySpec {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySpec {
    pub path: PathBuf,
}

/// Options for the numeric normalizer and the derived trailing-year column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Columns whose values may carry a leading `<` / `>` censoring mark.
    #[serde(default)]
    pub censored: Vec<String>,
    /// Column whose last four characters are re-read as a year.
    #[serde(default)]
    pub trailing_year: Option<String>,
}

/// Categorical encoding policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingOptions {
    /// Number of most frequent levels kept per text column.
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
    /// Token substituted for every level outside the kept set.
    #[serde(default = "default_bucket_token")]
    pub bucket_token: String,
    /// Cleaned value standing for "unknown" in the raw data.
    #[serde(default = "default_unknown_sentinel")]
    pub unknown_sentinel: String,
    /// Token the unknown sentinel is rewritten to.
    #[serde(default = "default_unknown_token")]
    pub unknown_token: String,
}

fn default_max_levels() -> usize {
    30
}

fn default_bucket_token() -> String {
    "other".to_string()
}

fn default_unknown_sentinel() -> String {
    "-4".to_string()
}

fn default_unknown_token() -> String {
    "unknown".to_string()
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            max_levels: default_max_levels(),
            bucket_token: default_bucket_token(),
            unknown_sentinel: default_unknown_sentinel(),
            unknown_token: default_unknown_token(),
        }
    }
}

impl EncodingOptions {
    #[must_use]
    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }
}

/// Output artifact locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    /// Pre-encoding snapshot table.
    pub snapshot: PathBuf,
    /// Fully encoded table.
    pub encoded: PathBuf,
    /// Optional JSON data-quality report.
    #[serde(default)]
    pub report: Option<PathBuf>,
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub keys: KeyColumns,
    pub primary: PrimarySpec,
    pub registry: RegistrySpec,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub normalize: NormalizeOptions,
    #[serde(default)]
    pub encoding: EncodingOptions,
    pub output: OutputPaths,
}

impl PipelineConfig {
    /// Resolves every relative path against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        resolve(&mut self.primary.path, base);
        resolve(&mut self.registry.path, base);
        for source in &mut self.sources {
            resolve(&mut source.path, base);
        }
        self.redirect_outputs(base);
    }

    /// Places every relative output path under `dir`.
    pub fn redirect_outputs(&mut self, dir: &Path) {
        resolve(&mut self.output.snapshot, dir);
        resolve(&mut self.output.encoded, dir);
        if let Some(report) = &mut self.output.report {
            resolve(report, dir);
        }
    }

    /// Returns the source with the given name.
    pub fn source(&self, name: &str) -> Option<&SourceSpec> {
        self.sources.iter().find(|source| source.name == name)
    }
}

fn resolve(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}
