//! Pipeline configuration loading.

use std::path::Path;

use tracing::debug;

use cohort_model::PipelineConfig;

use crate::error::{IngestError, Result};

/// Parses a pipeline configuration from TOML text without resolving paths.
pub fn parse_pipeline_config(text: &str, origin: &Path) -> Result<PipelineConfig> {
    toml::from_str(text).map_err(|e| IngestError::Config {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}

/// Loads a pipeline configuration file.
///
/// Relative paths inside the file are resolved against the file's directory.
pub fn load_pipeline_config(path: &Path) -> Result<PipelineConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let mut config = parse_pipeline_config(&text, path)?;

    let mut seen = std::collections::BTreeSet::new();
    for source in &config.sources {
        if !seen.insert(source.name.as_str()) {
            return Err(IngestError::Config {
                path: path.to_path_buf(),
                message: format!("source name '{}' is declared twice", source.name),
            });
        }
        if source.columns.is_some() && source.column_range.is_some() {
            return Err(IngestError::Config {
                path: path.to_path_buf(),
                message: format!(
                    "source '{}' declares both columns and column_range",
                    source.name
                ),
            });
        }
    }

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    debug!(
        path = %path.display(),
        sources = config.sources.len(),
        "pipeline config loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_policy() {
        let text = r#"
[primary]
path = "a.csv"
[registry]
path = "meta.csv"
[[sources]]
name = "x"
path = "x.csv"
selection = { policy = "random" }
[output]
snapshot = "s.csv"
encoded = "e.csv"
"#;
        let result = parse_pipeline_config(text, Path::new("pipeline.toml"));
        assert!(matches!(result, Err(IngestError::Config { .. })));
    }
}
