//! Preparation run with explicit, timed stages.
//!
//! 1. **Ingest**: load the primary table, every source and the column registry
//! 2. **Assemble**: select records per source and left-join onto the primary table
//! 3. **Prepare**: registry filter and numeric normalization
//! 4. **Snapshot**: the pre-encoding inspection table
//! 5. **Encode**: categorical expansion
//! 6. **Output**: write both tables and the quality report
//!
//! Stages 2-5 are driven by `cohort_transform::run_with`; every stage runs
//! inside its own span and logs one completion event.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, info_span, warn};

use cohort_ingest::{load_registry, load_table};
use cohort_model::PipelineConfig;
use cohort_output::{write_encoded, write_quality_report, write_snapshot};
use cohort_transform::{PrepInputs, PrepOutput, PrepSettings, SourceInput, run_with};

// ============================================================================
// Stage 1: Ingest
// ============================================================================

/// Loads every input table and the column registry named by the config.
pub fn ingest(config: &PipelineConfig) -> Result<PrepInputs> {
    let span = info_span!("ingest", sources = config.sources.len());
    let _guard = span.enter();
    let start = Instant::now();

    let primary_key = config.keys.primary();
    let primary = load_table(&config.primary.path, "primary", Some(primary_key.as_slice()))
        .context("load primary table")?;

    let mut sources = Vec::with_capacity(config.sources.len());
    for spec in &config.sources {
        let key = spec.load_key(&config.keys);
        let table = load_table(&spec.path, &spec.name, key.as_deref())
            .with_context(|| format!("load source {}", spec.name))?;
        sources.push(SourceInput {
            spec: spec.clone(),
            table,
        });
    }

    let registry = load_registry(&config.registry.path).context("load column registry")?;
    info!(
        primary_rows = primary.height(),
        sources = sources.len(),
        registry_entries = registry.len(),
        duration_ms = start.elapsed().as_millis(),
        "ingest complete"
    );

    Ok(PrepInputs {
        primary,
        registry,
        sources,
    })
}

// ============================================================================
// Stages 2-5: Transform
// ============================================================================

/// Runs the transform stages, logging one completion event per stage.
pub fn transform(inputs: &PrepInputs, settings: &PrepSettings) -> Result<PrepOutput> {
    let output = run_with(inputs, settings, |event| {
        info!(
            stage = event.stage.name(),
            rows = event.frame.height(),
            columns = event.frame.width(),
            coerced_to_missing = event.report.total_coerced_to_missing(),
            bucketed = event.report.total_bucketed(),
            duration_ms = event.elapsed.as_millis(),
            "stage complete"
        );
    })?;
    if !output.report.warnings.is_empty() {
        warn!(count = output.report.warnings.len(), "run finished with warnings");
    }
    Ok(output)
}

// ============================================================================
// Stage 6: Output
// ============================================================================

/// Paths written by the output stage.
#[derive(Debug, Clone, Default)]
pub struct OutputFiles {
    pub snapshot: Option<PathBuf>,
    pub encoded: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

/// Writes both tables and, unless disabled, the quality report.
pub fn output(
    result: &PrepOutput,
    config: &PipelineConfig,
    write_report: bool,
) -> Result<OutputFiles> {
    let span = info_span!("output");
    let _guard = span.enter();
    let start = Instant::now();
    let keys = config.keys.primary();

    write_snapshot(&result.snapshot, &keys, &config.output.snapshot)
        .context("write snapshot table")?;
    write_encoded(&result.encoded, &keys, &config.output.encoded)
        .context("write encoded table")?;
    let report = match (&config.output.report, write_report) {
        (Some(path), true) => {
            write_quality_report(&result.report, path).context("write quality report")?;
            Some(path.clone())
        }
        _ => None,
    };

    info!(duration_ms = start.elapsed().as_millis(), "output complete");
    Ok(OutputFiles {
        snapshot: Some(config.output.snapshot.clone()),
        encoded: Some(config.output.encoded.clone()),
        report,
    })
}

/// Points every output at `dir`, keeping the configured file names.
pub fn redirect_outputs(config: &mut PipelineConfig, dir: &Path) {
    let file_name = |path: &Path, fallback: &str| {
        path.file_name()
            .map_or_else(|| PathBuf::from(fallback), PathBuf::from)
    };
    config.output.snapshot = file_name(&config.output.snapshot, "snapshot.csv");
    config.output.encoded = file_name(&config.output.encoded, "encoded.csv");
    if let Some(report) = &config.output.report {
        config.output.report = Some(file_name(report, "quality_report.json"));
    }
    config.redirect_outputs(dir);
}
