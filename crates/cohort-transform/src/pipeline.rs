//! Stage functions for a full preparation run.
//!
//! Each stage reads the previous stage's table and returns a new one:
//!
//! 1. [`assemble`]: select records per source and left-join onto the primary table
//! 2. [`filter_columns`](crate::filter_columns): keep key and registry columns
//! 3. [`normalize_columns`](crate::normalize_columns): blanks, censor marks, numeric coercion
//! 4. [`snapshot`]: the normalized table with the trailing-year column derived
//! 5. [`encode`]: categorical expansion, then the same trailing-year derivation
//!
//! [`run`] chains them. [`run_with`] does the same and reports each completed
//! stage to an observer, which the CLI uses for its stage logging.

use std::time::{Duration, Instant};

use polars::prelude::DataFrame;
use tracing::{debug, info_span, warn};

use cohort_model::{
    ColumnRegistry, EncodingOptions, KeyColumns, KeyedTable, NormalizeOptions, PipelineConfig,
    QualityReport, SourceSpec, SourceSummary, WarningKind,
};

use crate::derived::apply_trailing_year;
use crate::encode::encode_categoricals;
use crate::error::Result;
use crate::filter::filter_columns;
use crate::handlers::default_handlers;
use crate::join::left_join;
use crate::numeric::normalize_columns;
use crate::selection::select_records;

/// A loaded auxiliary source and its declaration.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub spec: SourceSpec,
    pub table: KeyedTable,
}

/// Everything a run reads.
#[derive(Debug, Clone)]
pub struct PrepInputs {
    pub primary: KeyedTable,
    pub registry: ColumnRegistry,
    pub sources: Vec<SourceInput>,
}

/// Run-wide settings taken from the pipeline config.
#[derive(Debug, Clone, Default)]
pub struct PrepSettings {
    pub keys: KeyColumns,
    pub normalize: NormalizeOptions,
    pub encoding: EncodingOptions,
}

impl PrepSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            keys: config.keys.clone(),
            normalize: config.normalize.clone(),
            encoding: config.encoding.clone(),
        }
    }
}

/// Both output tables and the quality report of a run.
#[derive(Debug, Clone)]
pub struct PrepOutput {
    pub snapshot: DataFrame,
    pub encoded: DataFrame,
    pub report: QualityReport,
}

/// Selects and left-joins every source onto the primary table, in order.
pub fn assemble(
    primary: &KeyedTable,
    sources: &[SourceInput],
    keys: &KeyColumns,
    report: &mut QualityReport,
) -> Result<DataFrame> {
    let mut joined = primary.data.clone();
    for source in sources {
        let selected = select_records(&source.table.data, &source.spec, keys)?;
        let (next, stats) = left_join(&joined, &selected.table)?;
        joined = next;

        if stats.matched_rows == 0 {
            warn!(source = %source.spec.name, "source matched no primary rows");
        }
        debug!(
            source = %source.spec.name,
            matched = stats.matched_rows,
            unmatched = stats.unmatched_rows,
            columns = stats.columns_added,
            "source joined"
        );
        report.sources.push(SourceSummary {
            name: source.spec.name.clone(),
            policy: source.spec.selection.label(),
            input_rows: selected.input_rows,
            selected_rows: selected.table.height(),
            missing_subject_rows: selected.missing_key_rows,
            matched_rows: stats.matched_rows,
            unmatched_rows: stats.unmatched_rows,
            columns_added: stats.columns_added,
        });
    }
    Ok(joined)
}

/// Registry filter followed by numeric normalization.
pub fn prepare(
    joined: &DataFrame,
    registry: &ColumnRegistry,
    settings: &PrepSettings,
    report: &mut QualityReport,
) -> Result<DataFrame> {
    let filtered = filter_columns(joined, registry, &settings.keys.primary(), report)?;
    normalize_columns(
        &filtered,
        registry,
        &settings.keys,
        &settings.normalize,
        default_handlers(),
        report,
    )
}

/// The inspection table: the normalized table with the trailing year derived.
pub fn snapshot(
    normalized: &DataFrame,
    settings: &PrepSettings,
    report: &mut QualityReport,
) -> Result<DataFrame> {
    let Some(column) = settings.normalize.trailing_year.as_deref() else {
        return Ok(normalized.clone());
    };
    match apply_trailing_year(normalized, column)? {
        Some(derived) => {
            report.column_mut(column).coerced_to_missing += derived.unparsed;
            Ok(derived.frame)
        }
        None => {
            warn!(column, "trailing-year column is not present, skipping");
            report.warn(
                WarningKind::MissingColumn,
                column,
                "trailing-year column not present after filtering",
            );
            Ok(normalized.clone())
        }
    }
}

/// The modeling table: categoricals expanded, then the trailing year derived.
///
/// Trailing-year counts and warnings are recorded once, by [`snapshot`].
pub fn encode(
    normalized: &DataFrame,
    registry: &ColumnRegistry,
    settings: &PrepSettings,
    report: &mut QualityReport,
) -> Result<DataFrame> {
    let encoded = encode_categoricals(
        normalized,
        registry,
        &settings.keys,
        &settings.encoding,
        default_handlers(),
        report,
    )?;
    let Some(column) = settings.normalize.trailing_year.as_deref() else {
        return Ok(encoded);
    };
    Ok(apply_trailing_year(&encoded, column)?.map_or(encoded, |derived| derived.frame))
}

/// A transform stage, as reported to a [`run_with`] observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Assemble,
    Prepare,
    Snapshot,
    Encode,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Assemble => "assemble",
            Self::Prepare => "prepare",
            Self::Snapshot => "snapshot",
            Self::Encode => "encode",
        }
    }
}

/// State after one stage completes.
#[derive(Debug)]
pub struct StageEvent<'a> {
    pub stage: Stage,
    /// The table the stage produced.
    pub frame: &'a DataFrame,
    /// The report as it stands after the stage.
    pub report: &'a QualityReport,
    pub elapsed: Duration,
}

/// Runs every stage and returns both tables with the quality report.
pub fn run(inputs: &PrepInputs, settings: &PrepSettings) -> Result<PrepOutput> {
    run_with(inputs, settings, |_| {})
}

/// Like [`run`], calling `on_stage` after each stage.
///
/// Each stage runs inside its own span.
pub fn run_with<F>(
    inputs: &PrepInputs,
    settings: &PrepSettings,
    mut on_stage: F,
) -> Result<PrepOutput>
where
    F: FnMut(StageEvent<'_>),
{
    let mut report = QualityReport::new();
    let joined = run_stage(Stage::Assemble, &mut report, &mut on_stage, |report| {
        assemble(&inputs.primary, &inputs.sources, &settings.keys, report)
    })?;
    let normalized = run_stage(Stage::Prepare, &mut report, &mut on_stage, |report| {
        prepare(&joined, &inputs.registry, settings, report)
    })?;
    let snapshot = run_stage(Stage::Snapshot, &mut report, &mut on_stage, |report| {
        snapshot(&normalized, settings, report)
    })?;
    let encoded = run_stage(Stage::Encode, &mut report, &mut on_stage, |report| {
        encode(&normalized, &inputs.registry, settings, report)
    })?;
    report.prune();
    Ok(PrepOutput {
        snapshot,
        encoded,
        report,
    })
}

fn run_stage<F, S>(
    stage: Stage,
    report: &mut QualityReport,
    on_stage: &mut F,
    body: S,
) -> Result<DataFrame>
where
    F: FnMut(StageEvent<'_>),
    S: FnOnce(&mut QualityReport) -> Result<DataFrame>,
{
    let start = Instant::now();
    let frame = info_span!("stage", stage = stage.name()).in_scope(|| body(report))?;
    on_stage(StageEvent {
        stage,
        frame: &frame,
        report,
        elapsed: start.elapsed(),
    });
    Ok(frame)
}
