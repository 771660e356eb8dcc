use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use tracing::{info, info_span};

use cohort_cli::pipeline::{OutputFiles, ingest, output, redirect_outputs, transform};
use cohort_ingest::{load_pipeline_config, load_registry};
use cohort_model::{ColumnRole, RegistryEntry};
use cohort_transform::{PrepSettings, default_handlers};

use crate::cli::{RegistryArgs, RunArgs};
use crate::summary::apply_table_style;
use crate::types::RunResult;

pub fn run_prep(args: &RunArgs) -> Result<RunResult> {
    let run_span = info_span!("run", config = %args.config.display());
    let _run_guard = run_span.enter();
    let start = Instant::now();

    let mut config = load_pipeline_config(&args.config).context("load pipeline config")?;
    if let Some(dir) = &args.output_dir {
        redirect_outputs(&mut config, dir);
    }
    let mut settings = PrepSettings::from_config(&config);
    if let Some(max_levels) = args.max_levels {
        settings.encoding = settings.encoding.with_max_levels(max_levels);
    }

    let inputs = ingest(&config)?;
    let prepared = transform(&inputs, &settings)?;
    let outputs = if args.dry_run {
        info!("dry run, no files written");
        OutputFiles::default()
    } else {
        output(&prepared, &config, !args.no_report)?
    };

    info!(
        rows = prepared.encoded.height(),
        columns = prepared.encoded.width(),
        duration_ms = start.elapsed().as_millis(),
        "run complete"
    );
    Ok(RunResult {
        config_path: args.config.clone(),
        rows: prepared.encoded.height(),
        snapshot_columns: prepared.snapshot.width(),
        encoded_columns: prepared.encoded.width(),
        outputs,
        report: prepared.report,
        dry_run: args.dry_run,
    })
}

pub fn run_registry(args: &RegistryArgs) -> Result<()> {
    let registry = load_registry(&args.path).context("load column registry")?;
    let handlers = default_handlers();
    let mut table = Table::new();
    table.set_header(vec!["Column", "Keep", "Role", "Treatment"]);
    apply_table_style(&mut table);
    for entry in &registry.entries {
        let keep = if entry.keep { "yes" } else { "no" };
        let role = entry.role();
        let label = if entry.has_flag_conflict() {
            format!("{} (numeric flag ignored)", role.label())
        } else {
            role.label().to_string()
        };
        table.add_row(vec![
            entry.column_name.clone(),
            keep.to_string(),
            label,
            handlers.get(role).description().to_string(),
        ]);
    }
    println!("{table}");

    let kept: Vec<ColumnRole> = registry.kept().map(RegistryEntry::role).collect();
    println!(
        "{} of {} columns kept ({} numeric, {} categorical)",
        kept.len(),
        registry.len(),
        kept.iter().filter(|role| role.is_numeric()).count(),
        kept.iter().filter(|role| role.is_categorical()).count()
    );
    Ok(())
}
