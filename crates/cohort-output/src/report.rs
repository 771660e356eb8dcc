//! Quality report writer.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use cohort_model::{ColumnQuality, QualityReport, QualityWarning, SourceSummary};

use crate::common::ensure_parent_dir;

#[derive(Serialize)]
struct ReportTotals {
    sources: usize,
    columns: usize,
    warnings: usize,
    coerced_to_missing: usize,
    bucketed: usize,
}

#[derive(Serialize)]
struct ReportPayload<'a> {
    totals: ReportTotals,
    sources: &'a [SourceSummary],
    columns: &'a BTreeMap<String, ColumnQuality>,
    warnings: &'a [QualityWarning],
}

/// Writes the quality report as pretty-printed JSON with a totals header.
pub fn write_quality_report(report: &QualityReport, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let payload = ReportPayload {
        totals: ReportTotals {
            sources: report.sources.len(),
            columns: report.columns.len(),
            warnings: report.warnings.len(),
            coerced_to_missing: report.total_coerced_to_missing(),
            bucketed: report.total_bucketed(),
        },
        sources: &report.sources,
        columns: &report.columns,
        warnings: &report.warnings,
    };
    let json = serde_json::to_string_pretty(&payload).context("serialize quality report")?;
    std::fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
