use std::path::PathBuf;

use cohort_cli::pipeline::OutputFiles;
use cohort_model::QualityReport;

#[derive(Debug)]
pub struct RunResult {
    pub config_path: PathBuf,
    pub rows: usize,
    pub snapshot_columns: usize,
    pub encoded_columns: usize,
    pub outputs: OutputFiles,
    pub report: QualityReport,
    pub dry_run: bool,
}
