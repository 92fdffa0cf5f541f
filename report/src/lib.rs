use crate::collect::{collect_results, CollectOptions};
use crate::report::{render_report, ReportOptions};
use anyhow::Context;
use chrono::Utc;
use std::path::{Path, PathBuf};

pub mod changelog;
pub mod cli;
pub mod collect;
pub mod diff;
pub mod frame;
pub mod log_text;
mod partition;
pub mod plot;
pub mod report;
pub mod walltime;

/// Name of the report written to the output directory.
pub const REPORT_FILE_NAME: &str = "analysis_report.html";

/// Collect the results under `results_dir` and write the report into `out_dir`.
///
/// Returns the path of the written report, or `None` if there were no results to report on.
/// Nothing is written in that case.
pub fn generate_report(
    results_dir: &Path,
    out_dir: &Path,
    collect_options: CollectOptions,
    report_options: &ReportOptions,
) -> anyhow::Result<Option<PathBuf>> {
    let results = collect_results(results_dir, collect_options)
        .with_context(|| format!("Failed to collect results from {}", results_dir.display()))?;
    if results.is_empty() {
        return Ok(None);
    }

    let document = render_report(&results, report_options, Utc::now())?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    let report_path = out_dir.join(REPORT_FILE_NAME);
    log::debug!("Writing report to {}", report_path.display());
    std::fs::write(&report_path, document)
        .with_context(|| format!("Failed to write report {}", report_path.display()))?;

    Ok(Some(std::path::absolute(&report_path)?))
}
