use crate::log_text::parse_simulation_log;
use anyhow::Context;
use fractale_result_model::{
    is_result_file_name, load_result_file, StepMetadata, StepResult, KUBERNETES_JOB_AGENT,
};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One pipeline step of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub application: String,
    pub run_id: String,
    pub agent: Option<String>,
    pub total_seconds: Option<f64>,
    /// Number of attempts, counting the first. Always at least 1.
    pub attempts: u32,
    pub metadata: StepMetadata,
}

impl StepRecord {
    pub fn is_agent(&self, agent: &str) -> bool {
        self.agent.as_deref() == Some(agent)
    }
}

/// Simulation metrics parsed from the log of a Kubernetes job step.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub run_id: String,
    pub application: String,
    /// Total wall time in seconds.
    pub wall_time: u64,
    /// CPU utilization as a percentage in `[0, 100]`.
    pub cpu_utilization: f64,
}

/// Everything collected from a results directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsCollection {
    /// Steps in run order, the steps of one run are always adjacent.
    pub steps: Vec<StepRecord>,
    pub logs: Vec<LogRecord>,
}

impl ResultsCollection {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Options for [collect_results].
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    /// Skip result files that cannot be read or parsed instead of failing.
    pub ignore_invalid_results: bool,
}

/// Collect the step and log records from a results directory.
///
/// Each directory directly under `root` is an application, and each `results-*.json` file in
/// an application directory is one run. Runs are numbered from 1 in file name order, giving
/// run ids like `lammps-1`, `lammps-2`.
///
/// A missing `root` is not an error, it just has no results.
pub fn collect_results(root: &Path, options: CollectOptions) -> anyhow::Result<ResultsCollection> {
    let mut collection = ResultsCollection::default();

    if !root.exists() {
        log::warn!("Results directory {} does not exist", root.display());
        return Ok(collection);
    }

    for app_dir in list_dir(root, |entry| entry.file_type().is_dir())? {
        let Some(application) = file_name(&app_dir) else {
            continue;
        };
        log::debug!("Collecting results for application {application}");

        let result_files = list_dir(&app_dir, |entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(is_result_file_name)
        })?;

        let mut run_number = 0;
        for result_file in result_files {
            log::debug!("Loading results from {}", result_file.display());
            let steps = match load_result_file(&result_file) {
                Ok(steps) => steps,
                Err(e) if options.ignore_invalid_results => {
                    log::warn!("Skipping result file: {e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            run_number += 1;
            let run_id = format!("{application}-{run_number}");
            collection
                .add_run(&application, &run_id, steps)
                .with_context(|| format!("Failed to process {}", result_file.display()))?;
        }
    }

    log::info!(
        "Collected {} steps and {} simulation logs from {}",
        collection.steps.len(),
        collection.logs.len(),
        root.display()
    );

    Ok(collection)
}

impl ResultsCollection {
    fn add_run(
        &mut self,
        application: &str,
        run_id: &str,
        steps: Vec<StepResult>,
    ) -> anyhow::Result<()> {
        for step in steps {
            if step.is_agent(KUBERNETES_JOB_AGENT) {
                if let Some(log) = step.metadata.first_log() {
                    let metrics = parse_simulation_log(log)
                        .with_context(|| format!("Invalid simulation log for run {run_id}"))?;

                    match metrics.complete() {
                        Some((wall_time, cpu_utilization)) => self.logs.push(LogRecord {
                            run_id: run_id.to_string(),
                            application: application.to_string(),
                            wall_time,
                            cpu_utilization,
                        }),
                        None => log::debug!("Incomplete simulation metrics for run {run_id}"),
                    }
                }
            }

            self.steps.push(StepRecord {
                application: application.to_string(),
                run_id: run_id.to_string(),
                agent: step.agent,
                total_seconds: step.total_seconds,
                attempts: step.attempts.saturating_add(1),
                metadata: step.metadata,
            });
        }

        Ok(())
    }
}

/// The entries directly inside `dir` that match `filter`, sorted by file name.
fn list_dir(
    dir: &Path,
    filter: impl Fn(&walkdir::DirEntry) -> bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if filter(&entry) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
