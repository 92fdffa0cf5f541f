use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Agent label for the step that builds the application container.
pub const BUILD_AGENT: &str = "build";

/// Agent label for the step that runs the application as a scheduled Kubernetes job.
pub const KUBERNETES_JOB_AGENT: &str = "kubernetes-job";

/// Prefix of a result file name within an application directory.
pub const RESULT_FILE_PREFIX: &str = "results-";

/// Suffix of a result file name within an application directory.
pub const RESULT_FILE_SUFFIX: &str = ".json";

/// One step of an agent pipeline, as written to a `results-*.json` file.
///
/// A result file holds a JSON array of these, one per step that the pipeline ran.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    /// The agent that ran this step, e.g. [BUILD_AGENT] or [KUBERNETES_JOB_AGENT].
    #[serde(default)]
    pub agent: Option<String>,
    /// Elapsed time of the step across all attempts, in seconds.
    #[serde(default)]
    pub total_seconds: Option<f64>,
    /// Number of retries the step needed.
    ///
    /// This is zero based, a step that succeeded first time has no retries.
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub metadata: StepMetadata,
}

impl StepResult {
    /// Whether this step was run by the given agent.
    pub fn is_agent(&self, agent: &str) -> bool {
        self.agent.as_deref() == Some(agent)
    }
}

/// Metadata recorded by an agent for a step.
///
/// Keys other than `steps` and `logs` are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StepMetadata {
    /// Artifacts produced by each attempt, in the order the agent recorded them.
    #[serde(default)]
    pub steps: Vec<AttemptArtifact>,
    /// Logs captured from the step.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl StepMetadata {
    /// The artifacts of the given kind, ordered by attempt.
    ///
    /// Artifacts sharing an attempt number keep the order they were recorded in.
    pub fn artifacts_by_attempt(&self, kind: ArtifactKind) -> Vec<&AttemptArtifact> {
        let mut artifacts = self
            .steps
            .iter()
            .filter(|artifact| artifact.kind == kind)
            .collect::<Vec<_>>();
        artifacts.sort_by_key(|artifact| artifact.attempt);
        artifacts
    }

    /// The content of the first captured log, if any.
    pub fn first_log(&self) -> Option<&str> {
        self.logs
            .iter()
            .find(|entry| entry.kind == LogKind::Log)
            .map(|entry| entry.item.as_str())
    }
}

/// The kinds of artifact an agent records per attempt.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A Dockerfile written by the build agent.
    Dockerfile,
    /// A Kubernetes job manifest written by the job agent.
    Crd,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A configuration file written by an agent during one attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttemptArtifact {
    #[serde(rename = "type", default)]
    pub kind: ArtifactKind,
    /// The attempt that produced this artifact. Missing attempts sort first.
    #[serde(default)]
    pub attempt: u32,
    #[serde(default)]
    pub item: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Log,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A log captured from a step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    #[serde(rename = "type", default)]
    pub kind: LogKind,
    #[serde(default)]
    pub item: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadResultsError {
    #[error("Failed to read result file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid result file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Whether a file name matches the `results-*.json` naming used for result files.
pub fn is_result_file_name(name: &str) -> bool {
    name.starts_with(RESULT_FILE_PREFIX) && name.ends_with(RESULT_FILE_SUFFIX)
}

/// Load step results from a reader
pub fn load_step_results<R: Read>(reader: R) -> serde_json::Result<Vec<StepResult>> {
    let reader = std::io::BufReader::new(reader);
    serde_json::from_reader(reader)
}

/// Load step results from a result file
///
/// The file should contain a single JSON array with one object per step.
pub fn load_result_file(path: impl AsRef<Path>) -> Result<Vec<StepResult>, LoadResultsError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| LoadResultsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_step_results(file).map_err(|source| LoadResultsError::Json {
        path: path.to_path_buf(),
        source,
    })
}
