use crate::collect::StepRecord;
use crate::diff::render_diff;
use fractale_result_model::{ArtifactKind, BUILD_AGENT, KUBERNETES_JOB_AGENT};
use itertools::Itertools;
use maud::{html, Markup, PreEscaped};

/// Rendered when there are no steps at all.
pub const NO_DATA: &str = "<p>No data available to generate diffs.</p>";

/// Rendered when no run has more than one attempt at any artifact.
pub const NO_RUNS: &str = "<p>No runs had multiple attempts to generate a diff.</p>";

/// Where to find the artifacts of one agent, and how to title their changes.
struct ArtifactSource {
    agent: &'static str,
    kind: ArtifactKind,
    heading: &'static str,
}

const ARTIFACT_SOURCES: [ArtifactSource; 2] = [
    ArtifactSource {
        agent: BUILD_AGENT,
        kind: ArtifactKind::Dockerfile,
        heading: "Dockerfile Changes",
    },
    ArtifactSource {
        agent: KUBERNETES_JOB_AGENT,
        kind: ArtifactKind::Crd,
        heading: "Kubernetes Job YAML Changes",
    },
];

/// Render collapsible diffs between consecutive attempts for every run.
///
/// Steps must be grouped by run, as produced by [crate::collect::collect_results]. Runs with
/// fewer than two attempts at every artifact are left out.
pub fn render_changelog(steps: &[StepRecord], wrap_column: usize) -> String {
    if steps.is_empty() {
        return NO_DATA.to_string();
    }

    let mut runs = Vec::new();
    let by_run = steps.iter().chunk_by(|step| step.run_id.clone());
    for (run_id, run_steps) in &by_run {
        let run_steps = run_steps.collect::<Vec<_>>();
        let sections = ARTIFACT_SOURCES
            .iter()
            .filter_map(|source| artifact_changes(&run_steps, source, wrap_column))
            .collect::<Vec<_>>();

        if sections.is_empty() {
            log::debug!("No attempt changes for run {run_id}");
            continue;
        }

        runs.push(html! {
            details class="run-details" {
                summary { (run_id) }
                div class="diff-container" {
                    @for section in &sections {
                        (section)
                    }
                }
            }
        });
    }

    if runs.is_empty() {
        return NO_RUNS.to_string();
    }

    html! {
        @for run in &runs {
            (run)
        }
    }
    .into_string()
}

fn artifact_changes(
    run_steps: &[&StepRecord],
    source: &ArtifactSource,
    wrap_column: usize,
) -> Option<Markup> {
    let step = run_steps.iter().find(|step| step.is_agent(source.agent))?;
    let artifacts = step.metadata.artifacts_by_attempt(source.kind);
    if artifacts.len() < 2 {
        return None;
    }

    Some(html! {
        h4 { (source.heading) }
        @for pair in artifacts.windows(2) {
            @let from_desc = format!("Attempt {}", pair[0].attempt);
            @let to_desc = format!("Attempt {}", pair[1].attempt);
            details {
                summary { (from_desc) " vs. " (to_desc) }
                div class="diff-content" {
                    (PreEscaped(render_diff(&pair[0].item, &pair[1].item, &from_desc, &to_desc, wrap_column)))
                }
            }
        }
    })
}
