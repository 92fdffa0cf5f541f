use crate::changelog::render_changelog;
use crate::collect::ResultsCollection;
use crate::diff::DEFAULT_WRAP_COLUMN;
use crate::frame::{
    application_summaries, logs_frame, steps_frame, ApplicationSummary, AGENT, APPLICATION,
    ATTEMPTS, CPU_UTILIZATION, TOTAL_SECONDS, WALL_TIME,
};
use crate::partition::partition_values;
use crate::plot::{svg_data_uri, BoxPlot, PlotTheme, PLASMA, VIRIDIS};
use anyhow::Context;
use chrono::{DateTime, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use polars::prelude::DataFrame;

const STYLESHEET: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif; line-height: 1.6; color: #333; max-width: 1200px; margin: 20px auto; padding: 0 20px; }
h1, h2, h4 { color: #2c3e50; }
h1, h2 { border-bottom: 2px solid #ecf0f1; padding-bottom: 10px; }
.generated { color: #7f8c8d; font-size: 0.9em; }
.container { background-color: #fdfdfd; padding: 20px; border-radius: 8px; box-shadow: 0 4px 8px rgba(0,0,0,0.1); margin-bottom: 30px; }
img { max-width: 100%; height: auto; border: 1px solid #ddd; border-radius: 4px; padding: 5px; }
.placeholder { color: #7f8c8d; font-style: italic; }
table.summary { border-collapse: collapse; width: 100%; }
table.summary th, table.summary td { border-bottom: 1px solid #ecf0f1; padding: 6px 10px; text-align: right; }
table.summary th:first-child, table.summary td:first-child { text-align: left; }
table.diff { font-family: "Courier New", Courier, monospace; border-collapse: collapse; width: 100%; margin-top: 10px; }
.diff_header { background-color: #e6e6e6; }
td.diff_header { text-align: center; font-weight: bold; }
.diff_next, .diff_add, .diff_chg, .diff_sub { font-size: 0.9em; }
.diff_add { background-color: #eaffea; }
.diff_sub { background-color: #ffecec; }
.diff_chg { background-color: #ffffd1; }
details.run-details { border: 1px solid #ccc; border-radius: 5px; margin-bottom: 1em; }
details.run-details > summary { font-weight: bold; font-size: 1.2em; cursor: pointer; padding: 10px; background-color: #f7f7f7; }
details.run-details[open] > summary { border-bottom: 1px solid #ccc; }
.diff-container { padding: 0 15px 15px 15px; }
.diff-container h4 { margin-top: 20px; border-bottom: 1px solid #eee; padding-bottom: 5px; }
.diff-container details { border: 1px solid #e0e0e0; border-radius: 4px; margin-bottom: 5px; }
.diff-container summary { font-weight: normal; cursor: pointer; padding: 8px; background-color: #fafafa; }
.diff-content { padding: 10px; }
"#;

/// Settings for rendering a report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    pub theme: PlotTheme,
    /// Characters per line in attempt diffs before wrapping.
    pub wrap_column: usize,
}

impl ReportOptions {
    pub fn new(theme: PlotTheme) -> Self {
        Self {
            title: "Fractale Agent Report".to_string(),
            theme,
            wrap_column: DEFAULT_WRAP_COLUMN,
        }
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::new(PlotTheme::default())
    }
}

/// Render the full HTML report for a set of results.
pub fn render_report(
    results: &ResultsCollection,
    options: &ReportOptions,
    generated_at: DateTime<Utc>,
) -> anyhow::Result<String> {
    let steps = steps_frame(&results.steps).context("Build steps frame")?;
    let logs = logs_frame(&results.logs).context("Build logs frame")?;

    let summaries = application_summaries(&steps, &logs).context("Summarise applications")?;
    let plots = [
        attempts_plot(&steps).context("Attempts plot")?,
        elapsed_time_plot(&steps).context("Elapsed time plot")?,
        wall_time_plot(&logs).context("Wall time plot")?,
        cpu_utilization_plot(&logs).context("CPU utilization plot")?,
    ];
    let [attempts, elapsed_time, wall_time, cpu_utilization] =
        plots.map(|plot| plot_image(&plot, &options.theme));

    let changelog = render_changelog(&results.steps, options.wrap_column);

    let document = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Analysis Report" }
                style { (PreEscaped(STYLESHEET)) }
            }
            body {
                h1 { (options.title) }
                p.generated { "Generated at " (generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()) }
                div.container {
                    h2 { "Summary" }
                    (summary_table(&summaries))
                }
                div.container {
                    (attempts)
                    (elapsed_time)
                }
                div.container {
                    h2 { "Simulation Logs" }
                    (wall_time)
                    (cpu_utilization)
                }
                div.container {
                    h2 { "Incremental Change Log (Diffs)" }
                    p { "Collapsible report of changes for each attempt within every run." }
                    (PreEscaped(changelog))
                }
            }
        }
    };

    Ok(document.into_string())
}

fn attempts_plot(steps: &DataFrame) -> anyhow::Result<BoxPlot> {
    let groups = partition_values(steps, &[APPLICATION, AGENT], ATTEMPTS)?
        .into_iter()
        .filter_map(|(key, values)| match <[String; 2]>::try_from(key) {
            Ok([application, agent]) => Some((application, agent, values)),
            Err(_) => None,
        });

    Ok(BoxPlot::new("Attempts By Application")
        .with_hue_groups(groups)
        .y_label("Count Attempts")
        .integer_ticks())
}

fn elapsed_time_plot(steps: &DataFrame) -> anyhow::Result<BoxPlot> {
    Ok(BoxPlot::new("Elapsed Time per Step")
        .with_groups(single_tag_groups(steps, AGENT, TOTAL_SECONDS)?)
        .x_label("Agent")
        .y_label("Seconds"))
}

fn wall_time_plot(logs: &DataFrame) -> anyhow::Result<BoxPlot> {
    Ok(BoxPlot::new("Simulation Total Wall Time")
        .with_groups(single_tag_groups(logs, APPLICATION, WALL_TIME)?)
        .y_label("Seconds")
        .palette(VIRIDIS)
        .rotate_labels())
}

fn cpu_utilization_plot(logs: &DataFrame) -> anyhow::Result<BoxPlot> {
    Ok(BoxPlot::new("Simulation CPU Utilization")
        .with_groups(single_tag_groups(logs, APPLICATION, CPU_UTILIZATION)?)
        .y_label("CPU Utilization (%)")
        .y_range(0.0, 105.0)
        .palette(PLASMA)
        .rotate_labels())
}

fn single_tag_groups(
    frame: &DataFrame,
    tag: &str,
    value: &str,
) -> anyhow::Result<Vec<(String, Vec<f64>)>> {
    Ok(partition_values(frame, &[tag], value)?
        .into_iter()
        .filter_map(|(mut key, values)| key.pop().map(|label| (label, values)))
        .collect())
}

fn plot_image(plot: &BoxPlot, theme: &PlotTheme) -> Markup {
    if plot.is_empty() {
        return html! {
            p.placeholder { "No data available for " (plot.title) "." }
        };
    }

    let svg = plot.render_svg(theme);
    html! {
        img src=(svg_data_uri(&svg)) alt=(format!("{} Plot", plot.title));
    }
}

fn summary_table(summaries: &[ApplicationSummary]) -> Markup {
    if summaries.is_empty() {
        return html! { p.placeholder { "No applications found." } };
    }

    html! {
        table.summary {
            thead {
                tr {
                    th { "Application" }
                    th { "Runs" }
                    th { "Steps" }
                    th { "Mean Attempts" }
                    th { "Mean Elapsed (s)" }
                    th { "Simulation Logs" }
                    th { "Mean Wall Time (s)" }
                    th { "Mean CPU (%)" }
                }
            }
            tbody {
                @for summary in summaries {
                    tr {
                        td { (summary.application) }
                        td { (summary.runs) }
                        td { (summary.steps) }
                        td { (format!("{:.2}", summary.mean_attempts)) }
                        td { (optional(summary.mean_elapsed)) }
                        td { (summary.simulation_logs) }
                        td { (optional(summary.mean_wall_time)) }
                        td { (optional(summary.mean_cpu_utilization)) }
                    }
                }
            }
        }
    }
}

fn optional(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(|| "-".to_string())
}
