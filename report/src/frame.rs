use crate::collect::{LogRecord, StepRecord};
use polars::prelude::*;

pub const APPLICATION: &str = "application";
pub const RUN_ID: &str = "run_id";
pub const AGENT: &str = "agent";
pub const TOTAL_SECONDS: &str = "total_seconds";
pub const ATTEMPTS: &str = "attempts";
pub const WALL_TIME: &str = "wall_time";
pub const CPU_UTILIZATION: &str = "cpu_utilization";

/// One row per step, without the step metadata.
pub fn steps_frame(steps: &[StepRecord]) -> PolarsResult<DataFrame> {
    df! [
        APPLICATION => steps.iter().map(|s| s.application.as_str()).collect::<Vec<_>>(),
        RUN_ID => steps.iter().map(|s| s.run_id.as_str()).collect::<Vec<_>>(),
        AGENT => steps.iter().map(|s| s.agent.as_deref()).collect::<Vec<_>>(),
        TOTAL_SECONDS => steps.iter().map(|s| s.total_seconds).collect::<Vec<_>>(),
        ATTEMPTS => steps.iter().map(|s| s.attempts as i64).collect::<Vec<_>>(),
    ]
}

/// One row per parsed simulation log.
pub fn logs_frame(logs: &[LogRecord]) -> PolarsResult<DataFrame> {
    df! [
        RUN_ID => logs.iter().map(|l| l.run_id.as_str()).collect::<Vec<_>>(),
        APPLICATION => logs.iter().map(|l| l.application.as_str()).collect::<Vec<_>>(),
        WALL_TIME => logs.iter().map(|l| l.wall_time as i64).collect::<Vec<_>>(),
        CPU_UTILIZATION => logs.iter().map(|l| l.cpu_utilization).collect::<Vec<_>>(),
    ]
}

/// Headline numbers for one application.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSummary {
    pub application: String,
    pub runs: i64,
    pub steps: i64,
    pub mean_attempts: f64,
    /// Mean elapsed seconds per step, if any step recorded its elapsed time.
    pub mean_elapsed: Option<f64>,
    pub simulation_logs: i64,
    pub mean_wall_time: Option<f64>,
    pub mean_cpu_utilization: Option<f64>,
}

/// Summarise the step and log frames per application, ordered by application name.
pub fn application_summaries(
    steps: &DataFrame,
    logs: &DataFrame,
) -> anyhow::Result<Vec<ApplicationSummary>> {
    let step_stats = steps.clone().lazy().group_by([col(APPLICATION)]).agg([
        col(RUN_ID)
            .n_unique()
            .cast(DataType::Int64)
            .alias("runs"),
        len().cast(DataType::Int64).alias("steps"),
        col(ATTEMPTS)
            .cast(DataType::Float64)
            .mean()
            .alias("mean_attempts"),
        col(TOTAL_SECONDS).mean().alias("mean_elapsed"),
    ]);

    let log_stats = logs.clone().lazy().group_by([col(APPLICATION)]).agg([
        len().cast(DataType::Int64).alias("simulation_logs"),
        col(WALL_TIME)
            .cast(DataType::Float64)
            .mean()
            .alias("mean_wall_time"),
        col(CPU_UTILIZATION).mean().alias("mean_cpu_utilization"),
    ]);

    let summary = step_stats
        .left_join(log_stats, col(APPLICATION), col(APPLICATION))
        .sort([APPLICATION], SortMultipleOptions::default())
        .collect()?;

    let applications = summary.column(APPLICATION)?.str()?;
    let runs = summary.column("runs")?.i64()?;
    let step_counts = summary.column("steps")?.i64()?;
    let mean_attempts = summary.column("mean_attempts")?.f64()?;
    let mean_elapsed = summary.column("mean_elapsed")?.f64()?;
    let simulation_logs = summary.column("simulation_logs")?.i64()?;
    let mean_wall_time = summary.column("mean_wall_time")?.f64()?;
    let mean_cpu_utilization = summary.column("mean_cpu_utilization")?.f64()?;

    let mut out = Vec::with_capacity(summary.height());
    for i in 0..summary.height() {
        let Some(application) = applications.get(i) else {
            continue;
        };

        out.push(ApplicationSummary {
            application: application.to_string(),
            runs: runs.get(i).unwrap_or_default(),
            steps: step_counts.get(i).unwrap_or_default(),
            mean_attempts: mean_attempts.get(i).unwrap_or_default(),
            mean_elapsed: mean_elapsed.get(i),
            simulation_logs: simulation_logs.get(i).unwrap_or_default(),
            mean_wall_time: mean_wall_time.get(i),
            mean_cpu_utilization: mean_cpu_utilization.get(i),
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractale_result_model::StepMetadata;
    use pretty_assertions::assert_eq;

    fn step(application: &str, run: u32, agent: &str, seconds: f64, attempts: u32) -> StepRecord {
        StepRecord {
            application: application.to_string(),
            run_id: format!("{application}-{run}"),
            agent: Some(agent.to_string()),
            total_seconds: Some(seconds),
            attempts,
            metadata: StepMetadata::default(),
        }
    }

    fn log(application: &str, run: u32, wall_time: u64, cpu_utilization: f64) -> LogRecord {
        LogRecord {
            run_id: format!("{application}-{run}"),
            application: application.to_string(),
            wall_time,
            cpu_utilization,
        }
    }

    #[test]
    fn steps_frame_has_one_row_per_step() -> anyhow::Result<()> {
        let mut steps = vec![step("lammps", 1, "build", 10.0, 1)];
        steps.push(StepRecord {
            agent: None,
            total_seconds: None,
            ..step("lammps", 1, "build", 0.0, 2)
        });

        let frame = steps_frame(&steps)?;
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.column(AGENT)?.null_count(), 1);
        assert_eq!(frame.column(TOTAL_SECONDS)?.null_count(), 1);
        let attempts = frame
            .column(ATTEMPTS)?
            .i64()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        assert_eq!(attempts, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn empty_frames_keep_their_columns() -> anyhow::Result<()> {
        let steps = steps_frame(&[])?;
        let logs = logs_frame(&[])?;
        assert_eq!(steps.height(), 0);
        assert_eq!(steps.width(), 5);
        assert_eq!(logs.height(), 0);
        assert_eq!(logs.width(), 4);
        Ok(())
    }

    #[test]
    fn summarise_by_application() -> anyhow::Result<()> {
        let steps = steps_frame(&[
            step("lammps", 1, "build", 10.0, 1),
            step("lammps", 1, "kubernetes-job", 30.0, 3),
            step("lammps", 2, "build", 20.0, 2),
            step("amg", 1, "build", 5.0, 1),
        ])?;
        let logs = logs_frame(&[log("lammps", 1, 100, 90.0), log("lammps", 2, 200, 80.0)])?;

        let summaries = application_summaries(&steps, &logs)?;
        assert_eq!(
            summaries,
            vec![
                ApplicationSummary {
                    application: "amg".to_string(),
                    runs: 1,
                    steps: 1,
                    mean_attempts: 1.0,
                    mean_elapsed: Some(5.0),
                    simulation_logs: 0,
                    mean_wall_time: None,
                    mean_cpu_utilization: None,
                },
                ApplicationSummary {
                    application: "lammps".to_string(),
                    runs: 2,
                    steps: 3,
                    mean_attempts: 2.0,
                    mean_elapsed: Some(20.0),
                    simulation_logs: 2,
                    mean_wall_time: Some(150.0),
                    mean_cpu_utilization: Some(85.0),
                },
            ]
        );
        Ok(())
    }
}
