use crate::walltime::{walltime_to_seconds, WalltimeError};
use regex::Regex;
use std::sync::LazyLock;

const WALL_TIME_MARKER: &str = "Total wall time";
const WALL_TIME_PREFIX: &str = "Total wall time: ";

static CPU_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\d.]+)% CPU use").expect("CPU use pattern is valid")
});

/// Timing metrics reported at the end of a simulation log.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationMetrics {
    /// Total wall time in seconds.
    pub wall_time: Option<u64>,
    /// CPU utilization as a percentage in `[0, 100]`.
    pub cpu_utilization: Option<f64>,
}

impl SimulationMetrics {
    /// Both metrics, if both were found.
    pub fn complete(&self) -> Option<(u64, f64)> {
        Some((self.wall_time?, self.cpu_utilization?))
    }
}

/// Extract the total wall time and CPU utilization from a simulation log.
///
/// A log without a wall time line has no metrics at all. A wall time line whose value cannot
/// be parsed is an error.
pub fn parse_simulation_log(log: &str) -> Result<SimulationMetrics, WalltimeError> {
    let Some(line) = log.lines().find(|line| line.contains(WALL_TIME_MARKER)) else {
        return Ok(SimulationMetrics::default());
    };

    let value = line.rsplit(WALL_TIME_PREFIX).next().unwrap_or_default();
    let wall_time = walltime_to_seconds(value)?;

    Ok(SimulationMetrics {
        wall_time: Some(wall_time),
        cpu_utilization: cpu_utilization(log),
    })
}

fn cpu_utilization(log: &str) -> Option<f64> {
    let text = CPU_USE.captures(log)?.get(1)?.as_str();
    let Ok(value) = text.parse::<f64>() else {
        log::warn!("Ignoring CPU utilization that is not a number: {text}");
        return None;
    };

    if (0.0..=100.0).contains(&value) {
        Some(value)
    } else {
        log::warn!("Ignoring CPU utilization outside of 0-100%: {value}");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAMMPS_TAIL: &str = "\
Loop time of 118.2 on 4 procs for 100 steps with 32000 atoms

Performance: 0.073 ns/day, 328.389 hours/ns, 0.846 timesteps/s
55.0% CPU use with 4 MPI tasks x 1 OpenMP threads

Total wall time: 2:00
";

    #[test]
    fn extracts_wall_time_and_cpu() -> anyhow::Result<()> {
        let metrics = parse_simulation_log(LAMMPS_TAIL)?;
        assert_eq!(metrics.wall_time, Some(120));
        assert_eq!(metrics.cpu_utilization, Some(55.0));
        assert_eq!(metrics.complete(), Some((120, 55.0)));
        Ok(())
    }

    #[test]
    fn no_wall_time_means_no_metrics() -> anyhow::Result<()> {
        let metrics = parse_simulation_log("99.9% CPU use with 1 MPI tasks\n")?;
        assert_eq!(metrics, SimulationMetrics::default());
        assert_eq!(metrics.complete(), None);
        Ok(())
    }

    #[test]
    fn wall_time_without_cpu() -> anyhow::Result<()> {
        let metrics = parse_simulation_log("Setting up run\nTotal wall time: 0:01:05\n")?;
        assert_eq!(metrics.wall_time, Some(65));
        assert_eq!(metrics.cpu_utilization, None);
        assert_eq!(metrics.complete(), None);
        Ok(())
    }

    #[test]
    fn uses_first_wall_time_line() -> anyhow::Result<()> {
        let metrics =
            parse_simulation_log("Total wall time: 0:00:10\n12% CPU use\nTotal wall time: 0:00:20")?;
        assert_eq!(metrics.complete(), Some((10, 12.0)));
        Ok(())
    }

    #[test]
    fn tolerates_carriage_returns() -> anyhow::Result<()> {
        let metrics = parse_simulation_log("80.5% CPU use\r\nTotal wall time: 0:00:30\r\n")?;
        assert_eq!(metrics.complete(), Some((30, 80.5)));
        Ok(())
    }

    #[test]
    fn malformed_wall_time_is_an_error() {
        let err = parse_simulation_log("Total wall time: soon\n").unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn out_of_range_cpu_is_ignored() -> anyhow::Result<()> {
        let metrics = parse_simulation_log("380.2% CPU use\nTotal wall time: 0:00:30\n")?;
        assert_eq!(metrics.cpu_utilization, None);
        Ok(())
    }

    #[test]
    fn cpu_with_trailing_or_leading_point() -> anyhow::Result<()> {
        let metrics = parse_simulation_log("100.% CPU use\nTotal wall time: 0:00:30\n")?;
        assert_eq!(metrics.cpu_utilization, Some(100.0));

        let metrics = parse_simulation_log(".5% CPU use\nTotal wall time: 0:00:30\n")?;
        assert_eq!(metrics.cpu_utilization, Some(0.5));

        let metrics = parse_simulation_log("1.2.3% CPU use\nTotal wall time: 0:00:30\n")?;
        assert_eq!(metrics.cpu_utilization, None);
        Ok(())
    }
}
