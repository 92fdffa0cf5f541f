use fractale_report::collect::{collect_results, CollectOptions, LogRecord};
use fractale_report::report::ReportOptions;
use fractale_report::{generate_report, REPORT_FILE_NAME};
use std::path::{Path, PathBuf};

fn test_results_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join("results")
}

#[test]
fn collect_test_data() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let collection = collect_results(&test_results_dir(), CollectOptions::default())?;

    let runs = collection
        .steps
        .iter()
        .map(|s| (s.run_id.as_str(), s.agent.as_deref(), s.attempts))
        .collect::<Vec<_>>();
    pretty_assertions::assert_eq!(
        runs,
        vec![
            ("amg-1", Some("build"), 1),
            ("amg-1", Some("kubernetes-job"), 4),
            ("lammps-1", Some("build"), 3),
            ("lammps-1", Some("kubernetes-job"), 2),
            ("lammps-2", Some("build"), 1),
            ("lammps-2", Some("kubernetes-job"), 1),
        ]
    );

    pretty_assertions::assert_eq!(
        collection.logs,
        vec![
            LogRecord {
                run_id: "lammps-1".to_string(),
                application: "lammps".to_string(),
                wall_time: 303,
                cpu_utilization: 98.7,
            },
            LogRecord {
                run_id: "lammps-2".to_string(),
                application: "lammps".to_string(),
                wall_time: 281,
                cpu_utilization: 96.2,
            },
        ]
    );

    Ok(())
}

#[test]
fn generate_report_from_test_data() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let out = tempfile::tempdir()?;
    let out_dir = out.path().join("data");

    let report_path = generate_report(
        &test_results_dir(),
        &out_dir,
        CollectOptions::default(),
        &ReportOptions::default(),
    )?
    .expect("Report should be written");

    assert!(report_path.is_absolute());
    assert_eq!(report_path.file_name().unwrap(), REPORT_FILE_NAME);

    let html = std::fs::read_to_string(&report_path)?;
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert_eq!(html.matches("src=\"data:image/svg+xml;base64,").count(), 4);

    // Only the first lammps run changed its files between attempts
    assert_eq!(html.matches("class=\"run-details\"").count(), 1);
    assert!(html.contains("<summary>lammps-1</summary>"));
    assert!(html.contains("<summary>Attempt 0 vs. Attempt 1</summary>"));
    assert!(html.contains("<summary>Attempt 1 vs. Attempt 2</summary>"));
    assert!(html.contains("<h4>Dockerfile Changes</h4>"));
    assert!(html.contains("<h4>Kubernetes Job YAML Changes</h4>"));
    assert!(html.contains("restartPolicy: Never"));

    Ok(())
}

#[test]
fn empty_results_write_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let results_dir = dir.path().join("results");
    std::fs::create_dir_all(results_dir.join("lammps"))?;
    let out_dir = dir.path().join("data");

    let report = generate_report(
        &results_dir,
        &out_dir,
        CollectOptions::default(),
        &ReportOptions::default(),
    )?;

    assert!(report.is_none());
    assert!(!out_dir.join(REPORT_FILE_NAME).exists());
    Ok(())
}

#[test]
fn missing_results_write_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let out_dir = dir.path().join("data");

    let report = generate_report(
        &dir.path().join("does-not-exist"),
        &out_dir,
        CollectOptions::default(),
        &ReportOptions::default(),
    )?;

    assert!(report.is_none());
    assert!(!out_dir.exists());
    Ok(())
}

#[test]
fn two_runs_of_one_application() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let app_dir = dir.path().join("app");
    std::fs::create_dir_all(&app_dir)?;
    for name in ["results-1.json", "results-2.json"] {
        std::fs::write(
            app_dir.join(name),
            r#"[{"agent": "build", "total_seconds": 12.5}]"#,
        )?;
    }

    let collection = collect_results(dir.path(), CollectOptions::default())?;
    assert_eq!(collection.steps.len(), 2);
    assert_eq!(collection.steps[0].run_id, "app-1");
    assert_eq!(collection.steps[1].run_id, "app-2");
    assert!(collection.logs.is_empty());

    let out_dir = dir.path().join("out");
    let report_path = generate_report(
        dir.path(),
        &out_dir,
        CollectOptions::default(),
        &ReportOptions::default(),
    )?
    .expect("Report should be written");

    let html = std::fs::read_to_string(report_path)?;
    assert!(html.contains("No data available for Simulation Total Wall Time."));
    assert!(html.contains("No runs had multiple attempts to generate a diff."));
    Ok(())
}
