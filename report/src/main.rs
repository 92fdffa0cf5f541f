use fractale_report::cli::{CliArgs, IGNORE_INVALID_RESULTS_ENV};
use fractale_report::collect::CollectOptions;
use fractale_report::generate_report;
use fractale_report::plot::PlotTheme;
use fractale_report::report::ReportOptions;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let (args, ignored) = CliArgs::parse_known();
    if !ignored.is_empty() {
        log::debug!("Ignoring unrecognised arguments: {ignored:?}");
    }

    let collect_options = CollectOptions {
        ignore_invalid_results: std::env::var(IGNORE_INVALID_RESULTS_ENV).is_ok(),
    };
    let report_options = ReportOptions::new(PlotTheme::whitegrid());

    log::info!("Using results directory: {}", args.results.display());
    match generate_report(&args.results, &args.out, collect_options, &report_options)? {
        Some(path) => println!("Report successfully generated at: {}", path.display()),
        None => println!("No valid result files found. Report cannot be generated."),
    }

    Ok(())
}
