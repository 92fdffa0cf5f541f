use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

/// Environment variable that, when set, skips result files that cannot be parsed.
pub const IGNORE_INVALID_RESULTS_ENV: &str = "IGNORE_INVALID_RESULTS";

/// Flags that take a value, either as the next argument or after `=`.
const VALUE_FLAGS: [&str; 2] = ["--results", "--out"];
const SWITCHES: [&str; 2] = ["-h", "--help"];

#[derive(Debug, Parser)]
#[command(about = "Generate an HTML report from Fractale agent results", long_about = None)]
pub struct CliArgs {
    /// Root directory with one sub-directory of `results-*.json` files per application.
    #[arg(long, env = "FRACTALE_RESULTS_DIR", default_value = "results")]
    pub results: PathBuf,

    /// Directory to write `analysis_report.html` to.
    #[arg(long, env = "FRACTALE_REPORT_DIR", default_value = "data")]
    pub out: PathBuf,
}

impl CliArgs {
    /// Parse the process arguments, returning the ones that were not recognised.
    pub fn parse_known() -> (Self, Vec<OsString>) {
        let (known, unknown) = split_known_args(std::env::args_os());
        (Self::parse_from(known), unknown)
    }
}

/// Split a command line into the arguments [CliArgs] understands and everything else.
///
/// Known flags are kept wherever they appear. The first argument is the program name and is
/// always kept.
pub fn split_known_args<I, T>(args: I) -> (Vec<OsString>, Vec<OsString>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into).peekable();
    let mut known = Vec::new();
    let mut unknown = Vec::new();
    known.extend(args.next());

    while let Some(arg) = args.next() {
        let Some(text) = arg.to_str() else {
            unknown.push(arg);
            continue;
        };

        if VALUE_FLAGS.contains(&text) {
            known.push(arg);
            // A missing value is left for clap to report
            if let Some(value) = args.next_if(|next| !next.to_string_lossy().starts_with('-')) {
                known.push(value);
            }
        } else if SWITCHES.contains(&text) || is_flag_with_value(text) {
            known.push(arg);
        } else {
            unknown.push(arg);
        }
    }

    (known, unknown)
}

fn is_flag_with_value(arg: &str) -> bool {
    VALUE_FLAGS.iter().any(|flag| {
        arg.strip_prefix(flag)
            .is_some_and(|rest| rest.starts_with('='))
    })
}
