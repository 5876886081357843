//! `version` command handler.

use serde::Serialize;

use crate::cli::args::{OutputFormat, VersionArgs};
use crate::error::HeistError;
use crate::governance::MAX_DELAY;
use crate::scenario;

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
    scenarios: Vec<&'static str>,
    max_delay_secs: u64,
}

impl VersionInfo {
    fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            scenarios: scenario::list_scenario_names(),
            max_delay_secs: MAX_DELAY,
        }
    }
}

/// Print the package version and the built-in scenario set.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(args: &VersionArgs) -> Result<(), HeistError> {
    let info = VersionInfo::current();
    match args.format {
        OutputFormat::Human => {
            println!("{} {}", info.name, info.version);
            println!("scenarios: {}", info.scenarios.join(", "));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&info)?),
    }
    Ok(())
}
