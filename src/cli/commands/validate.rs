//! `validate` command handler.

use std::path::Path;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadResult};
use crate::error::{ConfigError, HeistError, Severity, ValidationIssue};

/// Per-file result of a validation pass.
struct FileReport<'a> {
    path: &'a Path,
    outcome: Result<LoadResult, ConfigError>,
}

impl FileReport<'_> {
    fn warnings(&self) -> &[crate::config::LoadWarning] {
        match &self.outcome {
            Ok(result) => &result.warnings,
            Err(_) => &[],
        }
    }

    fn passed(&self, strict: bool) -> bool {
        self.outcome.is_ok() && !(strict && !self.warnings().is_empty())
    }
}

/// Validate every file, report all of them, then fail if any did not pass.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming each failing file. In
/// strict mode warnings count as failures.
pub fn validate(args: &ValidateArgs) -> Result<(), HeistError> {
    let loader = ConfigLoader::with_defaults();
    let reports: Vec<FileReport<'_>> = args
        .files
        .iter()
        .map(|path| {
            tracing::info!(file = %path.display(), "validating configuration");
            FileReport {
                path,
                outcome: loader.load(path),
            }
        })
        .collect();

    match args.format {
        OutputFormat::Human => print_human(&reports, args.strict),
        OutputFormat::Json => print_json(&reports, args.strict)?,
    }

    let issues: Vec<ValidationIssue> = reports
        .iter()
        .filter(|r| !r.passed(args.strict))
        .map(|r| ValidationIssue {
            path: r.path.display().to_string(),
            message: r.outcome.as_ref().err().map_or_else(
                || format!("{} warning(s) in strict mode", r.warnings().len()),
                ToString::to_string,
            ),
            severity: Severity::Error,
        })
        .collect();

    if issues.is_empty() {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        path: format!("{} of {} file(s)", issues.len(), reports.len()),
        errors: issues,
    }
    .into())
}

fn print_human(reports: &[FileReport<'_>], strict: bool) {
    for report in reports {
        let status = if report.passed(strict) { "ok" } else { "FAILED" };
        match &report.outcome {
            Ok(result) => {
                let description = result.config.description.as_deref().unwrap_or("");
                println!(
                    "{status:<7}{} (scenario: {}) {description}",
                    report.path.display(),
                    result.config.scenario
                );
            }
            Err(err) => println!("{status:<7}{}: {err}", report.path.display()),
        }
        for warning in report.warnings() {
            println!(
                "       warning: {} at {}",
                warning.message,
                warning.location.as_deref().unwrap_or("<unknown>")
            );
        }
    }
}

fn print_json(reports: &[FileReport<'_>], strict: bool) -> Result<(), HeistError> {
    let entries: Vec<serde_json::Value> = reports
        .iter()
        .map(|report| {
            let warnings: Vec<serde_json::Value> = report
                .warnings()
                .iter()
                .map(|w| serde_json::json!({ "message": w.message, "location": w.location }))
                .collect();
            serde_json::json!({
                "file": report.path.display().to_string(),
                "valid": report.passed(strict),
                "scenario": report.outcome.as_ref().ok().map(|r| r.config.scenario.clone()),
                "error": report.outcome.as_ref().err().map(ToString::to_string),
                "warnings": warnings,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
