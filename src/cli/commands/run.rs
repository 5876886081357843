//! `run` command handler.
//!
//! Resolves the scenario and its parameters, runs it, reports the outcome
//! and maps a failed verdict to the verification exit code.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chain::format_units;
use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::{ConfigLoader, ScenarioConfig};
use crate::error::{HeistError, ScenarioError};
use crate::governance::ReadinessCheck;
use crate::observability::{Event, EventEmitter, init_metrics, metrics};
use crate::scenario::{self, Actor, BuiltinScenario, Check, Outcome};

/// Run a scenario end to end.
///
/// # Errors
///
/// Returns usage errors for unknown or mismatched scenarios, configuration
/// and I/O errors, bootstrap failures, and
/// [`ScenarioError::VerificationFailed`] when the verdict does not pass.
pub fn run(args: &RunArgs, quiet: bool) -> Result<(), HeistError> {
    let (builtin, config) = resolve(args)?;

    if args.metrics_file.is_some() {
        init_metrics()?;
    }
    let emitter = open_emitter(args.events_file.as_deref())?;

    let run_id = Uuid::new_v4();
    info!(scenario = builtin.name, %run_id, "running scenario");
    let outcome = builtin.run(&config.params)?;
    emit_events(&emitter, run_id, &outcome);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report(run_id, &outcome))?),
        OutputFormat::Human if !quiet => print_human(run_id, &outcome),
        OutputFormat::Human => {}
    }

    if let Some(path) = &args.metrics_file {
        std::fs::write(path, metrics::render().unwrap_or_default())?;
        info!(file = %path.display(), "metrics written");
    }

    if outcome.verdict.passed {
        Ok(())
    } else {
        Err(ScenarioError::VerificationFailed {
            scenario: outcome.scenario,
            failed: outcome.verdict.failed(),
        }
        .into())
    }
}

/// Picks the scenario from the command line and/or the configuration file.
fn resolve(args: &RunArgs) -> Result<(&'static BuiltinScenario, ScenarioConfig), HeistError> {
    let configured = match &args.config {
        Some(path) => {
            let result = ConfigLoader::with_defaults().load(path)?;
            for warning in &result.warnings {
                warn!(
                    location = warning.location.as_deref().unwrap_or("<unknown>"),
                    "{}",
                    warning.message
                );
            }
            Some(result.config)
        }
        None => None,
    };

    let name = match (&args.scenario, &configured) {
        (Some(requested), Some(config)) if *requested != config.scenario => {
            return Err(ScenarioError::Mismatch {
                configured: config.scenario.clone(),
                requested: requested.clone(),
            }
            .into());
        }
        (Some(requested), _) => requested.as_str(),
        (None, Some(config)) => config.scenario.as_str(),
        (None, None) => {
            return Err(HeistError::Usage(
                "a scenario name or --config is required".to_string(),
            ));
        }
    };

    let builtin = scenario::lookup(name)?;
    let config = match configured {
        Some(config) => config,
        None => builtin.default_config()?,
    };
    Ok((builtin, config))
}

fn open_emitter(path: Option<&Path>) -> Result<EventEmitter, HeistError> {
    Ok(match path {
        None => EventEmitter::noop(),
        Some(p) if p == Path::new("-") => EventEmitter::stderr(),
        Some(p) => EventEmitter::from_file(p)?,
    })
}

fn emit_events(emitter: &EventEmitter, run_id: Uuid, outcome: &Outcome) {
    emitter.emit(Event::ScenarioStarted {
        timestamp: Utc::now(),
        run_id,
        scenario: outcome.scenario.to_string(),
        readiness: outcome.readiness,
        actors: outcome.actors.clone(),
    });
    for log in &outcome.logs {
        emitter.emit(Event::ChainLog {
            timestamp: Utc::now(),
            run_id,
            log: log.clone(),
        });
    }
    emitter.emit(Event::AttackFinished {
        timestamp: Utc::now(),
        run_id,
        success: outcome.attack.is_ok(),
        error: attack_error(outcome),
    });
    emitter.emit(Event::VerdictReached {
        timestamp: Utc::now(),
        run_id,
        passed: outcome.verdict.passed,
        checks: outcome.verdict.checks.clone(),
    });
}

fn attack_error(outcome: &Outcome) -> Option<String> {
    outcome
        .attack
        .as_ref()
        .err()
        .map(|e| e.root_cause().to_string())
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    scenario: &'a str,
    run_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    readiness: Option<ReadinessCheck>,
    passed: bool,
    attack: AttackReport,
    checks: &'a [Check],
    actors: &'a [Actor],
    chain_logs: usize,
}

#[derive(Debug, Serialize)]
struct AttackReport {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn report(run_id: Uuid, outcome: &Outcome) -> RunReport<'_> {
    RunReport {
        scenario: outcome.scenario,
        run_id,
        readiness: outcome.readiness,
        passed: outcome.verdict.passed,
        attack: AttackReport {
            success: outcome.attack.is_ok(),
            error: attack_error(outcome),
        },
        checks: &outcome.verdict.checks,
        actors: &outcome.actors,
        chain_logs: outcome.logs.len(),
    }
}

fn print_human(run_id: Uuid, outcome: &Outcome) {
    let verdict = if outcome.verdict.passed { "PASSED" } else { "FAILED" };
    println!("{}: {verdict} (run {run_id})", outcome.scenario);
    if let Some(readiness) = outcome.readiness {
        println!("  readiness   {readiness}");
    }
    match attack_error(outcome) {
        None => println!("  attack      ok"),
        Some(err) => println!("  attack      reverted: {err}"),
    }
    println!("  chain logs  {}", outcome.logs.len());
    println!("  checks");
    for check in &outcome.verdict.checks {
        let mark = if check.passed { "ok" } else { "FAIL" };
        println!(
            "    {mark:<6}{:<28}{}  expected {}  actual {}",
            check.label,
            check.holder,
            format_units(check.expected),
            format_units(check.actual)
        );
    }
}
