//! End-to-end tests of the `heistbench` binary.

mod common;

use common::{fixture_path, run_command, stderr, stdout};

#[test]
fn run_climber_passes() {
    let output = run_command(&["run", "climber"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.starts_with("climber: PASSED"), "{out}");
    assert!(out.contains("vault drained"), "{out}");
}

#[test]
fn run_truster_json_report() {
    let output = run_command(&["run", "truster", "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["scenario"], "truster");
    assert_eq!(report["passed"], true);
    assert_eq!(report["attack"]["success"], true);
    assert_eq!(report["checks"].as_array().unwrap().len(), 2);
    assert!(report.get("readiness").is_none());
}

#[test]
fn before_unit_config_fails_verification() {
    let config = fixture_path("climber_before_unit.yaml");
    let output = run_command(&["run", "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("FAILED"), "{out}");
    assert!(out.contains("not ready"), "{out}");
    assert!(stderr(&output).contains("verification of 'climber' failed"));
}

#[test]
fn quiet_suppresses_human_report() {
    let output = run_command(&["run", "truster", "--quiet"]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn unknown_scenario_is_usage_error_with_suggestion() {
    let output = run_command(&["run", "trustr"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("did you mean 'truster'"), "{}", stderr(&output));
}

#[test]
fn scenario_and_config_must_agree() {
    let config = fixture_path("climber_default.yaml");
    let output = run_command(&["run", "truster", "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("configuration is for scenario 'climber'"));
}

#[test]
fn invalid_config_is_config_error() {
    let config = fixture_path("delay_too_long.yaml");
    let output = run_command(&["run", "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
}

#[test]
fn missing_config_file() {
    let output = run_command(&["run", "--config", "/nonexistent/heistbench.yaml"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("file not found"));
}

#[test]
fn events_file_records_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let events = dir.path().join("events.jsonl");
    let output = run_command(&["run", "climber", "--quiet", "--events-file", events.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&events)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(lines.len() > 3);
    assert_eq!(lines[0]["type"], "ScenarioStarted");
    assert_eq!(lines[0]["readiness"], "after-unit");
    assert_eq!(lines[1]["type"], "ChainLog");
    assert_eq!(lines[lines.len() - 2]["type"], "AttackFinished");
    assert_eq!(lines[lines.len() - 1]["type"], "VerdictReached");
    assert_eq!(lines[lines.len() - 1]["passed"], true);

    let run_id = &lines[0]["run_id"];
    for (seq, line) in lines.iter().enumerate() {
        assert_eq!(line["sequence"], seq);
        assert_eq!(&line["run_id"], run_id);
    }
    assert!(
        lines
            .iter()
            .any(|l| l["type"] == "ChainLog" && l["log"]["event"] == "delay_updated")
    );
}

#[test]
fn metrics_file_has_call_counters() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = dir.path().join("metrics.prom");
    let output = run_command(&["run", "truster", "--quiet", "--metrics-file", metrics.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = std::fs::read_to_string(&metrics).unwrap();
    assert!(text.contains("heistbench_calls_total"), "{text}");
    assert!(text.contains("heistbench_verdicts_total"), "{text}");
}

#[test]
fn list_shows_both_scenarios() {
    let output = run_command(&["list"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("climber"));
    assert!(out.contains("truster"));
    assert!(out.contains("Governance"));
}

#[test]
fn list_json_filters_by_category() {
    let output = run_command(&["list", "--category", "governance", "--format", "json"]);
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "climber");
    assert_eq!(entries[0]["category"], "governance");
}

#[test]
fn show_prints_embedded_yaml() {
    let output = run_command(&["show", "truster"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("scenario: truster"));

    let output = run_command(&["show", "climbr"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("Did you mean 'climber'?"));
}

#[test]
fn version_json() {
    let output = run_command(&["version", "--format", "json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(parsed["name"], "heistbench");
}

#[test]
fn completions_generate_script() {
    let output = run_command(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("heistbench"));
}

#[test]
fn verbose_run_logs_transactions() {
    let output = run_command(&["-v", "run", "truster", "--quiet"]);
    assert!(output.status.success());
    // --quiet skips logger initialization entirely.
    assert!(stderr(&output).is_empty());

    let output = run_command(&["-v", "--color", "never", "run", "truster"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("transaction"), "{}", stderr(&output));
}
