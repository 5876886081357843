//! Prometheus metrics for scenario runs.
//!
//! The recorder is installed without an HTTP listener; `run --metrics-file`
//! writes the rendered exposition text after the run. Recording functions
//! are no-ops until [`init_metrics`] has been called.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::HeistError;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Account kinds that appear as the `kind` label of call metrics.
const KNOWN_KINDS: [&str; 7] = [
    "external",
    "token",
    "queue",
    "proxy",
    "implementation",
    "pool",
    "executor",
];

/// Buckets unexpected kind labels as `"__unknown__"`.
#[must_use]
pub fn sanitize_kind_label(kind: &str) -> &str {
    if KNOWN_KINDS.contains(&kind) {
        kind
    } else {
        "__unknown__"
    }
}

/// Installs the global Prometheus recorder.
///
/// Calling this more than once is harmless.
///
/// # Errors
///
/// Returns `HeistError::Io` if another recorder is already installed.
pub fn init_metrics() -> Result<(), HeistError> {
    if HANDLE.get().is_some() {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| HeistError::Io(std::io::Error::other(e.to_string())))?;
    let _ = HANDLE.set(handle);

    describe_metrics();
    Ok(())
}

/// Renders the current metrics in the Prometheus text format.
///
/// Returns `None` if [`init_metrics`] was never called.
#[must_use]
pub fn render() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(
        "heistbench_calls_total",
        "Calls dispatched to accounts, by account kind and status"
    );
    describe_counter!(
        "heistbench_units_total",
        "Atomic call units run by executors, by status"
    );
    describe_counter!(
        "heistbench_operations_total",
        "Delay queue operation transitions"
    );
    describe_counter!("heistbench_verdicts_total", "Scenario verdicts reached");
}

/// Records a dispatched call.
pub fn record_call(kind: &str, success: bool) {
    let status = if success { "success" } else { "reverted" };
    counter!(
        "heistbench_calls_total",
        "kind" => sanitize_kind_label(kind).to_owned(),
        "status" => status,
    )
    .increment(1);
}

/// Records a completed or reverted atomic unit.
pub fn record_unit(success: bool) {
    let status = if success { "success" } else { "reverted" };
    counter!("heistbench_units_total", "status" => status).increment(1);
}

/// Records a delay queue transition (`"scheduled"` or `"executed"`).
pub fn record_operation(transition: &'static str) {
    counter!("heistbench_operations_total", "transition" => transition).increment(1);
}

/// Records a scenario verdict.
pub fn record_verdict(passed: bool) {
    let result = if passed { "passed" } else { "failed" };
    counter!("heistbench_verdicts_total", "result" => result).increment(1);
}
