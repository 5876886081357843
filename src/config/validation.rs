//! Configuration validation
//!
//! Semantic checks on a deserialized [`ScenarioConfig`]. All issues are
//! collected rather than stopping at the first one.

use crate::config::schema::ScenarioConfig;
use crate::error::{Severity, ValidationIssue};
use crate::governance::{MAX_DELAY, ReadinessCheck};
use crate::scenario::{ScenarioCategory, find_scenario, suggest_scenario};

/// Latest accepted `start_time` (9999-12-31T23:59:59Z).
pub const MAX_START_TIME: u64 = 253_402_300_799;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &ScenarioConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_scenario_name(config);
        self.validate_params(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Checks
    // ========================================================================

    fn validate_scenario_name(&mut self, config: &ScenarioConfig) {
        if config.scenario.is_empty() {
            self.add_error("scenario", "Scenario name is required and cannot be empty");
            return;
        }
        if find_scenario(&config.scenario).is_none() {
            let message = suggest_scenario(&config.scenario).map_or_else(
                || format!("Unknown scenario '{}'", config.scenario),
                |s| format!("Unknown scenario '{}' (did you mean '{s}'?)", config.scenario),
            );
            self.add_error("scenario", message);
        }
    }

    fn validate_params(&mut self, config: &ScenarioConfig) {
        let params = &config.params;
        let category = find_scenario(&config.scenario).map(|s| s.category);

        if let Some(delay) = &params.delay {
            match delay.as_secs() {
                Ok(secs) if secs > MAX_DELAY => self.add_error(
                    "params.delay",
                    format!("Delay of {secs}s exceeds the maximum of {MAX_DELAY}s"),
                ),
                Ok(_) => {}
                Err(e) => self.add_error("params.delay", format!("Invalid duration '{delay}': {e}")),
            }
        }

        if category == Some(ScenarioCategory::FlashLoan) {
            if params.delay.is_some() {
                self.add_warning("params.delay", "Ignored: scenario has no delay queue");
            }
            if params.readiness.is_some() {
                self.add_warning("params.readiness", "Ignored: scenario has no delay queue");
            }
        }

        if category == Some(ScenarioCategory::Governance)
            && params.readiness == Some(ReadinessCheck::BeforeUnit)
        {
            self.add_warning(
                "params.readiness",
                "With before-unit readiness the self-scheduling takeover is expected to fail",
            );
        }

        if let Some(start) = params.start_time.filter(|t| *t > MAX_START_TIME) {
            self.add_error(
                "params.start_time",
                format!("Start time {start} is after the latest supported {MAX_START_TIME}"),
            );
        }

        if params.target_tokens == Some(0) {
            self.add_warning(
                "params.target_tokens",
                "Target holds no tokens; verification passes trivially",
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
