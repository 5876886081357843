//! Built-in challenge scenarios
//!
//! Each scenario deploys a vulnerable system, runs the attacker's atomic
//! unit against it and checks the success condition. Default parameters
//! ship as YAML embedded in the binary, so `heistbench run climber` needs
//! no configuration file.

pub mod climber;
pub mod truster;
pub mod verifier;

use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

use crate::chain::{Address, Log};
use crate::config::{ConfigLoader, LoaderOptions, ScenarioConfig, ScenarioParams};
use crate::error::{CallError, ConfigError, HeistError, ScenarioError};
use crate::governance::ReadinessCheck;

pub use verifier::{Check, Expectation, Verdict, verify};

// ============================================================================
// Types
// ============================================================================

/// Signature of a scenario entry point.
pub type Runner = fn(&ScenarioParams) -> Result<Outcome, HeistError>;

/// A built-in scenario embedded in the binary.
pub struct BuiltinScenario {
    /// Unique identifier (kebab-case).
    pub name: &'static str,

    /// Short human-readable description.
    pub description: &'static str,

    /// Category for organization.
    pub category: ScenarioCategory,

    /// Tags for filtering.
    pub tags: &'static [&'static str],

    /// Default configuration (embedded at compile time).
    pub yaml: &'static str,

    /// Bootstrap, attack and verification.
    pub runner: Runner,
}

impl fmt::Debug for BuiltinScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinScenario")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

impl BuiltinScenario {
    /// Parses the embedded default configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the embedded YAML is invalid.
    pub fn default_config(&self) -> Result<ScenarioConfig, ConfigError> {
        let loader = ConfigLoader::new(LoaderOptions {
            embedded: true,
            ..LoaderOptions::default()
        });
        Ok(loader.load_from_str(self.yaml)?.config)
    }

    /// Runs the scenario with `params`.
    ///
    /// # Errors
    ///
    /// See [`Runner`].
    pub fn run(&self, params: &ScenarioParams) -> Result<Outcome, HeistError> {
        (self.runner)(params)
    }
}

/// Category for organizing built-in scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioCategory {
    /// Timelock and role-based governance.
    Governance,
    /// Flash-loan callbacks.
    FlashLoan,
}

impl ScenarioCategory {
    /// Returns the human-readable title-case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Governance => "Governance",
            Self::FlashLoan => "Flash loan",
        }
    }

    /// Returns all category variants in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Governance, Self::FlashLoan]
    }
}

impl fmt::Display for ScenarioCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Governance => write!(f, "governance"),
            Self::FlashLoan => write!(f, "flash-loan"),
        }
    }
}

/// A named address of a run, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub role: &'static str,
    pub address: Address,
}

impl Actor {
    #[must_use]
    pub const fn new(role: &'static str, address: Address) -> Self {
        Self { role, address }
    }
}

/// Result of one scenario run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub scenario: &'static str,
    pub actors: Vec<Actor>,
    /// Delay queue readiness policy, for scenarios that deploy one.
    pub readiness: Option<ReadinessCheck>,
    /// Whether the attacker's transactions went through.
    pub attack: Result<(), CallError>,
    pub verdict: Verdict,
    /// Chain logs emitted after bootstrap.
    pub logs: Vec<Log>,
}

// ============================================================================
// Registry
// ============================================================================

static BUILTIN_SCENARIOS: LazyLock<Vec<BuiltinScenario>> = LazyLock::new(|| {
    vec![
        BuiltinScenario {
            name: climber::NAME,
            description: "Self-scheduling timelock execution that upgrades and sweeps a vault",
            category: ScenarioCategory::Governance,
            tags: &["timelock", "upgrade", "self-call", "roles"],
            yaml: include_str!("../../scenarios/climber.yaml"),
            runner: climber::run,
        },
        BuiltinScenario {
            name: truster::NAME,
            description: "Flash-loan callback that approves the attacker for the pool balance",
            category: ScenarioCategory::FlashLoan,
            tags: &["flash-loan", "approval", "arbitrary-call"],
            yaml: include_str!("../../scenarios/truster.yaml"),
            runner: truster::run,
        },
    ]
});

/// Every built-in scenario, in registry order.
#[must_use]
pub fn builtin_scenarios() -> &'static [BuiltinScenario] {
    &BUILTIN_SCENARIOS
}

/// Find a built-in scenario by exact name.
#[must_use]
pub fn find_scenario(name: &str) -> Option<&'static BuiltinScenario> {
    BUILTIN_SCENARIOS.iter().find(|s| s.name == name)
}

/// Find a built-in scenario, or fail with a suggestion.
///
/// # Errors
///
/// Returns [`ScenarioError::NotFound`] for an unknown name.
pub fn lookup(name: &str) -> Result<&'static BuiltinScenario, ScenarioError> {
    find_scenario(name).ok_or_else(|| ScenarioError::NotFound {
        name: name.to_string(),
        suggestion: suggest_scenario(name),
    })
}

/// List all scenarios, optionally filtered by category and/or tag.
#[must_use]
pub fn list_scenarios(
    category: Option<ScenarioCategory>,
    tag: Option<&str>,
) -> Vec<&'static BuiltinScenario> {
    BUILTIN_SCENARIOS
        .iter()
        .filter(|s| category.is_none_or(|c| s.category == c))
        .filter(|s| tag.is_none_or(|t| s.tags.contains(&t)))
        .collect()
}

/// Suggest a similar scenario name for typo correction.
///
/// Returns the closest match if its Damerau-Levenshtein distance is at
/// most 3.
#[must_use]
pub fn suggest_scenario(input: &str) -> Option<String> {
    BUILTIN_SCENARIOS
        .iter()
        .map(|s| (s.name, strsim::damerau_levenshtein(input, s.name)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name.to_string())
}

/// Runs a built-in scenario by name.
///
/// # Errors
///
/// Returns [`ScenarioError::NotFound`] for an unknown name, or the
/// scenario's own bootstrap and parameter errors.
pub fn run(name: &str, params: &ScenarioParams) -> Result<Outcome, HeistError> {
    lookup(name)?.run(params)
}

/// Returns all scenario names in registry order.
#[must_use]
pub fn list_scenario_names() -> Vec<&'static str> {
    BUILTIN_SCENARIOS.iter().map(|s| s.name).collect()
}

// ============================================================================
// Tests
// ============================================================================
