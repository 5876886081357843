//! Configuration schema.
//!
//! A scenario file names one built-in scenario and optionally overrides its
//! deployment parameters:
//!
//! ```yaml
//! scenario: climber
//! params:
//!   delay: 1h
//!   readiness: after-unit
//!   target_tokens: 10000000
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::governance::ReadinessCheck;

/// Top-level scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Name of the built-in scenario to run.
    pub scenario: String,

    /// Optional description shown by `validate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Deployment parameters; unset fields keep the scenario defaults.
    #[serde(default)]
    pub params: ScenarioParams,
}

/// Overridable deployment parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioParams {
    /// Delay queue delay, as seconds or a human duration (`1h`, `90m`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelaySpec>,

    /// When the delay queue checks readiness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness: Option<ReadinessCheck>,

    /// Whole tokens held by the target (vault or pool).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tokens: Option<u64>,

    /// Chain clock at deployment, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
}

/// A delay given either as plain seconds or as a `humantime` duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DelaySpec {
    Seconds(u64),
    Human(String),
}

impl DelaySpec {
    /// The delay in whole seconds.
    ///
    /// # Errors
    ///
    /// Returns the parser error if a human duration is malformed.
    pub fn as_secs(&self) -> Result<u64, humantime::DurationError> {
        match self {
            Self::Seconds(secs) => Ok(*secs),
            Self::Human(text) => humantime::parse_duration(text).map(|d: Duration| d.as_secs()),
        }
    }
}

impl fmt::Display for DelaySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(secs) => write!(f, "{secs}s"),
            Self::Human(text) => f.write_str(text),
        }
    }
}
