//! Error types for `heistbench`
//!
//! Domain errors for the chain model, the execution engine, configuration
//! and scenarios, aggregated into [`HeistError`] with exit code mapping.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::chain::types::{Address, Amount, OperationId, Timestamp};
use crate::chain::world::AccountKind;
use crate::governance::{OperationState, Role};

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `heistbench` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution and a passing verdict
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// A transaction failed outside the attack itself (bootstrap)
    pub const EXECUTION_ERROR: i32 = 4;

    /// The verifier reported at least one failed check
    pub const VERIFICATION_FAILED: i32 = 5;

    /// Usage error (unknown scenario, missing required options)
    pub const USAGE_ERROR: i32 = 64;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `heistbench` operations.
///
/// Aggregates all domain-specific errors and maps each of them to a
/// process exit code.
#[derive(Debug, Error)]
pub enum HeistError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scenario lookup, bootstrap or verification error
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// A chain call failed
    #[error(transparent)]
    Call(#[from] CallError),

    /// Invalid command-line usage
    #[error("{0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl HeistError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Scenario(err) => err.exit_code(),
            Self::Call(_) => ExitCode::EXECUTION_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Json(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Call Errors
// ============================================================================

/// Failure of a single call frame.
///
/// A call either trips one of the execution engine's own checks or is
/// rejected by the target component it was dispatched to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Batch executor or delay queue rejected the call
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Target component rejected the call
    #[error(transparent)]
    Target(#[from] TargetError),
}

impl CallError {
    /// Follows `SubCallFailed` chains down to the failure that started them.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Execution(ExecutionError::SubCallFailed { source, .. }) => source.root_cause(),
            other => other,
        }
    }
}

/// Capability that a caller was required to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Membership in a role of the delay queue
    Role(Role),
    /// Caller-of-record must be the queue itself
    SelfCall,
    /// Caller must be the owner of the account
    Owner(Address),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => write!(f, "{role}"),
            Self::SelfCall => write!(f, "caller must be the queue itself"),
            Self::Owner(owner) => write!(f, "caller must be owner {owner}"),
        }
    }
}

/// Errors raised by the batch executor and the delay queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The unit was mutated or re-run after execution started
    #[error("unit of executor {executor} is already sealed")]
    UnitAlreadySealed {
        /// Executor that owns the sealed unit
        executor: Address,
    },

    /// A unit must contain at least one call
    #[error("call unit must contain at least one call")]
    EmptyUnit,

    /// Caller lacks the required capability
    #[error("caller {caller} lacks capability: {required}")]
    CapabilityDenied {
        /// Caller-of-record of the rejected call
        caller: Address,
        /// Capability the call required
        required: Requirement,
    },

    /// Readiness check failed
    #[error("operation {id} is not ready for execution (state: {state})")]
    NotReady {
        /// Identity of the operation
        id: OperationId,
        /// State observed by the readiness check
        state: OperationState,
    },

    /// Replay of a completed operation
    #[error("operation {id} was already executed")]
    AlreadyExecuted {
        /// Identity of the operation
        id: OperationId,
    },

    /// Scheduling an identity that the queue has already seen
    #[error("operation {id} is already known to the queue")]
    OperationAlreadyKnown {
        /// Identity of the operation
        id: OperationId,
    },

    /// Requested delay exceeds the queue's ceiling
    #[error("delay of {requested}s exceeds the maximum of {max}s")]
    DelayAboveMax {
        /// Requested delay in seconds
        requested: u64,
        /// Maximum delay in seconds
        max: u64,
    },

    /// A call inside a unit failed; the whole unit was rolled back
    #[error("call {index} failed: {source}")]
    SubCallFailed {
        /// Zero-based position of the failing call
        index: usize,
        /// The failure of that call
        source: Box<CallError>,
    },
}

/// Errors raised by target components and the chain model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// No account is deployed at the address
    #[error("no account deployed at {0}")]
    UnknownAccount(Address),

    /// The account exists but is of a different kind
    #[error("account {address} is {found}, expected {expected}")]
    UnexpectedAccount {
        /// Address that was looked up
        address: Address,
        /// Kind the caller needed
        expected: AccountKind,
        /// Kind that is actually deployed
        found: AccountKind,
    },

    /// The account does not accept calls
    #[error("account {0} does not accept calls")]
    NotCallable(Address),

    /// Payload could not be decoded by the target
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Token balance too low
    #[error("insufficient balance of {holder}: needed {needed}, available {available}")]
    InsufficientBalance {
        /// Account being debited
        holder: Address,
        /// Amount requested
        needed: Amount,
        /// Amount held
        available: Amount,
    },

    /// Token allowance too low
    #[error("insufficient allowance from {owner} to {spender}: needed {needed}, available {available}")]
    InsufficientAllowance {
        /// Token owner
        owner: Address,
        /// Spender attempting the transfer
        spender: Address,
        /// Amount requested
        needed: Amount,
        /// Amount approved
        available: Amount,
    },

    /// Native value balance too low to fund the call
    #[error("insufficient native value of {holder}: needed {needed}, available {available}")]
    InsufficientValue {
        /// Account sending the value
        holder: Address,
        /// Value attached to the call
        needed: Amount,
        /// Value held
        available: Amount,
    },

    /// Caller failed an access check of the target
    #[error("caller {caller} is not authorized: {reason}")]
    Unauthorized {
        /// Caller-of-record
        caller: Address,
        /// What the target required
        reason: &'static str,
    },

    /// Upgrade target is not an implementation account
    #[error("{0} is not a vault implementation")]
    NotAnImplementation(Address),

    /// Withdrawal above the per-call limit
    #[error("withdrawal of {requested} exceeds the limit of {limit}")]
    WithdrawalLimitExceeded {
        /// Requested amount
        requested: Amount,
        /// Per-withdrawal limit
        limit: Amount,
    },

    /// Withdrawal attempted inside the waiting period
    #[error("withdrawal not allowed before {next_allowed}")]
    WithdrawalTooSoon {
        /// Earliest timestamp a withdrawal is accepted
        next_allowed: Timestamp,
    },

    /// Re-entrant call into a non-reentrant function
    #[error("reentrant call")]
    Reentrancy,

    /// Flash loan not repaid before the window closed
    #[error("flash loan not repaid: expected balance {expected}, found {actual}")]
    RepayFailed {
        /// Balance before the loan
        expected: Amount,
        /// Balance after the arbitrary call
        actual: Amount,
    },

    /// Nested calls exceeded the depth ceiling
    #[error("call depth limit of {limit} exceeded")]
    CallDepthExceeded {
        /// Maximum nesting depth
        limit: usize,
    },
}

// ============================================================================
// Scenario Errors
// ============================================================================

/// Scenario lookup, bootstrap and verification errors.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// No built-in scenario with that name
    #[error("unknown scenario '{name}'{}", did_you_mean(.suggestion.as_deref()))]
    NotFound {
        /// Requested name
        name: String,
        /// Closest known name, if any is close enough
        suggestion: Option<String>,
    },

    /// Deploying or funding the target system failed
    #[error("bootstrap of '{scenario}' failed: {source}")]
    Bootstrap {
        /// Scenario name
        scenario: &'static str,
        /// Failing call
        source: CallError,
    },

    /// Configuration names a different scenario than the command line
    #[error("configuration is for scenario '{configured}', but '{requested}' was requested")]
    Mismatch {
        /// Scenario named in the configuration file
        configured: String,
        /// Scenario named on the command line
        requested: String,
    },

    /// The verifier reported failed checks
    #[error("verification of '{scenario}' failed: {failed} check(s) did not hold")]
    VerificationFailed {
        /// Scenario name
        scenario: &'static str,
        /// Number of failed checks
        failed: usize,
    },
}

impl ScenarioError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } | Self::Mismatch { .. } => ExitCode::USAGE_ERROR,
            Self::Bootstrap { .. } => ExitCode::EXECUTION_ERROR,
            Self::VerificationFailed { .. } => ExitCode::VERIFICATION_FAILED,
        }
    }
}

fn did_you_mean(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set ({message})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Message supplied with `${VAR:?message}`
        message: String,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "params.delay")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Validation failure that prevents the configuration from being used
    Error,
    /// Potential issue that does not prevent loading
    Warning,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `heistbench` operations.
pub type Result<T> = std::result::Result<T, HeistError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::EXECUTION_ERROR, 4);
        assert_eq!(ExitCode::VERIFICATION_FAILED, 5);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
    }

    #[test]
    fn test_call_error_exit_code() {
        let err: HeistError = CallError::from(ExecutionError::EmptyUnit).into();
        assert_eq!(err.exit_code(), ExitCode::EXECUTION_ERROR);
    }

    #[test]
    fn test_scenario_error_exit_codes() {
        let not_found: HeistError = ScenarioError::NotFound {
            name: "climbr".to_string(),
            suggestion: Some("climber".to_string()),
        }
        .into();
        assert_eq!(not_found.exit_code(), ExitCode::USAGE_ERROR);

        let failed: HeistError = ScenarioError::VerificationFailed {
            scenario: "climber",
            failed: 2,
        }
        .into();
        assert_eq!(failed.exit_code(), ExitCode::VERIFICATION_FAILED);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: HeistError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: HeistError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_not_found_display_includes_suggestion() {
        let err = ScenarioError::NotFound {
            name: "trustr".to_string(),
            suggestion: Some("truster".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unknown scenario 'trustr' (did you mean 'truster'?)"
        );

        let bare = ScenarioError::NotFound {
            name: "zzz".to_string(),
            suggestion: None,
        };
        assert_eq!(bare.to_string(), "unknown scenario 'zzz'");
    }

    #[test]
    fn test_root_cause_unwraps_nested_failures() {
        let inner = CallError::from(TargetError::Reentrancy);
        let nested = CallError::from(ExecutionError::SubCallFailed {
            index: 1,
            source: Box::new(CallError::from(ExecutionError::SubCallFailed {
                index: 0,
                source: Box::new(inner.clone()),
            })),
        });
        assert_eq!(nested.root_cause(), &inner);
    }

    #[test]
    fn test_capability_denied_display() {
        let err = ExecutionError::CapabilityDenied {
            caller: Address::ZERO,
            required: Requirement::Role(Role::Proposer),
        };
        let text = err.to_string();
        assert!(text.contains("PROPOSER_ROLE"), "{text}");
        assert!(text.contains("0x0000000000000000000000000000000000000000"));
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "params.delay".to_string(),
            message: "delay exceeds maximum".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: delay exceeds maximum at params.delay"
        );
    }

    #[test]
    fn test_validation_error_lists_issues() {
        let err = ConfigError::ValidationError {
            path: "climber.yaml".to_string(),
            errors: vec![ValidationIssue {
                path: "scenario".to_string(),
                message: "unknown scenario".to_string(),
                severity: Severity::Error,
            }],
        };
        let text = err.to_string();
        assert!(text.contains("climber.yaml"));
        assert!(text.contains("unknown scenario at scenario"));
    }
}
