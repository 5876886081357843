//! Post-execution balance checks.

use serde::Serialize;
use tracing::info;

use crate::chain::{Address, Amount, World};
use crate::error::TargetError;
use crate::observability::metrics;
use crate::targets::token::balance_of;

/// Expected token balance of one holder after the attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expectation {
    /// Short description, e.g. "vault drained".
    pub label: &'static str,
    pub token: Address,
    pub holder: Address,
    pub expected: Amount,
}

/// Outcome of one expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub label: &'static str,
    pub holder: Address,
    pub expected: Amount,
    pub actual: Amount,
    pub passed: bool,
}

/// All checks of a run. Passes only if every check passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    pub checks: Vec<Check>,
}

impl Verdict {
    /// Number of failed checks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }
}

/// Reads the final balances and compares them to `expectations`.
///
/// # Errors
///
/// Fails if an expectation names a token that is not deployed.
pub fn verify(world: &World, expectations: &[Expectation]) -> Result<Verdict, TargetError> {
    let checks = expectations
        .iter()
        .map(|e| {
            let actual = balance_of(world, e.token, e.holder)?;
            Ok(Check {
                label: e.label,
                holder: e.holder,
                expected: e.expected,
                actual,
                passed: actual == e.expected,
            })
        })
        .collect::<Result<Vec<_>, TargetError>>()?;

    let passed = checks.iter().all(|c| c.passed);
    metrics::record_verdict(passed);
    info!(passed, checks = checks.len(), "verdict reached");
    Ok(Verdict { passed, checks })
}
