//! Calls and call units.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::chain::{Address, Amount, OperationId, Payload};
use crate::error::ExecutionError;

/// One `(target, value, payload)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Account the call is dispatched to.
    pub target: Address,
    /// Native value attached to the call.
    #[serde(default)]
    pub value: Amount,
    /// Encoded function invocation.
    pub payload: Payload,
}

impl Call {
    /// A call without attached value.
    #[must_use]
    pub const fn new(target: Address, payload: Payload) -> Self {
        Self {
            target,
            value: 0,
            payload,
        }
    }

    /// A call with attached native value.
    #[must_use]
    pub const fn with_value(target: Address, value: Amount, payload: Payload) -> Self {
        Self {
            target,
            value,
            payload,
        }
    }
}

/// Ordered, non-empty sequence of calls executed atomically.
///
/// The sequence cannot be modified after construction, so a unit that is
/// running is the unit that was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallUnit {
    calls: Vec<Call>,
}

impl CallUnit {
    /// Builds a unit from its calls, in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::EmptyUnit`] if `calls` is empty.
    pub fn new(calls: Vec<Call>) -> Result<Self, ExecutionError> {
        if calls.is_empty() {
            return Err(ExecutionError::EmptyUnit);
        }
        Ok(Self { calls })
    }

    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Content hash of the unit together with `salt`.
    ///
    /// Every call contributes its target, its value and its length-prefixed
    /// payload, so two units collide only if they are identical call for
    /// call. Changing the salt always changes the identity.
    #[must_use]
    pub fn operation_id(&self, salt: u64) -> OperationId {
        let mut hasher = Keccak256::new();
        hasher.update((self.calls.len() as u64).to_be_bytes());
        for call in &self.calls {
            hasher.update(call.target.as_bytes());
            hasher.update(call.value.to_be_bytes());
            hasher.update((call.payload.len() as u64).to_be_bytes());
            hasher.update(call.payload.as_bytes());
        }
        hasher.update(salt.to_be_bytes());
        OperationId::new(hasher.finalize().into())
    }
}
