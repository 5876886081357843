//! Batch executor account and the shared atomic unit runner.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chain::{Address, Amount, CallContext, LogEvent, Payload, World};
use crate::error::{CallError, ExecutionError, Requirement};
use crate::exec::unit::{Call, CallUnit};
use crate::observability::metrics;

/// Runs every call of `unit` in order with `caller` as caller-of-record.
///
/// Effects of earlier calls are visible to later ones. If any call fails
/// the world is restored to its state before call 0 and the failure is
/// reported with the index of the failing call.
///
/// # Errors
///
/// Returns [`ExecutionError::SubCallFailed`] for the first failing call.
pub fn run_unit(
    world: &mut World,
    caller: Address,
    unit: &CallUnit,
) -> Result<Vec<Payload>, ExecutionError> {
    let span = tracing::debug_span!("unit", %caller, calls = unit.len());
    let _guard = span.enter();

    let checkpoint = world.checkpoint();
    let mut results = Vec::with_capacity(unit.len());
    for (index, call) in unit.calls().iter().enumerate() {
        match world.call(caller, call.target, call.value, &call.payload) {
            Ok(ret) => results.push(ret),
            Err(source) => {
                world.revert_to(checkpoint);
                warn!(index, error = %source, "unit aborted, all calls reverted");
                metrics::record_unit(false);
                return Err(ExecutionError::SubCallFailed {
                    index,
                    source: Box::new(source),
                });
            }
        }
    }
    debug!("unit completed");
    metrics::record_unit(true);
    Ok(results)
}

/// Functions exposed by a [`BatchExecutor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutorCall {
    /// Appends a call to the pending unit. Owner only.
    AddCall {
        target: Address,
        #[serde(default)]
        value: Amount,
        payload: Payload,
    },
    /// Seals the pending unit and runs it. Anyone may trigger this.
    Run,
    /// Returns the pending calls.
    Pending,
    /// Returns the owner.
    Owner,
}

/// Account that collects calls from its owner and runs them as one
/// atomic unit, acting as caller-of-record for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchExecutor {
    owner: Address,
    pending: Vec<Call>,
    sealed: bool,
}

impl BatchExecutor {
    /// An empty, unsealed executor controlled by `owner`.
    #[must_use]
    pub const fn new(owner: Address) -> Self {
        Self {
            owner,
            pending: Vec::new(),
            sealed: false,
        }
    }

    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn pending(&self) -> &[Call] {
        &self.pending
    }

    /// Whether `run` has started; a sealed unit can no longer change.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn handle(
        world: &mut World,
        ctx: &CallContext,
        payload: &Payload,
    ) -> Result<Payload, CallError> {
        match payload.decode::<ExecutorCall>()? {
            ExecutorCall::AddCall {
                target,
                value,
                payload,
            } => {
                let executor = world.executor_mut(ctx.this)?;
                if executor.sealed {
                    return Err(ExecutionError::UnitAlreadySealed {
                        executor: ctx.this,
                    }
                    .into());
                }
                if ctx.caller != executor.owner {
                    return Err(ExecutionError::CapabilityDenied {
                        caller: ctx.caller,
                        required: Requirement::Owner(executor.owner),
                    }
                    .into());
                }
                executor.pending.push(Call::with_value(target, value, payload));
                let index = executor.pending.len() - 1;
                world.emit(ctx.this, LogEvent::CallAppended { index, target });
                Ok(Payload::empty())
            }
            ExecutorCall::Run => {
                let executor = world.executor_mut(ctx.this)?;
                if executor.sealed {
                    return Err(ExecutionError::UnitAlreadySealed {
                        executor: ctx.this,
                    }
                    .into());
                }
                executor.sealed = true;
                let unit = CallUnit::new(executor.pending.clone())?;
                world.emit(ctx.this, LogEvent::UnitSealed { calls: unit.len() });
                let results = run_unit(world, ctx.this, &unit)?;
                Ok(Payload::encode(&results))
            }
            ExecutorCall::Pending => Ok(Payload::encode(&world.executor(ctx.this)?.pending)),
            ExecutorCall::Owner => Ok(Payload::encode(&world.executor(ctx.this)?.owner)),
        }
    }
}
