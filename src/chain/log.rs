//! Chain event log.
//!
//! Components append [`Log`] entries while handling a call. Entries are part
//! of the world state, so a reverted frame or unit takes its logs with it.

use serde::Serialize;

use crate::chain::types::{Address, Amount, OperationId, Timestamp};
use crate::governance::Role;

/// One log entry, attributed to the account that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Log {
    /// Emitting account.
    pub emitter: Address,
    /// What happened.
    #[serde(flatten)]
    pub event: LogEvent,
}

/// Events emitted by components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    /// Token balance moved.
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    /// Allowance set.
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    RoleGranted {
        role: Role,
        account: Address,
        sender: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
        sender: Address,
    },
    DelayUpdated {
        old_delay: u64,
        new_delay: u64,
    },
    OperationScheduled {
        id: OperationId,
        calls: usize,
        scheduled_at: Timestamp,
    },
    OperationExecuted {
        id: OperationId,
    },
    /// Proxy implementation swapped.
    Upgraded {
        implementation: Address,
    },
    OwnershipTransferred {
        previous: Address,
        new_owner: Address,
    },
    FlashLoan {
        borrower: Address,
        amount: Amount,
    },
    /// Executor owner appended a call to the pending unit.
    CallAppended {
        index: usize,
        target: Address,
    },
    /// Executor sealed its unit and started running it.
    UnitSealed {
        calls: usize,
    },
}

impl LogEvent {
    /// Short snake-case name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "transfer",
            Self::Approval { .. } => "approval",
            Self::RoleGranted { .. } => "role_granted",
            Self::RoleRevoked { .. } => "role_revoked",
            Self::DelayUpdated { .. } => "delay_updated",
            Self::OperationScheduled { .. } => "operation_scheduled",
            Self::OperationExecuted { .. } => "operation_executed",
            Self::Upgraded { .. } => "upgraded",
            Self::OwnershipTransferred { .. } => "ownership_transferred",
            Self::FlashLoan { .. } => "flash_loan",
            Self::CallAppended { .. } => "call_appended",
            Self::UnitSealed { .. } => "unit_sealed",
        }
    }
}
