//! Timelocked governance: the delay queue and its role capability set.

pub mod queue;
pub mod roles;

pub use queue::{
    DelayQueue, MAX_DELAY, OperationRecord, OperationState, QueueCall, ReadinessCheck,
};
pub use roles::{Role, RoleSet};
