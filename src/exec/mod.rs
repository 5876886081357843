//! Atomic multi-call execution.
//!
//! [`CallUnit`] is the ordered sequence of calls, [`run_unit`] executes one
//! with all-or-nothing semantics, and [`BatchExecutor`] is the on-chain
//! account an attacker fills and triggers.

pub mod batch;
pub mod unit;

pub use batch::{BatchExecutor, ExecutorCall, run_unit};
pub use unit::{Call, CallUnit};
