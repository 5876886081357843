//! In-process chain model.
//!
//! A deterministic, single-threaded stand-in for an account-based ledger:
//! accounts addressed by 20-byte identifiers, a block clock, native value
//! balances, opaque call payloads and frame-level revert.

pub mod log;
pub mod payload;
pub mod types;
pub mod world;

pub use log::{Log, LogEvent};
pub use payload::Payload;
pub use types::{Address, Amount, OperationId, Timestamp, format_units, keccak256, tokens};
pub use world::{Account, AccountKind, CallContext, Checkpoint, MAX_CALL_DEPTH, World};
