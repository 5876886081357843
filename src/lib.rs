//! `heistbench` - atomic exploit execution and challenge verification
//!
//! An in-process chain model with an atomic multi-call batch executor, a
//! role-gated delay queue, and the target components of two reference
//! challenges. Each built-in scenario bootstraps its target system, runs the
//! attacker's unit against it and verifies the final balances.

pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod governance;
pub mod observability;
pub mod scenario;
pub mod targets;
