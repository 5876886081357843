//! Command-line interface
//!
//! Argument definitions and command handlers for the `heistbench` binary.

pub mod args;
pub mod commands;
