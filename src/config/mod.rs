//! Configuration module
//!
//! Loading and validation of YAML scenario files that select a built-in
//! scenario and override its deployment parameters.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::{DelaySpec, ScenarioConfig, ScenarioParams};
pub use validation::{MAX_START_TIME, ValidationResult, Validator};
