//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod list;
pub mod run;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::HeistError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub fn dispatch(cli: Cli) -> Result<(), HeistError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cli.quiet),
        Commands::List(args) => list::list(&args),
        Commands::Show(args) => list::show(&args),
        Commands::Validate(args) => validate::validate(&args),
        Commands::Completions(args) => completions::run(&args),
        Commands::Version(args) => version::run(&args),
    }
}
