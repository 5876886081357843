//! `list` and `show` command handlers.

use std::fmt::Write as _;

use crate::cli::args::{ListArgs, OutputFormat, ShowArgs};
use crate::error::HeistError;
use crate::scenario::{self, ScenarioCategory};

/// List built-in scenarios, grouped by category (human) or as a JSON array.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn list(args: &ListArgs) -> Result<(), HeistError> {
    let results = scenario::list_scenarios(args.category, args.tag.as_deref());

    match args.format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = results
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "description": s.description,
                        "category": s.category.to_string(),
                        "tags": s.tags,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Human => {
            if results.is_empty() {
                println!("No scenarios match the given filters.");
                return Ok(());
            }

            println!("Built-in Scenarios ({} available)\n", results.len());
            for cat in ScenarioCategory::all() {
                let in_cat: Vec<_> = results.iter().filter(|s| s.category == *cat).collect();
                if in_cat.is_empty() {
                    continue;
                }

                println!("  {}", cat.label());
                for s in in_cat {
                    let tags = format!("[{}]", s.tags.join(", "));
                    println!("    {:<12}{:<72}{tags}", s.name, s.description);
                }
                println!();
            }

            println!("Run a scenario: heistbench run <name>");
            println!("View defaults:  heistbench show <name>");
        }
    }

    Ok(())
}

/// Print the embedded default configuration of a scenario, suitable for
/// piping into a file and editing.
///
/// # Errors
///
/// Returns a usage error listing the known scenarios if the name is unknown.
pub fn show(args: &ShowArgs) -> Result<(), HeistError> {
    let found = scenario::find_scenario(&args.name).ok_or_else(|| {
        let mut message = format!("unknown scenario '{}'", args.name);

        if let Some(suggestion) = scenario::suggest_scenario(&args.name) {
            let _ = write!(message, "\n\nDid you mean '{suggestion}'?");
        }

        message.push_str("\n\nAvailable scenarios:");
        for s in scenario::builtin_scenarios() {
            let _ = write!(message, "\n  {:<12}{}", s.name, s.description);
        }
        HeistError::Usage(message)
    })?;

    print!("{}", found.yaml);
    Ok(())
}
