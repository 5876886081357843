//! CLI argument definitions
//!
//! All Clap derive structs for `heistbench` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::scenario::ScenarioCategory;

// ============================================================================
// Root CLI
// ============================================================================

/// Atomic exploit execution and challenge verification harness.
#[derive(Parser, Debug)]
#[command(name = "heistbench", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "HEISTBENCH_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(long, default_value = "human", global = true, env = "HEISTBENCH_LOG_FORMAT")]
    pub log_format: LogFormatChoice,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a scenario, run the attack and verify the result.
    Run(RunArgs),

    /// List built-in scenarios.
    List(ListArgs),

    /// Print the default configuration of a built-in scenario.
    Show(ShowArgs),

    /// Validate scenario configuration files without running them.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Built-in scenario name. Optional when `--config` names one.
    #[arg(required_unless_present = "config")]
    pub scenario: Option<String>,

    /// Path to a YAML scenario configuration.
    #[arg(short, long, env = "HEISTBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write JSONL events to this file (`-` for stderr).
    #[arg(long, env = "HEISTBENCH_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Write Prometheus metrics to this file after the run.
    #[arg(long, env = "HEISTBENCH_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,

    /// Output format of the run report.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by category.
    #[arg(long)]
    pub category: Option<ScenarioCategory>,

    /// Filter by tag.
    #[arg(long)]
    pub tag: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Built-in scenario name.
    pub name: String,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell.
    pub shell: Shell,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatChoice {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn run_with_scenario_name() {
        let args = run_args(&["heistbench", "run", "climber"]);
        assert_eq!(args.scenario.as_deref(), Some("climber"));
        assert!(args.config.is_none());
        assert_eq!(args.format, OutputFormat::Human);
    }

    #[test]
    fn run_with_config_only() {
        let args = run_args(&["heistbench", "run", "--config", "climber.yaml"]);
        assert!(args.scenario.is_none());
        assert_eq!(args.config, Some(PathBuf::from("climber.yaml")));
    }

    #[test]
    fn run_requires_scenario_or_config() {
        let result = Cli::try_parse_from(["heistbench", "run"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_output_options() {
        let args = run_args(&[
            "heistbench",
            "run",
            "truster",
            "--events-file",
            "events.jsonl",
            "--metrics-file",
            "metrics.prom",
            "--format",
            "json",
        ]);
        assert_eq!(args.events_file, Some(PathBuf::from("events.jsonl")));
        assert_eq!(args.metrics_file, Some(PathBuf::from("metrics.prom")));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn list_category_filter() {
        let cli = Cli::try_parse_from(["heistbench", "list", "--category", "flash-loan"]).unwrap();
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.category, Some(ScenarioCategory::FlashLoan));
    }

    #[test]
    fn validate_requires_files() {
        assert!(Cli::try_parse_from(["heistbench", "validate"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["heistbench", "list", "-vv", "--color", "never"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn help_and_version() {
        let err = Cli::try_parse_from(["heistbench", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let err = Cli::try_parse_from(["heistbench", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn completions_shells_parse() {
        for shell in ["bash", "zsh", "fish", "powershell", "elvish"] {
            assert!(Cli::try_parse_from(["heistbench", "completions", shell]).is_ok());
        }
    }
}
