//! Tracing subscriber setup.
//!
//! Engine diagnostics go to stderr so that stdout stays reserved for the run
//! report. The crate's own spans get one level more detail than its
//! dependencies at every verbosity step.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::cli::args::ColorChoice;

/// Environment variable holding a full `EnvFilter` directive; it replaces
/// the `-v` derived filter when set.
pub const LOG_LEVEL_ENV: &str = "HEISTBENCH_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Filter directive for a `-v` count.
///
/// Dependencies stay one level quieter than `heistbench`; the count
/// saturates at three.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,heistbench=info",
        2 => "info,heistbench=debug",
        _ => "debug,heistbench=trace",
    }
}

fn wants_ansi(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        }
    }
}

/// Installs the global subscriber. A second call is a no-op.
///
/// At trace verbosity, closing `transaction` and `unit` spans are logged with
/// their busy time.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));
    let span_events = if verbosity >= 3 {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Human => builder.with_ansi(wants_ansi(color)).try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
}
