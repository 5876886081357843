//! `heistbench` - atomic exploit execution and challenge verification

use clap::Parser;

use heistbench::cli::args::{Cli, LogFormatChoice};
use heistbench::cli::commands;
use heistbench::error::ExitCode;
use heistbench::observability::{LogFormat, init_logging};

fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let format = match cli.log_format {
            LogFormatChoice::Human => LogFormat::Human,
            LogFormatChoice::Json => LogFormat::Json,
        };
        init_logging(format, cli.verbose, cli.color);
    }

    match commands::dispatch(cli) {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
