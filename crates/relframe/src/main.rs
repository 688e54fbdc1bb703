mod args;
mod commands;

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use args::OutputFormat;
use commands::Commands;
use relframe_core::config::session::SessionConfig;
use relframe_error::Result;
use tracing::debug;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LoggingMode {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl From<LoggingMode> for logutil::LoggingMode {
    fn from(mode: LoggingMode) -> Self {
        match mode {
            LoggingMode::Pretty => logutil::LoggingMode::Pretty,
            LoggingMode::Json => logutil::LoggingMode::Json,
            LoggingMode::Compact => logutil::LoggingMode::Compact,
        }
    }
}

#[derive(Parser)]
#[clap(name = "relframe")]
#[clap(version)]
#[clap(about = "Relational operations over CSV files", long_about = None)]
struct Cli {
    /// Log verbosity.
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Format of log output.
    #[clap(long, value_enum, global = true)]
    log_mode: Option<LoggingMode>,

    /// Session settings as `name=value`, e.g. `display_max_rows=50`.
    #[clap(long = "set", value_name = "NAME=VALUE", value_parser = args::parse_setting, global = true)]
    settings: Vec<(String, String)>,

    /// Output format.
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    output: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logutil::init(cli.verbose, cli.log_mode.unwrap_or_default().into());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = SessionConfig::default();
    for (name, value) in &cli.settings {
        config.set_from_str(name, value)?;
    }
    debug!(?config, "session config");

    cli.command.run(&config, cli.output)
}
