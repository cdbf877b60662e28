mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
use mosaic::NodeConfig;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mosaic", version, about = "Septentrio mosaic GNSS receiver driver")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// JSON configuration file.
    #[arg(long, value_name = "FILE", env = "MOSAIC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr). Defaults to `debug` when the configuration
    /// sets `debug`, `info` otherwise.
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(NodeConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            let err = exit::config_error(err);
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    };
    init_logging(cli.log_format, LogLevel::resolve(cli.log_level, config.debug));

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format, config);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
