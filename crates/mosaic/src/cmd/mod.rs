use std::path::PathBuf;

use clap::{Args, Subcommand};
use mosaic::link::DEFAULT_READ_CHUNK_SIZE;
use mosaic::NodeConfig;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to the receiver and publish decoded messages until Ctrl-C.
    Run(RunArgs),
    /// Decode a recorded receiver stream and print its messages.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: NodeConfig) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format, config),
        Command::Decode(args) => decode::run(args, format, &config),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Serial device path or tcp://host:port. Overrides `device`.
    #[arg(long, env = "MOSAIC_DEVICE")]
    pub device: Option<String>,
    /// Serial baud rate. Overrides `serial.baudrate`.
    #[arg(long)]
    pub baudrate: Option<u32>,
    /// Seconds between reconnection attempts. Overrides `reconnect_delay_s`.
    #[arg(long, value_name = "SECONDS")]
    pub reconnect_delay: Option<f64>,
    /// Frame label for published records. Overrides `frame_id`.
    #[arg(long)]
    pub frame_id: Option<String>,
}

impl RunArgs {
    /// Apply command-line overrides on top of the file configuration.
    pub fn apply(self, config: &mut NodeConfig) {
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(baudrate) = self.baudrate {
            config.serial.baudrate = baudrate;
        }
        if let Some(delay) = self.reconnect_delay {
            config.reconnect_delay_s = delay;
        }
        if let Some(frame_id) = self.frame_id {
            config.frame_id = frame_id;
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding raw bytes captured from the receiver.
    pub path: PathBuf,
    /// Also print frames that failed their checksum.
    #[arg(long)]
    pub all: bool,
    /// Feed the decoder this many bytes at a time.
    #[arg(
        long,
        default_value_t = DEFAULT_READ_CHUNK_SIZE as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub chunk_size: u64,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
