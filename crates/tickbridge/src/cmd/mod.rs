use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use tickbridge_bridge::{BridgeMode, DEFAULT_THROTTLE_THRESHOLD};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod catalog;
pub mod inspect;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a multiplexed frame or channel blob and print its records.
    Inspect(InspectArgs),
    /// List every known event kind.
    Catalog(CatalogArgs),
    /// Drive a bridge with a demo worker and report its counters.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Inspect(args) => inspect::run(args, format),
        Command::Catalog(args) => catalog::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// File holding one frame (or one channel blob with --channel-blob).
    pub file: PathBuf,
    /// Treat the file as a single channel blob rather than a combined frame.
    #[arg(long)]
    pub channel_blob: bool,
    /// Only show these channels (comma-separated ids).
    #[arg(long, value_delimiter = ',', conflicts_with = "channel_blob")]
    pub channels: Option<Vec<u32>>,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Only list kinds in this category (e.g. sprite, audio).
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ModeArg {
    Direct,
    Pipelined,
}

impl From<ModeArg> for BridgeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Direct => BridgeMode::Direct,
            ModeArg::Pipelined => BridgeMode::Pipelined,
        }
    }
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of driver frames to submit.
    #[arg(long, default_value = "120")]
    pub frames: u32,
    /// Where the worker runs.
    #[arg(long, value_enum, default_value = "pipelined", env = "TICKBRIDGE_MODE")]
    pub mode: ModeArg,
    /// Frames the worker may lag before submit blocks.
    #[arg(long, default_value_t = DEFAULT_THROTTLE_THRESHOLD, env = "TICKBRIDGE_THROTTLE")]
    pub throttle: usize,
    /// Extra time the demo worker spends on each frame.
    #[arg(long, default_value = "0")]
    pub worker_delay_ms: u64,
    /// Driver frame period; 0 submits as fast as possible.
    #[arg(long, default_value = "0")]
    pub frame_interval_ms: u64,
    /// Write the last non-empty output frame to this file.
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
