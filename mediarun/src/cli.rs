use std::path::PathBuf;

use clap::Parser;

/// Runs a media pipeline described by a `RuntimeConfig` JSON file (spec §6,
/// §9): demuxes an MPEG-TS input, optionally resynchronizes it through the
/// TimeRectifier, and/or exercises the Dasher against synthetic
/// representation sources.
#[derive(Debug, Parser)]
#[command(name = "mediarun", version, about)]
pub struct CliArgs {
    /// Path to the RuntimeConfig JSON file.
    #[arg(long, short = 'c')]
    pub config: PathBuf,

    /// Raise the log level to DEBUG regardless of `RUST_LOG`.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
