//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;

/// Foreground application usage agent.
///
/// Samples the focused application at a fixed interval, skips idle periods,
/// and periodically reports per-application usage time to a collector.
/// Runs until interrupted; no arguments are required.
#[derive(Debug, Parser)]
#[command(name = "usage-agent", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Validate the configuration, print it with secrets redacted, and exit.
    #[arg(long)]
    pub check_config: bool,
}
