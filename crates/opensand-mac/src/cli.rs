//! Command-line surface for the demo runner.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "opensand-mac",
    version,
    author,
    about = "Run a small return-link MAC simulation over opensand-core"
)]
pub struct Options {
    /// Path to the TOML configuration (superframe timing, carriers plan,
    /// DAMA and Slotted-Aloha parameters).
    #[arg(short, long)]
    pub config: PathBuf,

    /// Number of synthetic ST terminals to simulate against the first
    /// configured spot.
    #[arg(short, long, default_value = "4")]
    pub terminals: u16,

    /// Stop after this many superframes; runs until Ctrl-C if unset.
    #[arg(short, long, default_value=None)]
    pub superframes: Option<u32>,

    /// Port for the REST status endpoint (on 0.0.0.0); no server if unset.
    #[arg(long, default_value=None)]
    pub serve_port: Option<u16>,

    /// Lower the default log level to debug.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,
}
