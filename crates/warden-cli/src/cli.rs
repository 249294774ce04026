//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Gatewarden - brute-force banning and port rotation for a
/// TCP-wrapped login service.
#[derive(Parser, Debug, Clone)]
#[command(name = "gatewarden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path of the JSON configuration file.
    #[arg(
        short,
        long,
        env = "GATEWARDEN_CONFIG",
        default_value = "/etc/gatewarden.json"
    )]
    pub config: PathBuf,

    /// Subcommand to execute; defaults to `run`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Evaluate the latest connection attempt, then rotate the port.
    ///
    /// This is what the spawn hook invokes; it is the default when no
    /// subcommand is given.
    Run,

    /// Sweep expired ban rules only.
    Sweep,

    /// List active ban rules.
    Status,

    /// Run the port-rotation pass only.
    Rotate,
}

impl Cli {
    /// The effective subcommand (`run` when none was given).
    #[must_use]
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
