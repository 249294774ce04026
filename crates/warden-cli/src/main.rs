//! Gatewarden binary entrypoint.
//!
//! This is the main entry point for the `gatewarden` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use warden_cli::cli::{Cli, Commands};
use warden_cli::{commands, AppConfig};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let now = chrono::Local::now().naive_local();

    match cli.command() {
        Commands::Run => commands::run(&config, now),
        Commands::Sweep => commands::sweep(&config, now),
        Commands::Status => commands::status(&config, now),
        Commands::Rotate => commands::rotate(&config, now.time()),
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_default_run() {
        let cli = Cli::parse_from(["gatewarden"]);
        assert_eq!(cli.command(), Commands::Run);
    }

    #[test]
    fn cli_respects_config_env_style_flag() {
        let cli = Cli::parse_from(["gatewarden", "--config", "/tmp/gw.json", "status"]);
        assert_eq!(cli.config, std::path::PathBuf::from("/tmp/gw.json"));
        assert_eq!(cli.command(), Commands::Status);
    }
}
