//! # warden-cli
//!
//! Library half of the `gatewarden` binary: argument parsing,
//! configuration loading, and the per-subcommand entry points used by
//! `main`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Commands};
pub use config::AppConfig;
