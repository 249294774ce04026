//! # warden-guard
//!
//! Brute-force ban pipeline for a TCP-wrapped login service.
//!
//! The pipeline runs once per connection attempt, invoked by the spawn
//! hook in the access-control file:
//!
//! - [`log_reader`] — parses the append-only attempt log into
//!   per-source history, self-healing 12-hour timestamps on the final
//!   line.
//! - [`window`] — decides whether the last N attempts from the
//!   triggering address fit inside the configured time budget.
//! - [`ban_store`] — inserts managed deny blocks into the rule file and
//!   sweeps expired ones with an atomic temp-file rewrite.
//! - [`controller`] — wires the three together; every run ends with an
//!   expire scan.
//!
//! All durable state lives in the attempt log and the rule file; each
//! invocation re-derives everything from disk, so overlapping
//! invocations can race (see the expire-scan docs for the guarantees
//! actually provided).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ban_store;
pub mod config;
pub mod controller;
pub mod error;
mod fsutil;
pub mod log_reader;
pub mod window;

pub use ban_store::{BanRule, BanStore};
pub use config::{GuardConfig, LogLayout};
pub use controller::{BanController, EvaluationOutcome, RunReport};
pub use error::{GuardError, GuardResult};
pub use log_reader::{read_attempt_log, AttemptHistory, AttemptRecord, ReadOutcome};
pub use window::{approx_secs, evaluate, WindowVerdict};
