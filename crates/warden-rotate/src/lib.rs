//! # warden-rotate
//!
//! Time-of-day listening-port rotation for the login service.
//!
//! - [`schedule`] — four inclusive rotation windows that must cover the
//!   whole day exactly once.
//! - [`sshd_config`] — read and rewrite the service's `Port` directive,
//!   touching nothing else in the file.
//! - [`rotator`] — the compare-and-branch pass: map "now" to a port,
//!   rewrite the config on mismatch, restart the service.
//!
//! Rotation is idempotent: when the configured port already matches the
//! schedule, a pass performs a single read and nothing more.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod rotator;
pub mod schedule;
pub mod sshd_config;

pub use error::{RotateError, RotateResult};
pub use rotator::{PortRotator, RotationConfig, RotationOutcome};
pub use schedule::{RotationSchedule, RotationWindow};
pub use sshd_config::{apply_port, read_current_port};
