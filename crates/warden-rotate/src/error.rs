//! Error types for port rotation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while rotating the listening port.
#[derive(Debug, Error)]
pub enum RotateError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The service config carries no `Port` directive.
    #[error("no Port directive found in {path}")]
    MissingPortDirective {
        /// The service config file that was scanned.
        path: PathBuf,
    },

    /// The restart command failed; the config rewrite already stands.
    #[error("restart command failed: {message}")]
    Restart {
        /// What the command reported.
        message: String,
    },
}

/// Result type for rotation operations.
pub type RotateResult<T> = Result<T, RotateError>;
