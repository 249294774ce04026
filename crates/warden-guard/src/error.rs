//! Error types for the ban pipeline.

use thiserror::Error;

/// Errors that can occur while reading the attempt log or maintaining
/// the rule file.
#[derive(Debug, Error)]
pub enum GuardError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log line does not match the configured column layout.
    #[error("malformed attempt record at line {line}: {reason}")]
    MalformedRecord {
        /// One-based line number in the attempt log.
        line: usize,
        /// What failed to parse.
        reason: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for ban pipeline operations.
pub type GuardResult<T> = Result<T, GuardError>;
