//! Ban pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, GuardResult};

/// Whitespace-delimited field positions within one attempt-log line.
///
/// The log is produced by the spawn hook as `%a $(date)`, and `date`
/// output differs between operating systems, so every position is
/// configuration rather than a constant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LogLayout {
    /// Field index of the source address.
    pub address: usize,
    /// Field index of the three-letter month abbreviation.
    pub month: usize,
    /// Field index of the day of month.
    pub day: usize,
    /// Field index of the time of day (`HH:MM:SS`, optionally suffixed AM/PM).
    pub time: usize,
    /// Field index of the four-digit year.
    pub year: usize,
}

impl Default for LogLayout {
    fn default() -> Self {
        // Linux: "1.2.3.4 Fri Jun 22 21:27:36 CDT 2018"
        Self {
            address: 0,
            month: 2,
            day: 3,
            time: 4,
            year: 6,
        }
    }
}

/// Configuration for the ban pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Connection attempts allowed before a ban triggers.
    pub attempts_threshold: u32,
    /// The last `attempts_threshold` attempts must fall within this
    /// many seconds for the ban to trigger.
    pub attempts_window_secs: u64,
    /// Seconds before an inserted ban expires.
    pub ban_duration_secs: u64,
    /// Path of the append-only attempt log.
    pub attempt_log: PathBuf,
    /// Path of the access-control rule file.
    pub rule_file: PathBuf,
    /// Daemon name referenced by inserted deny rules.
    pub daemon: String,
    /// Spawn hook embedded in deny rules, so attempts from banned
    /// addresses keep feeding the attempt log.
    pub hook_command: String,
    /// Field layout of the attempt log.
    pub layout: LogLayout,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            attempts_threshold: 3,
            attempts_window_secs: 90,
            ban_duration_secs: 600, // 10 minutes
            attempt_log: PathBuf::from("/var/log/gatewarden.log"),
            rule_file: PathBuf::from("/etc/hosts.allow"),
            daemon: "sshd".to_string(),
            hook_command:
                "/bin/echo \"%a $(date)\" >> /var/log/gatewarden.log && /usr/sbin/gatewarden"
                    .to_string(),
            layout: LogLayout::default(),
        }
    }
}

impl GuardConfig {
    /// Validate threshold and timing values.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Config` when a value is out of range.
    pub fn validate(&self) -> GuardResult<()> {
        if self.attempts_threshold < 2 {
            return Err(GuardError::Config(
                "attempts_threshold must be at least 2".into(),
            ));
        }
        if self.attempts_window_secs == 0 {
            return Err(GuardError::Config(
                "attempts_window_secs must be positive".into(),
            ));
        }
        if self.ban_duration_secs == 0 {
            return Err(GuardError::Config(
                "ban_duration_secs must be positive".into(),
            ));
        }
        if self.daemon.trim().is_empty() {
            return Err(GuardError::Config("daemon must not be empty".into()));
        }
        if self.hook_command.trim().is_empty() {
            return Err(GuardError::Config("hook_command must not be empty".into()));
        }
        Ok(())
    }
}
