//! Port rotation orchestration.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RotateError, RotateResult};
use crate::schedule::RotationSchedule;
use crate::sshd_config::{apply_port, read_current_port};

/// Configuration for the port-rotation subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Whether rotation runs at all.
    pub enabled: bool,
    /// The login service's configuration file.
    pub service_config: PathBuf,
    /// Command argv used to restart the login service.
    pub restart_command: Vec<String>,
    /// Time-of-day schedule.
    pub schedule: RotationSchedule,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_config: PathBuf::from("/etc/ssh/sshd_config"),
            restart_command: vec!["systemctl".into(), "restart".into(), "sshd".into()],
            schedule: RotationSchedule::default(),
        }
    }
}

impl RotationConfig {
    /// Validate the schedule and restart command.
    ///
    /// A disabled subsystem validates trivially, so a config file can
    /// carry a half-filled rotation section while rotation is off.
    ///
    /// # Errors
    ///
    /// Returns `RotateError::Config` describing the first violation.
    pub fn validate(&self) -> RotateResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.restart_command.is_empty() {
            return Err(RotateError::Config("restart_command must not be empty".into()));
        }
        self.schedule.validate()
    }
}

/// Outcome of one rotation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Rotation is disabled in configuration.
    Disabled,
    /// The configured port already matches the schedule; nothing was
    /// written and nothing restarted.
    AlreadyCorrect {
        /// The current (and correct) port.
        port: String,
    },
    /// The port was rewritten and the service restarted.
    Rotated {
        /// Port before the rewrite.
        from: String,
        /// Port now configured.
        to: String,
    },
}

/// Compares the configured port with the schedule and applies changes.
#[derive(Debug)]
pub struct PortRotator {
    config: RotationConfig,
}

impl PortRotator {
    /// Create a rotator from validated configuration.
    #[must_use]
    pub const fn new(config: RotationConfig) -> Self {
        Self { config }
    }

    /// Run one compare-and-branch rotation pass.
    ///
    /// When the service config is rewritten but the restart command
    /// fails, the rewrite is not rolled back; the error reports the
    /// divergence and the next pass reconciles it.
    ///
    /// # Errors
    ///
    /// Returns `RotateError::Io`/`MissingPortDirective` for config file
    /// problems and `RotateError::Restart` for a failed restart.
    pub fn rotate(&self, now: NaiveTime) -> RotateResult<RotationOutcome> {
        if !self.config.enabled {
            debug!("port rotation disabled");
            return Ok(RotationOutcome::Disabled);
        }
        let current = read_current_port(&self.config.service_config)?;
        let Some(desired) = self.config.schedule.port_for(now) else {
            return Err(RotateError::Config(format!(
                "no rotation window covers {now}"
            )));
        };
        if current == desired {
            debug!(port = %current, "port already matches schedule");
            return Ok(RotationOutcome::AlreadyCorrect { port: current });
        }
        apply_port(&self.config.service_config, desired)?;
        self.restart_service()?;
        info!(from = %current, to = %desired, "listening port rotated");
        Ok(RotationOutcome::Rotated {
            from: current,
            to: desired.to_string(),
        })
    }

    fn restart_service(&self) -> RotateResult<()> {
        let Some((program, args)) = self.config.restart_command.split_first() else {
            return Err(RotateError::Config("restart_command must not be empty".into()));
        };
        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| RotateError::Restart {
                message: format!("failed to spawn {program}: {e}"),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotateError::Restart {
                message: format!("{program} exited with {}: {}", output.status, stderr.trim()),
            });
        }
        info!(command = %program, "login service restarted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn config_with(dir: &tempfile::TempDir, port: &str, restart: &[&str]) -> RotationConfig {
        let service_config = dir.path().join("sshd_config");
        fs::write(&service_config, format!("Port {port}\n")).unwrap();
        RotationConfig {
            enabled: true,
            service_config,
            restart_command: restart.iter().map(|s| (*s).to_string()).collect(),
            schedule: RotationSchedule::default(),
        }
    }

    #[test]
    fn test_disabled_rotation_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let config = RotationConfig {
            enabled: false,
            ..config_with(&dir, "922", &["false"])
        };
        let rotator = PortRotator::new(config);
        assert_eq!(
            rotator.rotate(hms(7, 0, 0)).unwrap(),
            RotationOutcome::Disabled
        );
    }

    #[test]
    fn test_matching_port_means_no_rewrite_and_no_restart() {
        let dir = tempfile::tempdir().unwrap();
        // "false" as restart command: a restart attempt would error.
        let config = config_with(&dir, "922", &["false"]);
        let path = config.service_config.clone();
        let rotator = PortRotator::new(config);

        // 07:00 maps to the second window, port 922.
        let outcome = rotator.rotate(hms(7, 0, 0)).unwrap();

        assert_eq!(outcome, RotationOutcome::AlreadyCorrect { port: "922".into() });
        assert_eq!(fs::read_to_string(&path).unwrap(), "Port 922\n");
    }

    #[test]
    fn test_mismatched_port_rewrites_and_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(&dir, "922", &["true"]);
        let path = config.service_config.clone();
        let rotator = PortRotator::new(config);

        // 13:00 maps to the third window, port 923.
        let outcome = rotator.rotate(hms(13, 0, 0)).unwrap();

        assert_eq!(
            outcome,
            RotationOutcome::Rotated {
                from: "922".into(),
                to: "923".into(),
            }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "Port 923\n");
    }

    #[test]
    fn test_failed_restart_reports_but_keeps_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(&dir, "922", &["false"]);
        let path = config.service_config.clone();
        let rotator = PortRotator::new(config);

        let err = rotator.rotate(hms(13, 0, 0));

        assert!(matches!(err, Err(RotateError::Restart { .. })));
        // The rewrite stands; config and running service now diverge
        // until the next successful pass.
        assert_eq!(fs::read_to_string(&path).unwrap(), "Port 923\n");
    }

    #[test]
    fn test_missing_restart_binary_is_restart_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(&dir, "922", &["/nonexistent/restarter"]);
        let rotator = PortRotator::new(config);

        assert!(matches!(
            rotator.rotate(hms(13, 0, 0)),
            Err(RotateError::Restart { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_restart_command() {
        let dir = tempfile::tempdir().unwrap();
        let config = RotationConfig {
            restart_command: vec![],
            ..config_with(&dir, "922", &[])
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_config_skips_validation() {
        let config = RotationConfig {
            enabled: false,
            restart_command: vec![],
            ..RotationConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(RotationConfig::default().validate().is_ok());
    }
}
