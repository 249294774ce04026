//! Process-wide configuration.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use warden_guard::GuardConfig;
use warden_rotate::RotationConfig;

/// Full gatewarden configuration, loaded once at startup and passed
/// down explicitly; never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ban pipeline settings.
    pub guard: GuardConfig,
    /// Port rotation settings.
    pub rotation: RotationConfig,
}

impl AppConfig {
    /// Load and validate configuration from a JSON file.
    ///
    /// Absent fields fall back to their defaults, so a minimal config
    /// file only overrides what differs from stock.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, or when either
    /// section fails validation.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config
            .guard
            .validate()
            .context("invalid guard configuration")?;
        config
            .rotation
            .validate()
            .context("invalid rotation configuration")?;
        Ok(config)
    }
}
