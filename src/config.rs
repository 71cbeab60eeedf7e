//! Configuration loading and management
//!
//! Handles parsing of `questlog.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::state::WEEKLY_WINDOW_DAYS;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion statistics
    #[serde(default)]
    pub stats: StatsConfig,

    /// Event stream output
    #[serde(default)]
    pub events: EventsConfig,
}

/// Statistics retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Days of per-day completion counts to keep
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// Longest per-day history worth keeping, about ten years.
pub const MAX_RETENTION_DAYS: u32 = 3650;

fn default_retention_days() -> u32 {
    30
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

/// Event stream configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Default destination: `-` for stdout or a file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl Config {
    /// Load configuration from a `questlog.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a data directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(crate::storage::CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.stats.validate()?;
        self.events.validate()?;
        Ok(())
    }
}

impl StatsConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if !(WEEKLY_WINDOW_DAYS..=MAX_RETENTION_DAYS).contains(&self.retention_days) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "stats.retention_days must be between {WEEKLY_WINDOW_DAYS} and {MAX_RETENTION_DAYS}"
            )));
        }
        Ok(())
    }
}

impl EventsConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if let Some(output) = &self.output {
            if output.trim().is_empty() {
                return Err(crate::error::Error::InvalidConfig(
                    "events.output cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
