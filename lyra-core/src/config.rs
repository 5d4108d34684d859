use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LyraConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// How long to wait for metadata before reporting a timeout. 0 disables the guard.
    #[serde(default = "default_load_timeout")]
    pub load_timeout_ms: u64,
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f64,
    /// Cadence of simulated time updates
    #[serde(default = "default_time_update_interval")]
    pub time_update_interval_ms: u64,
}

const fn default_load_timeout() -> u64 {
    10_000
}

const fn default_initial_volume() -> f64 {
    1.0
}

const fn default_time_update_interval() -> u64 {
    250
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: default_load_timeout(),
            initial_volume: default_initial_volume(),
            time_update_interval_ms: default_time_update_interval(),
        }
    }
}

impl PlaybackConfig {
    /// Load timeout, `None` when disabled
    #[must_use]
    pub const fn load_timeout(&self) -> Option<Duration> {
        if self.load_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.load_timeout_ms))
        }
    }

    #[must_use]
    pub const fn time_update_interval(&self) -> Duration {
        Duration::from_millis(self.time_update_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Lines shown above the active line
    #[serde(default = "default_context_lines")]
    pub lines_before: usize,
    /// Lines shown below the active line
    #[serde(default = "default_context_lines")]
    pub lines_after: usize,
}

const fn default_context_lines() -> usize {
    2
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            lines_before: default_context_lines(),
            lines_after: default_context_lines(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/lyra/lyra.log`
    #[serde(default)]
    pub enabled: bool,
}

impl LyraConfig {
    /// Get the config file path (~/.config/lyra/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default location or create a template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `path` or create a template there
    ///
    /// # Errors
    ///
    /// Same as [`LyraConfig::load_or_create`].
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a config document
    ///
    /// # Errors
    ///
    /// Returns an error on TOML syntax errors or out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges serde cannot express
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        let volume = self.playback.initial_volume;
        if !(0.0..=1.0).contains(&volume) {
            return Err(CoreError::ConfigInvalid {
                message: format!("playback.initial_volume must be within 0.0..=1.0, got {volume}"),
            });
        }
        if self.playback.time_update_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "playback.time_update_interval_ms must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r#"# Lyra Configuration
# ~/.config/lyra/config.toml

[playback]
# Report "load timeout" if no metadata arrives in time (0 = never)
load_timeout_ms = 10000
# Volume applied when a track is opened (0.0 - 1.0)
initial_volume = 1.0
# How often the simulated player reports its position
time_update_interval_ms = 250

[lyrics]
# Context shown around the active line
lines_before = 2
lines_after = 2

[logging]
# Also write logs to ~/.config/lyra/lyra.log
enabled = false
"#;
