//! Application settings and configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Player binary used to play files
    pub command: String,
    /// Extra flags placed between the command and the file path
    pub flags: String,
    /// Playback feedback rate in Hz
    pub feedback_rate: f64,
    /// Mixer command printing the current level
    pub volume_get_command: String,
    /// Mixer command prefix; `<pct>%` is appended
    pub volume_set_command: String,
    /// Seconds between volume readings while telemetry is active
    pub volume_poll_interval_secs: f64,
    /// Address the control server listens on
    pub listen_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            command: "play".to_string(),
            flags: String::new(),
            feedback_rate: 10.0,
            volume_get_command: "amixer -c 0 sget Master playback".to_string(),
            volume_set_command: "amixer -c 0 sset Master playback".to_string(),
            volume_poll_interval_secs: 1.0,
            listen_addr: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Error types for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl Settings {
    /// Load settings from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("audio-file-player").join("config.json")
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::ValidationError("Player command cannot be empty".to_string()));
        }

        if !(self.feedback_rate.is_finite() && self.feedback_rate > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "Feedback rate must be a positive number of Hz, got {}",
                self.feedback_rate
            )));
        }

        if !(self.volume_poll_interval_secs.is_finite() && self.volume_poll_interval_secs > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "Volume poll interval must be positive, got {}",
                self.volume_poll_interval_secs
            )));
        }

        if self.volume_get_command.trim().is_empty() || self.volume_set_command.trim().is_empty() {
            return Err(ConfigError::ValidationError("Volume commands cannot be empty".to_string()));
        }

        self.listen_socket_addr()?;
        Ok(())
    }

    pub fn listen_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|_| {
            ConfigError::ValidationError(format!("Invalid listen address: {}", self.listen_addr))
        })
    }
}
