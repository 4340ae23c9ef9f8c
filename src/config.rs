//! Configuration for the motionsense agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the agent.
///
/// Everything here is externally supplied; nothing is derived at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Serial device path for the live radar stream
    pub port: String,

    /// Baud rate for the serial connection
    pub baud_rate: u32,

    /// Serial read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Maximum number of records retained in the history window
    pub window_capacity: usize,

    /// Room-presence thresholds applied to telemetry lines
    pub thresholds: RoomThresholds,

    /// Consumer tick cadence in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            read_timeout_ms: 1_000,
            window_capacity: 500,
            thresholds: RoomThresholds::default(),
            tick_interval_ms: 200,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("motionsense-agent")
            .join("config.json")
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Thresholds for the room-presence heuristic: presence is inferred when
/// either value exceeds its threshold. Tunable, not validated science.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomThresholds {
    pub wander: f64,
    pub jitter: f64,
}

impl Default for RoomThresholds {
    fn default() -> Self {
        Self {
            wander: 0.005,
            jitter: 0.01,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
