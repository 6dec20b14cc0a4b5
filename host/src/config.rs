//! Runtime configuration
//!
//! Tick timing, bridge timeouts and broker channel limits. Read from a JSON
//! file; every field is optional and a missing file means all defaults.

use std::path::Path;
use std::time::Duration;

use scene_engine::{BrokerConfig, OverflowPolicy};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{channels, handshake, timing};

/// Full runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Fixed tick interval in milliseconds
    pub tick_interval_ms: u64,
    /// Bridge reply timeout in milliseconds
    pub bridge_timeout_ms: u64,
    /// Per-sink broker channel capacity
    pub channel_capacity: usize,
    /// What a full broker channel does with a new message
    pub overflow: OverflowPolicy,
    /// Bootstrap requests sent before the engine counts as unreachable
    pub ready_attempts: u32,
    /// Pause between bootstrap requests in milliseconds
    pub ready_backoff_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: timing::TICK_INTERVAL_MS,
            bridge_timeout_ms: timing::BRIDGE_TIMEOUT_MS,
            channel_capacity: channels::CAPACITY,
            overflow: OverflowPolicy::default(),
            ready_attempts: handshake::READY_ATTEMPTS,
            ready_backoff_ms: handshake::READY_BACKOFF_MS,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from disk, falling back to defaults if the file is missing
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !fs::try_exists(path).await.map_err(ConfigError::Io)? {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await.map_err(ConfigError::Io)?;
        let config: Self = serde_json::from_str(&contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(ConfigError::Io)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, contents).await.map_err(ConfigError::Io)?;

        log::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be at least 1".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be at least 1".into()));
        }
        if self.ready_attempts == 0 {
            return Err(ConfigError::Invalid("ready_attempts must be at least 1".into()));
        }
        if self.bridge_timeout_ms == 0 {
            return Err(ConfigError::Invalid("bridge_timeout_ms must be at least 1".into()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge_timeout_ms)
    }

    pub fn ready_backoff(&self) -> Duration {
        Duration::from_millis(self.ready_backoff_ms)
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            capacity: self.channel_capacity,
            overflow: self.overflow,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}
