//! Configuration management for the tapedeck engine
//!
//! This module handles loading and validating configuration from environment
//! variables, TOML files, and the built-in development override profile.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Playlist lifecycle configuration
    pub engine: EngineConfig,

    /// Remote publisher endpoint configuration
    pub publisher: PublisherConfig,

    /// Release announcement configuration
    pub notifier: NotifierConfig,

    /// Chat command configuration
    pub chat: ChatConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Playlist lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum age of a playlist before it may be released (hours)
    pub release_interval_hours: u64,

    /// How often the scheduler evaluates release eligibility (minutes)
    pub release_check_interval_minutes: u64,

    /// Minimum item count required to release a playlist
    pub release_threshold_item_count: usize,

    /// Minimum age of an archived item before cleanup may delete it (hours)
    pub retention_window_hours: u64,

    /// How often the scheduler runs retention cleanup (hours)
    pub cleanup_interval_hours: u64,

    /// Deadline for every remote publisher call (seconds)
    pub publish_timeout_secs: u64,
}

/// Remote publisher endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Base URL of the publishing API
    pub base_url: String,

    /// Bearer token (optional; the platform client may also use env credentials)
    pub auth_token: Option<String>,
}

/// Release announcement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Webhook URL to announce releases to; empty disables announcements
    pub webhook_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum delivery retry attempts
    pub max_retries: u32,
}

/// Chat command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Command prefix, e.g. "!"
    pub command_prefix: String,

    /// Channel ids the bot listens on; messages elsewhere are ignored
    pub active_channels: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_u64("TAPEDECK_RELEASE_INTERVAL_HOURS") {
            config.engine.release_interval_hours = v;
        }
        if let Some(v) = env_u64("TAPEDECK_RELEASE_CHECK_INTERVAL_MINUTES") {
            config.engine.release_check_interval_minutes = v;
        }
        if let Some(v) = env_u64("TAPEDECK_RELEASE_THRESHOLD_ITEM_COUNT") {
            config.engine.release_threshold_item_count = v as usize;
        }
        if let Some(v) = env_u64("TAPEDECK_RETENTION_WINDOW_HOURS") {
            config.engine.retention_window_hours = v;
        }
        if let Some(v) = env_u64("TAPEDECK_CLEANUP_INTERVAL_HOURS") {
            config.engine.cleanup_interval_hours = v;
        }
        if let Some(v) = env_u64("TAPEDECK_PUBLISH_TIMEOUT_SECS") {
            config.engine.publish_timeout_secs = v;
        }

        if let Ok(v) = std::env::var("TAPEDECK_PUBLISHER_URL") {
            config.publisher.base_url = v;
        }
        config.publisher.auth_token = std::env::var("TAPEDECK_PUBLISHER_TOKEN").ok();

        if let Ok(v) = std::env::var("TAPEDECK_WEBHOOK_URL") {
            config.notifier.webhook_url = v;
        }

        if let Ok(v) = std::env::var("TAPEDECK_ACTIVE_CHANNELS") {
            config.chat.active_channels =
                v.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(v) = std::env::var("TAPEDECK_SQLITE_PATH") {
            config.database.sqlite_path = v.into();
        }

        if let Ok(v) = std::env::var("TAPEDECK_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("TAPEDECK_LOG_FORMAT") {
            config.logging.format = v;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Development override profile: shrunken intervals for fast iteration
    pub fn development() -> Self {
        let mut config = Self::default();
        config.engine.release_interval_hours = 1;
        config.engine.release_check_interval_minutes = 1;
        config.engine.release_threshold_item_count = 2;
        config.engine.retention_window_hours = 1;
        config.engine.cleanup_interval_hours = 1;
        config.engine.publish_timeout_secs = 5;
        config.logging.level = String::from("debug");
        config
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.engine.release_interval_hours == 0 {
            anyhow::bail!("release_interval_hours must be greater than 0");
        }

        if self.engine.release_check_interval_minutes == 0 {
            anyhow::bail!("release_check_interval_minutes must be greater than 0");
        }

        if self.engine.release_threshold_item_count == 0 {
            anyhow::bail!("release_threshold_item_count must be greater than 0");
        }

        if self.engine.retention_window_hours == 0 {
            anyhow::bail!("retention_window_hours must be greater than 0");
        }

        if self.engine.cleanup_interval_hours == 0 {
            anyhow::bail!("cleanup_interval_hours must be greater than 0");
        }

        if self.engine.publish_timeout_secs == 0 {
            anyhow::bail!("publish_timeout_secs must be greater than 0");
        }

        if self.chat.command_prefix.is_empty() {
            anyhow::bail!("command_prefix must not be empty");
        }

        Ok(())
    }
}

impl EngineConfig {
    /// Minimum playlist age before release, as a chrono duration
    #[must_use]
    pub fn release_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.release_interval_hours as i64)
    }

    /// Minimum archived-item age before cleanup, as a chrono duration
    #[must_use]
    pub fn retention_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_window_hours as i64)
    }

    /// Scheduler period for release checks
    #[must_use]
    pub fn release_check_interval(&self) -> Duration {
        Duration::from_secs(self.release_check_interval_minutes * 60)
    }

    /// Scheduler period for retention cleanup
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_hours * 3600)
    }

    /// Deadline for remote publisher calls
    #[must_use]
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                release_interval_hours: 24 * 7,
                release_check_interval_minutes: 30,
                release_threshold_item_count: 5,
                retention_window_hours: 24 * 60,
                cleanup_interval_hours: 24,
                publish_timeout_secs: 30,
            },
            publisher: PublisherConfig {
                base_url: String::from("http://localhost:8080"),
                auth_token: None,
            },
            notifier: NotifierConfig {
                webhook_url: String::new(),
                timeout_secs: 10,
                max_retries: 3,
            },
            chat: ChatConfig {
                command_prefix: String::from("!"),
                active_channels: Vec::new(),
            },
            database: DatabaseConfig {
                sqlite_path: PathBuf::from("data/tapedeck.db"),
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
