// src/config.rs
// =============================================================================
// Application settings, read from a TOML file.
//
// Every field has a default, so an empty file (or no file at all) gives a
// working setup: SQLite in ./link-shelf.db, API on port 3000, 5-link batches
// with a 1 second pause, daily sweep at 02:00.
//
// Example file:
//
//   [server]
//   bind = "127.0.0.1:8080"
//
//   [http]
//   timeout_secs = 5
//   get_only_hosts = ["github.com"]
//
//   [sweep]
//   batch_size = 5
//   pause_ms = 1000
//   daily_hour = 2
// =============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub sweep: SweepSettings,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load settings, falling back to defaults if the file is missing or broken.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Reject values that would make the service misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        if self.sweep.batch_size == 0 {
            return Err(AppError::config("sweep.batch_size must be > 0"));
        }
        if self.sweep.daily_hour > 23 {
            return Err(AppError::config("sweep.daily_hour must be between 0 and 23"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the REST API listens on
    #[serde(default = "defaults::bind")]
    pub bind: String,

    /// Icon URL returned for links that have no favicon yet
    #[serde(default = "defaults::default_icon")]
    pub default_icon: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            default_icon: defaults::default_icon(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database file (":memory:" for a throwaway database)
    #[serde(default = "defaults::database")]
    pub database: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database: defaults::database(),
        }
    }
}

/// Outbound HTTP behavior shared by the favicon resolver and the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Browser-like User-Agent; some sites reject library defaults
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Hosts that answer HEAD badly and must be probed with GET
    #[serde(default)]
    pub get_only_hosts: Vec<String>,
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
            get_only_hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Links probed concurrently per batch
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Pause between batches in milliseconds
    #[serde(default = "defaults::pause_ms")]
    pub pause_ms: u64,

    /// Local hour (0-23) of the daily sweep
    #[serde(default = "defaults::daily_hour")]
    pub daily_hour: u32,

    /// Turn the daily sweep off entirely
    #[serde(default = "defaults::schedule_enabled")]
    pub schedule_enabled: bool,
}

impl SweepSettings {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            batch_size: defaults::batch_size(),
            pause_ms: defaults::pause_ms(),
            daily_hour: defaults::daily_hour(),
            schedule_enabled: defaults::schedule_enabled(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn bind() -> String {
        "0.0.0.0:3000".to_string()
    }

    pub fn default_icon() -> String {
        "/icons/default.png".to_string()
    }

    pub fn database() -> PathBuf {
        PathBuf::from("link-shelf.db")
    }

    pub fn timeout() -> u64 {
        5
    }

    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
            .to_string()
    }

    pub fn batch_size() -> usize {
        5
    }

    pub fn pause_ms() -> u64 {
        1000
    }

    pub fn daily_hour() -> u32 {
        2
    }

    pub fn schedule_enabled() -> bool {
        true
    }
}
