//! Configuration management for the analytics service
//!
//! Settings come from an optional TOML file merged with `CUEMASTER_*`
//! environment variables, which take precedence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the HTTP API listens on
    pub port: u16,
    /// Directory holding the analytics sheet and its lock file
    pub data_dir: PathBuf,
    /// Maximum time to wait for the write lock before failing the request
    pub lock_wait_secs: u64,
    /// Number of submissions returned in the summary's recency view
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8787,
            data_dir: default_data_dir(),
            lock_wait_secs: 10,
            recent_limit: 10,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("cuemaster-analytics"))
        .unwrap_or_else(|| PathBuf::from(".cuemaster-analytics"))
}

impl Config {
    /// Load configuration from an optional TOML file, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.merge_env_vars();
        Ok(config)
    }

    fn merge_env_vars(&mut self) {
        if let Ok(port) = std::env::var("CUEMASTER_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(dir) = std::env::var("CUEMASTER_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = std::env::var("CUEMASTER_LOCK_WAIT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.lock_wait_secs = secs;
            }
        }
        if let Ok(limit) = std::env::var("CUEMASTER_RECENT_LIMIT") {
            if let Ok(limit) = limit.parse() {
                self.recent_limit = limit;
            }
        }
    }

    /// Bounded wait applied to write-lock acquisition.
    pub fn lock_wait(&self) -> Duration {
        Duration::from_secs(self.lock_wait_secs)
    }
}
