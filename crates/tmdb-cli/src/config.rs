//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tmdb_core::RetryPolicy;
use tmdb_export::{DEFAULT_API_URL, DEFAULT_CHUNK_SIZE, DEFAULT_EXPORT_URL, DEFAULT_WORKERS};

/// Tuning and endpoints read from `get-tmdb.toml`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub pool: PoolSection,
    pub http: HttpSection,
    pub endpoints: EndpointsSection,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    pub workers: usize,
    pub chunk_size: usize,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            retry_delay_ms: policy.delay.as_millis() as u64,
        }
    }
}

impl HttpSection {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointsSection {
    pub api_url: String,
    pub export_url: String,
}

impl Default for EndpointsSection {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            export_url: DEFAULT_EXPORT_URL.to_string(),
        }
    }
}

impl FileConfig {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./get-tmdb.toml (current directory)
    /// 2. ~/.config/get-tmdb/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("get-tmdb.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "get-tmdb") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
