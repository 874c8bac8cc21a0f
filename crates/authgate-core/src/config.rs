//! Application configuration management.
//!
//! Holds the API endpoint, the request timeout, the login surface path and
//! the token storage settings. Configuration is stored at
//! `~/.config/authgate/config.json`; a missing file yields the defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "authgate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Request timeout. Timed-out requests fail as transport errors.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where the user is sent after the server rejects the token.
const DEFAULT_LOGIN_PATH: &str = "/login";

const DEFAULT_ME_PATH: &str = "/auth/me";

const DEFAULT_LOGIN_ENDPOINT: &str = "/auth/login";

/// Storage key holding the bearer token.
const DEFAULT_STORAGE_KEY: &str = "auth_token";

/// Cached query results are considered fresh for this long.
const DEFAULT_QUERY_STALE_SECS: u64 = 10;

/// Env var overriding `base_url`
pub const ENV_BASE_URL: &str = "AUTHGATE_BASE_URL";

/// Env var overriding `storage`
pub const ENV_STORAGE: &str = "AUTHGATE_STORAGE";

/// Where the bearer token is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Process memory only; nothing survives exit
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" => Ok(StorageBackend::Keyring),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
    pub login_path: String,
    pub me_path: String,
    pub login_endpoint: String,
    pub storage: StorageBackend,
    pub storage_key: String,
    pub query_stale_secs: u64,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            me_path: DEFAULT_ME_PATH.to_string(),
            login_endpoint: DEFAULT_LOGIN_ENDPOINT.to_string(),
            storage: StorageBackend::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            query_stale_secs: DEFAULT_QUERY_STALE_SECS,
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Record the last signed-in username in the config file.
    ///
    /// Only that field changes on disk; env and command line overrides held
    /// by an in-memory `Config` are never written back.
    pub fn remember_username(username: &str) -> Result<()> {
        let path = Self::config_path()?;
        Self::remember_username_at(&path, username)
    }

    pub fn remember_username_at(path: &std::path::Path, username: &str) -> Result<()> {
        let mut on_disk = Self::load_from(path)?;
        on_disk.last_username = Some(username.to_string());
        on_disk.save_to(path)
    }

    /// Apply `AUTHGATE_*` environment overrides on top of the file values.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        if let Ok(storage) = std::env::var(ENV_STORAGE) {
            self.storage = storage
                .parse()
                .with_context(|| format!("Invalid {}", ENV_STORAGE))?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn query_stale_time(&self) -> Duration {
        Duration::from_secs(self.query_stale_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
