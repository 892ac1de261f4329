//! Application configuration management.
//!
//! This module handles loading and saving the client configuration,
//! which includes the backend URL, request timeouts and the last email
//! used to sign in.
//!
//! Configuration is stored at `~/.config/gamehub/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "gamehub";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Client storage file name in the data directory
const STORAGE_FILE: &str = "storage.json";

/// Backend the front end talks to when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000/";

/// Environment variable overriding `server_url`
pub const SERVER_URL_ENV: &str = "GAMEHUB_SERVER_URL";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Token checks gate every private view, so they fail faster than other requests.
const DEFAULT_VALIDATION_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub validation_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            validation_timeout_secs: DEFAULT_VALIDATION_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment overrides on top of the file configuration.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                self.server_url = url.trim().to_string();
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Location of the persisted client storage (credential keys).
    pub fn storage_path(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(STORAGE_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs.max(1))
    }
}
