//! Client configuration.
//!
//! Values are layered: JSON file, then `MYNOTES_*` environment overrides,
//! then whatever the front end sets explicitly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "mynotes";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the notes REST service, e.g. `http://localhost:8000/api`.
    pub api_base_url: String,
    /// Directory holding the local store. `None` resolves to the platform
    /// data directory.
    pub data_dir: Option<PathBuf>,
    /// Upper bound for every remote request.
    pub request_timeout_secs: u64,
    /// Begin in the offline state instead of online.
    pub start_offline: bool,
    /// Merge consecutive queued updates of the same record.
    pub coalesce_updates: bool,
    /// Interval of the connectivity probe.
    pub probe_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            data_dir: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            start_offline: false,
            coalesce_updates: true,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
        }
    }
}

/// Platform location of the config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Platform location of the local store.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME))
}

impl ClientConfig {
    /// Load from the default path and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match default_config_path() {
            Some(path) => Self::load_from_path(&path)?,
            None => Self::default(),
        };
        let values: HashMap<String, String> = std::env::vars().collect();
        config.apply_overrides(|name| values.get(name).cloned())?;
        Ok(config)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!(
                "Failed to read config at {}: {}",
                path.display(),
                error
            ))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!(
                "Failed to parse config at {}: {}",
                path.display(),
                error
            ))
        })?;
        config.normalize()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Apply `MYNOTES_API_URL`, `MYNOTES_DATA_DIR`, `MYNOTES_TIMEOUT_SECS`
    /// and `MYNOTES_OFFLINE` from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = normalize_text_option(lookup("MYNOTES_API_URL")) {
            self.api_base_url = url;
        }
        if let Some(dir) = normalize_text_option(lookup("MYNOTES_DATA_DIR")) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = normalize_text_option(lookup("MYNOTES_TIMEOUT_SECS")) {
            self.request_timeout_secs = secs.parse::<u64>().map_err(|_| {
                Error::Config("MYNOTES_TIMEOUT_SECS must be an integer in [1, 120]".to_string())
            })?;
        }
        if let Some(flag) = normalize_text_option(lookup("MYNOTES_OFFLINE")) {
            self.start_offline = parse_flag(&flag).ok_or_else(|| {
                Error::Config("MYNOTES_OFFLINE must be true/false/1/0".to_string())
            })?;
        }
        self.normalize()
    }

    /// Trim values and check ranges.
    pub fn normalize(&mut self) -> Result<()> {
        let url = normalize_text_option(Some(self.api_base_url.clone()))
            .ok_or_else(|| Error::Config("api_base_url must not be empty".to_string()))?;
        if !is_http_url(&url) {
            return Err(Error::Config(
                "api_base_url must start with http:// or https://".to_string(),
            ));
        }
        self.api_base_url = url.trim_end_matches('/').to_string();

        if !(1..=120).contains(&self.request_timeout_secs) {
            return Err(Error::Config(
                "request_timeout_secs must be in [1, 120]".to_string(),
            ));
        }
        if self.probe_interval_secs == 0 {
            return Err(Error::Config(
                "probe_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// Resolved local store directory.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        self.data_dir
            .clone()
            .or_else(default_data_dir)
            .ok_or_else(|| Error::Config("Failed to resolve data directory".to_string()))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
