use std::collections::HashMap;
use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: String,
    /// Start with the built-in default folder set instead of no folders.
    pub seed_default_folders: bool,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "MYNOTES_API_BIND_ADDR", "127.0.0.1:8000");
        if !bind_addr.contains(':') {
            return Err(ConfigError::Invalid(
                "MYNOTES_API_BIND_ADDR must be host:port".to_string(),
            ));
        }

        let seed_default_folders =
            match value_or_default(&lookup, "MYNOTES_API_SEED_DEFAULTS", "false")
                .to_ascii_lowercase()
                .as_str()
            {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid(
                        "MYNOTES_API_SEED_DEFAULTS must be true or false".to_string(),
                    ))
                }
            };

        Ok(Self {
            bind_addr,
            seed_default_folders,
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            seed_default_folders: false,
        }
    }
}

fn value_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> String {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}
