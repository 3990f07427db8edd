//! Client configuration.
//!
//! Loaded from TOML, then optionally overridden from the environment:
//!
//! ```toml
//! base_url = "https://kirini.example"
//! token_file = "/home/me/.local/share/kirini/tokens.json"
//!
//! [default_headers]
//! Accept = "application/json"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const BASE_URL_ENV: &str = "KIRINI_BASE_URL";
pub const TOKEN_FILE_ENV: &str = "KIRINI_TOKEN_FILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix for root-relative URLs. Empty means URLs are used as given.
    pub base_url: String,
    /// Sent with every request unless the call supplies the same header.
    pub default_headers: BTreeMap<String, String>,
    /// Backing file for the durable token scope.
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_headers: BTreeMap::from([("Accept".to_string(), "application/json".to_string())]),
            token_file: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(raw)?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Apply `KIRINI_BASE_URL` and `KIRINI_TOKEN_FILE` when set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(BASE_URL_ENV) {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(file) = lookup(TOKEN_FILE_ENV) {
            self.token_file = Some(PathBuf::from(file));
        }
        self
    }

    /// Resolve `url` against `base_url`. Absolute URLs pass through.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") || self.base_url.is_empty() {
            return url.to_string();
        }
        if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            format!("{}/{url}", self.base_url)
        }
    }
}
