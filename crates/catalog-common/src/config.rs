use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Console configuration.
///
/// Loaded from a `.toml` or `.json` file, then overlaid by environment
/// variables. Command-line flags override both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the catalog REST API.
    pub api_url: String,
    /// Base URL that relative upload paths are resolved against when
    /// embedding images in markdown. `None` keeps paths as returned.
    pub asset_base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Where the admin session is persisted between runs.
    pub session_path: PathBuf,
}

impl Config {
    pub const DEFAULT_API_URL: &'static str = "http://localhost:3000/api";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_SESSION_FILE: &'static str = "admin_user.json";

    /// Load configuration from a file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&text).map_err(|e| parse_err(e.to_string()))?,
            Some("json") => serde_json::from_str(&text).map_err(|e| parse_err(e.to_string()))?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file, chosen by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let text = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| parse_err(e.to_string()))?,
            Some("json") => {
                serde_json::to_string_pretty(self).map_err(|e| parse_err(e.to_string()))?
            }
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overlaid by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Overlay environment variables onto this configuration.
    ///
    /// Optional env vars:
    /// - `CATALOG_API_URL`: API base URL
    /// - `CATALOG_ASSET_URL`: base URL for uploaded images
    /// - `CATALOG_TIMEOUT_SECS`: request timeout in seconds
    /// - `CATALOG_SESSION_PATH`: session file location
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(url) = lookup("CATALOG_API_URL") {
            self.api_url = url;
        }
        if let Some(url) = lookup("CATALOG_ASSET_URL") {
            self.asset_base_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(secs) = lookup("CATALOG_TIMEOUT_SECS") {
            self.timeout_secs = secs.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    field: "timeout_secs",
                    message: e.to_string(),
                }
            })?;
        }
        if let Some(path) = lookup("CATALOG_SESSION_PATH") {
            self.session_path = PathBuf::from(path);
        }
        self.validate()?;
        Ok(self)
    }

    /// Parsed API base URL.
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_url).map_err(|e| ConfigError::UrlParse {
            url: self.api_url.clone(),
            message: e.to_string(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;
        if let Some(asset) = &self.asset_base_url {
            Url::parse(asset).map_err(|e| ConfigError::UrlParse {
                url: asset.clone(),
                message: e.to_string(),
            })?;
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                message: "must be at least one second".into(),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            asset_base_url: None,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            session_path: PathBuf::from(Self::DEFAULT_SESSION_FILE),
        }
    }
}
