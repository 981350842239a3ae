//! Connection settings for the router metastore.
//!
//! Settings are merged from three places, highest precedence first: an
//! explicit `--conf_path` YAML file, command-line flags (or their env vars),
//! and the per-user default file `~/.qbfs_tool/conf.yaml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Location of the per-user config file, relative to the home directory
pub const DEFAULT_CONF_RELATIVE_PATH: &str = ".qbfs_tool/conf.yaml";

/// Request timeout used when no config source sets one
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing {0}: pass it as a flag or set it in the config file")]
    Missing(&'static str),
}

/// On-disk YAML layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileConfig {
    #[serde(rename = "ServerUrl", default)]
    pub server_url: Option<String>,

    #[serde(rename = "ServerToken", default)]
    pub server_token: Option<String>,

    #[serde(rename = "RequestTimeoutSecs", default)]
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Read and parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to a mapping
        if content.trim().is_empty() {
            return Ok(FileConfig::default());
        }
        serde_yaml::from_str(content)
    }

    /// Overlay the values present in `other` on top of `self`
    fn merge(mut self, other: FileConfig) -> Self {
        if other.server_url.is_some() {
            self.server_url = other.server_url;
        }
        if other.server_token.is_some() {
            self.server_token = other.server_token;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        self
    }
}

/// Connection values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConnectionFlags {
    pub server_url: Option<String>,
    pub server_token: Option<String>,
    pub conf_path: Option<PathBuf>,
}

/// Fully resolved settings used to build a metastore client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub server_url: String,
    pub server_token: String,
    pub request_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(server_url: impl Into<String>, server_token: impl Into<String>) -> Self {
        ConnectionConfig {
            server_url: server_url.into(),
            server_token: server_token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Default per-user config path, if a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|mut p| {
            p.push(DEFAULT_CONF_RELATIVE_PATH);
            p
        })
    }

    /// Merge all sources using the standard default file location
    pub fn load(flags: &ConnectionFlags) -> Result<Self, ConfigError> {
        Self::load_with_default(flags, Self::default_path().as_deref())
    }

    /// Merge all sources, reading the default file from `default_path`
    ///
    /// A missing default file is skipped; a missing `--conf_path` file is an error.
    pub fn load_with_default(
        flags: &ConnectionFlags,
        default_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut merged = FileConfig::default();

        if let Some(path) = default_path {
            if path.exists() {
                tracing::debug!("Loading default config from {}", path.display());
                merged = merged.merge(FileConfig::from_file(path)?);
            } else {
                tracing::debug!("No default config at {}", path.display());
            }
        }

        merged = merged.merge(FileConfig {
            server_url: flags.server_url.clone(),
            server_token: flags.server_token.clone(),
            request_timeout_secs: None,
        });

        if let Some(path) = &flags.conf_path {
            tracing::debug!("Loading config from {}", path.display());
            merged = merged.merge(FileConfig::from_file(path)?);
        }

        let server_url = merged
            .server_url
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("server url"))?;
        let server_token = merged
            .server_token
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("server token"))?;
        let request_timeout = merged
            .request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Ok(ConnectionConfig {
            server_url,
            server_token,
            request_timeout,
        })
    }
}
