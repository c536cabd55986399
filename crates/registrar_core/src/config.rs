//! Core runtime configuration.
//!
//! Loaded from a JSON document; every field is optional and falls back to
//! its default.
//!
//! ```json
//! { "max_workers": 4, "id_retry_limit": 5, "log_level": "info", "log_dir": "/var/log/registrar" }
//! ```

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_WORKERS: usize = 8;
pub const DEFAULT_ID_RETRY_LIMIT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// Worker ceiling for batch provisioning and report aggregation.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Attempts per generated id before a collision becomes a conflict.
    #[serde(default = "default_id_retry_limit")]
    pub id_retry_limit: u32,

    #[serde(default)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_id_retry_limit() -> u32 {
    DEFAULT_ID_RETRY_LIMIT
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            id_retry_limit: DEFAULT_ID_RETRY_LIMIT,
            log_level: None,
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid config `{field}`: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl CoreConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid {
                field: "max_workers",
                reason: "must be at least 1",
            });
        }
        if self.id_retry_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "id_retry_limit",
                reason: "must be at least 1",
            });
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "log_dir",
                    reason: "must be an absolute path",
                });
            }
        }
        Ok(())
    }
}
