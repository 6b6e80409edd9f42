// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration for store access, lock defaults and reclamation
//!
//! Read from TOML. Every section is optional; missing values fall back to
//! the defaults below.

use crate::keys::{KeyNamer, DEFAULT_LOCK_PREFIX, DEFAULT_SCRATCH_PREFIX};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "LK_CONFIG";

/// Environment variable overriding `store.url`
pub const URL_ENV: &str = "LK_REDIS_URL";

/// Store URL used when nothing else is configured
pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379/";

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub lock: LockConfig,
    pub reclaim: ReclaimConfig,
    pub keys: KeysConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STORE_URL.to_string(),
        }
    }
}

/// Defaults applied to every lock unless the caller overrides them
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockConfig {
    /// Store-side expiry of the lock key; `None` means the key never expires
    #[serde(with = "humantime_serde")]
    pub lease: Option<Duration>,
    /// Delay between attempts while waiting
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Wait for the lock instead of failing on the first attempt
    pub blocking: bool,
    /// Give up waiting after this long; `None` waits forever
    #[serde(with = "humantime_serde")]
    pub blocking_timeout: Option<Duration>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease: None,
            poll_interval: Duration::from_millis(100),
            blocking: true,
            blocking_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReclaimConfig {
    /// Overrides the per-kind batch size
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeysConfig {
    pub lock_prefix: String,
    pub scratch_prefix: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            lock_prefix: DEFAULT_LOCK_PREFIX.to_string(),
            scratch_prefix: DEFAULT_SCRATCH_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Load configuration from the first source that applies: `explicit`,
    /// then `$LK_CONFIG`, then the user config file if it exists. Falls
    /// back to defaults. `$LK_REDIS_URL` is applied last.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let path = resolve_path(explicit, env_path, Self::default_path());

        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(URL_ENV) {
            config.store.url = url;
        }

        Ok(config)
    }

    /// `<config dir>/lk/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lk").join("config.toml"))
    }

    pub fn key_namer(&self) -> KeyNamer {
        KeyNamer::new(&self.keys.lock_prefix, &self.keys.scratch_prefix)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.lock.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "lock.poll_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if matches!(self.lock.lease, Some(lease) if lease < Duration::from_millis(1)) {
            return Err(ConfigError::Invalid {
                field: "lock.lease",
                reason: "must be at least 1ms".to_string(),
            });
        }
        if self.reclaim.batch_size == Some(0) {
            return Err(ConfigError::Invalid {
                field: "reclaim.batch_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.keys.scratch_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "keys.scratch_prefix",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Pick the config file to load. The default path is only used when it
/// exists; explicit and environment paths are used as given so a typo
/// surfaces as a read error.
fn resolve_path(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    default_path: Option<PathBuf>,
) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or(env_path)
        .or_else(|| default_path.filter(|path| path.exists()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
