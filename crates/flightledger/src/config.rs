//! Configuration management for flightledger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightledger";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "ledger.db";

/// Prefix for environment overrides; nested keys are separated by `__`.
const ENV_PREFIX: &str = "FLIGHTLEDGER_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTLEDGER_`, e.g.
///    `FLIGHTLEDGER_STORAGE__BUSY_TIMEOUT_MS`)
/// 2. TOML config file at `~/.config/flightledger/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Ledger policy.
    pub ledger: LedgerConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightledger/ledger.db`
    pub database_path: Option<PathBuf>,
    /// How long a writer waits for another connection's transaction, in
    /// milliseconds.
    pub busy_timeout_ms: u64,
}

/// Ledger policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Add a session's confirmed hours to its student and teacher when an
    /// instructor verifies it. When off, verification only sets the flag.
    pub verification_accrual: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            verification_accrual: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Reads the TOML file at `config_path`, or at
    /// [`Config::default_config_path`] when none is given.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.busy_timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "busy_timeout_ms must be greater than 0".to_string(),
            });
        }

        if self
            .storage
            .database_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(Error::ConfigValidation {
                message: "database_path must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the busy timeout as a Duration.
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }
}
