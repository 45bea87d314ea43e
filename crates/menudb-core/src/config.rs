use crate::error::InternalError;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Default number of times a conflicting transaction callback is run.
pub const DEFAULT_MAX_TRANSACTION_ATTEMPTS: u32 = 5;

///
/// Config
///
/// Process configuration, read once at startup.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, InternalError> {
        let config: Self = toml::from_str(contents)
            .map_err(|err| InternalError::config_unsupported(format!("invalid config: {err}")))?;
        config.validate()?;

        Ok(config)
    }

    /// Read a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, InternalError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|err| {
            InternalError::config_unsupported(format!(
                "failed to read {}: {err}",
                path.display()
            ))
        })?;

        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<(), InternalError> {
        if self.store.max_transaction_attempts == 0 {
            return Err(InternalError::config_unsupported(
                "store.max_transaction_attempts must be at least 1",
            ));
        }

        Ok(())
    }
}

///
/// StoreConfig
///

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_transaction_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_transaction_attempts: DEFAULT_MAX_TRANSACTION_ATTEMPTS,
        }
    }
}

///
/// LoggingConfig
///
/// `filter` uses `EnvFilter` directive syntax (`menudb_core=debug,info`).
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

///
/// LogFormat
///

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

///
/// TESTS
///
