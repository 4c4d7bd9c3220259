//! Configuration file support for watch-sql.
//!
//! Settings are read from a TOML file and environment variables, then fed
//! through the validating [`Builder`] so file-based and programmatic
//! configurations obey the same rules.

use crate::db::Parameters;
use crate::error::{IntegrationError, Result};
use crate::integration::{Builder, SqlIntegrationConfiguration};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when no connection string is configured.
pub const ENV_CONNECTION_STRING: &str = "WATCH_SQL_CONNECTION_STRING";
/// Environment variable consulted when no default query is configured.
pub const ENV_QUERY: &str = "WATCH_SQL_QUERY";
/// Environment variable consulted when no timeout is configured.
pub const ENV_TIMEOUT_SECS: &str = "WATCH_SQL_TIMEOUT_SECS";

/// Integration settings as written in the configuration file.
///
/// ```toml
/// connection_string = "postgres://watcher@localhost/metrics"
/// query = "insert into checks (name, healthy) values (@name, @healthy)"
/// timeout_secs = 10
///
/// [parameters]
/// name = "api"
/// healthy = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Database connection string (URL or `key=value;` form).
    pub connection_string: Option<String>,

    /// Default query.
    pub query: Option<String>,

    /// Default query timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Default bind parameters.
    #[serde(default)]
    pub parameters: Parameters,
}

impl Settings {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("watch-sql")
            .join("config.toml")
    }

    /// Loads settings from a TOML file. A missing file yields empty settings.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| IntegrationError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses settings from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            IntegrationError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Merges another set of settings into this one, with the other taking precedence.
    ///
    /// Parameters are replaced as a whole when the other set has any.
    pub fn merge(&mut self, other: &Settings) {
        if other.connection_string.is_some() {
            self.connection_string = other.connection_string.clone();
        }
        if other.query.is_some() {
            self.query = other.query.clone();
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if !other.parameters.is_empty() {
            self.parameters = other.parameters.clone();
        }
    }

    /// Applies `WATCH_SQL_*` environment variables as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.connection_string.is_none() {
            self.connection_string = std::env::var(ENV_CONNECTION_STRING).ok();
        }
        if self.query.is_none() {
            self.query = std::env::var(ENV_QUERY).ok();
        }
        if self.timeout_secs.is_none() {
            if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
                self.timeout_secs = secs.parse().ok();
            }
        }
    }

    /// Validates the settings and returns a builder for further customisation.
    pub fn into_builder(self) -> Result<Builder> {
        let connection_string = self.connection_string.ok_or_else(|| {
            IntegrationError::config("SQL connection string has not been provided.")
        })?;

        let mut builder = SqlIntegrationConfiguration::create(connection_string)?;
        if let Some(query) = self.query {
            builder = builder.with_query(query)?;
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.with_timeout(Duration::from_secs(secs))?;
        }
        builder.with_parameters(self.parameters)
    }
}
