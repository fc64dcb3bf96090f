//! Configuration management for athena-cursor.
//!
//! Handles loading connection defaults from TOML files and environment
//! variables, with support for named connections.

use crate::error::{AthenaError, Result};
use crate::query::ResultMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Named connections.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

/// Connection-level defaults for every query issued through a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database (schema) queries run against. `default` when unset.
    #[serde(default)]
    pub database: Option<String>,

    /// Result output location, e.g. `s3://bucket/prefix/`.
    ///
    /// When unset the workgroup's configured location is used.
    #[serde(default)]
    pub output_location: Option<String>,

    /// Workgroup queries are submitted to. `primary` when unset.
    #[serde(default)]
    pub workgroup: Option<String>,

    /// Delay between execution status checks, in milliseconds.
    #[serde(default = "default_poll_frequency_ms")]
    pub poll_frequency_ms: u64,

    /// Default result mode.
    #[serde(default)]
    pub result_mode: ResultMode,

    /// Default timeout for result materialization, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Default data catalog. The engine default is used when unset.
    #[serde(default)]
    pub catalog: Option<String>,
}

const DEFAULT_DATABASE: &str = "default";
const DEFAULT_WORKGROUP: &str = "primary";

fn default_poll_frequency_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            database: None,
            output_location: None,
            workgroup: None,
            poll_frequency_ms: default_poll_frequency_ms(),
            result_mode: ResultMode::default(),
            timeout_secs: default_timeout_secs(),
            catalog: None,
        }
    }
}

impl ConnectionConfig {
    /// Creates a config for the given database with all other fields defaulted.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..Self::default()
        }
    }

    /// Sets the output location.
    pub fn with_output_location(mut self, location: impl Into<String>) -> Self {
        self.output_location = Some(location.into());
        self
    }

    /// Sets the default result mode.
    pub fn with_result_mode(mut self, mode: ResultMode) -> Self {
        self.result_mode = mode;
        self
    }

    /// Sets the status poll frequency.
    pub fn with_poll_frequency(mut self, frequency: Duration) -> Self {
        self.poll_frequency_ms = frequency.as_millis() as u64;
        self
    }

    /// Poll frequency as a duration.
    pub fn poll_frequency(&self) -> Duration {
        Duration::from_millis(self.poll_frequency_ms)
    }

    /// Default timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks the values that would make the query lifecycle misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.database().trim().is_empty() {
            return Err(AthenaError::config("database name is required"));
        }
        if self.workgroup().trim().is_empty() {
            return Err(AthenaError::config("workgroup is required"));
        }
        if self.poll_frequency_ms == 0 {
            return Err(AthenaError::config("poll_frequency_ms must be greater than zero"));
        }
        Ok(())
    }

    /// Applies environment variables (ATHENA_DATABASE, etc.) to unset fields.
    pub fn apply_env_defaults(&mut self) {
        self.apply_defaults_from(|key| std::env::var(key).ok());
    }

    /// Fills unset fields from `lookup`, keyed by environment variable name.
    /// Explicitly configured values are never replaced.
    pub fn apply_defaults_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields = [
            (&mut self.database, "ATHENA_DATABASE"),
            (&mut self.output_location, "ATHENA_OUTPUT_LOCATION"),
            (&mut self.workgroup, "ATHENA_WORKGROUP"),
            (&mut self.catalog, "ATHENA_CATALOG"),
        ];
        for (field, key) in fields {
            if field.is_none() {
                *field = lookup(key);
            }
        }
    }

    /// Database name, or `default` when unset.
    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }

    /// Workgroup name, or `primary` when unset.
    pub fn workgroup(&self) -> &str {
        self.workgroup.as_deref().unwrap_or(DEFAULT_WORKGROUP)
    }

    /// Sets the workgroup.
    pub fn with_workgroup(mut self, workgroup: impl Into<String>) -> Self {
        self.workgroup = Some(workgroup.into());
        self
    }

    /// Returns a short description for logs.
    pub fn display_string(&self) -> String {
        let catalog = self.catalog.as_deref().unwrap_or("default catalog");
        format!(
            "{} ({}) @ workgroup {} [{}]",
            self.database(),
            catalog,
            self.workgroup(),
            self.result_mode
        )
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("athena-cursor")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AthenaError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            AthenaError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or("default");
        self.connections.get(key)
    }
}
