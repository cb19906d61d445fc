//! Engine configuration.
//!
//! Supports TOML config files, environment variable overrides, and defaults.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MarshalError, Result};

/// Path value that selects an in-memory SQLite store.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite database file, or `:memory:` (default: "./objrel.db")
    pub database_path: PathBuf,
    /// How long to wait on a locked database, in milliseconds (default: 5000)
    pub busy_timeout_ms: u64,
    /// Use write-ahead logging for file databases (default: true)
    pub wal_mode: bool,
    /// Wrap each top-level compile and insert in a savepoint (default: true)
    pub atomic_writes: bool,
    /// Table used by the JSON object store (default: "objects")
    pub object_table: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./objrel.db"),
            busy_timeout_ms: 5000,
            wal_mode: true,
            atomic_writes: true,
            object_table: "objects".to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration pointing at an in-memory store.
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            ..Self::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MarshalError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| MarshalError::Config(format!("Invalid TOML: {}", e)))
    }

    /// Saves the configuration to a TOML file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| MarshalError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), toml)
            .map_err(|e| MarshalError::Config(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    /// Applies environment variable overrides.
    /// Environment variables are prefixed with `OBJREL_`.
    /// Example: `OBJREL_DATABASE_PATH=/path/data.db` overrides `database_path`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(val) = lookup("OBJREL_DATABASE_PATH") {
            self.database_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("OBJREL_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = val
                .parse()
                .map_err(|_| MarshalError::Config(format!("Invalid busy_timeout_ms: {}", val)))?;
        }
        if let Some(val) = lookup("OBJREL_WAL_MODE") {
            self.wal_mode = val
                .parse()
                .map_err(|_| MarshalError::Config(format!("Invalid wal_mode: {}", val)))?;
        }
        if let Some(val) = lookup("OBJREL_ATOMIC_WRITES") {
            self.atomic_writes = val
                .parse()
                .map_err(|_| MarshalError::Config(format!("Invalid atomic_writes: {}", val)))?;
        }
        if let Some(val) = lookup("OBJREL_OBJECT_TABLE") {
            self.object_table = val;
        }
        Ok(())
    }

    /// Returns the busy timeout as a `Duration`.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }
}
