//! Configuration loading traits and types.
//!
//! Every Lumen binary reads a single TOML file. The `[shared]` table is
//! common to all of them; the rest is application specific.
//!
//! # Usage
//!
//! ```rust,no_run
//! use lumen_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct NodeConfig {
//!     shared: SharedConfig,
//!     universe: u16,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = NodeConfig::load(Path::new("artnet.toml"))?;
//!     config.shared.validate()?;
//!     println!("{} on universe {}", config.shared.service_name, config.universe);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the given path.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// File could not be read or TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log verbosity, written in lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-packet detail.
    Trace,
    /// Poll, sync and discovery events.
    Debug,
    /// Lifecycle events.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Fields shared by every Lumen application.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "lumen-artnet"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier, used in log output.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "lumen".to_string(),
        }
    }
}

impl SharedConfig {
    /// Reject an empty `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads any deserializable type from a TOML file or string.
///
/// - `ConfigError::FileNotFound` when the file does not exist
/// - `ConfigError::ParseError` for unreadable files or bad TOML
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::ParseError(format!("{}: {e}", path.display()))
            }
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
