//! Controller configuration.
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! service_name = "lumen-artnet"
//!
//! [artnet]
//! interface = "eth0"
//! unicast = true
//! synchronization = true
//! master = 255
//! oem_code = 0x20E0
//!
//! [output]
//! universes = [0, 1]
//! fps = 44
//! ```

use lumen_common::config::{ConfigError, ConfigLoader, SharedConfig};
use lumen_common::consts::{
    ARTNET_UDP_PORT, DEFAULT_OEM_CODE, DMX_MAX_VALUE, MAX_PORT_ADDRESS, MAX_UNIVERSES,
    NODE_TIMEOUT_MS, POLL_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Complete configuration file of the `lumen_artnet` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Common service settings.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Protocol engine settings.
    #[serde(default)]
    pub artnet: ArtNetConfig,
    /// Test-pattern output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load `path`, falling back to defaults when the file does not exist.
    ///
    /// # Errors
    /// `Config` for unreadable files, bad TOML or unknown keys.
    pub fn load_or_default(path: &Path) -> crate::error::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::FileNotFound(missing)) => {
                warn!("Configuration file {} not found. Using defaults.", missing.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.artnet.validate()?;
        self.output.validate()
    }
}

/// Art-Net engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtNetConfig {
    /// Interface name; first non-loopback IPv4 interface when absent.
    pub interface: Option<String>,
    /// UDP port.
    pub port: u16,
    /// Unicast to discovered subscribers instead of broadcasting.
    pub unicast: bool,
    /// Send ArtSync after each output generation.
    pub synchronization: bool,
    /// Expire silent nodes from the poll table.
    pub table_cleanup: bool,
    /// Master dimmer, 0 (dark) to 255 (pass-through).
    pub master: u8,
    /// Interval between ArtPoll broadcasts (ms).
    pub poll_interval_ms: u32,
    /// Node expiry age (ms).
    pub node_timeout_ms: u32,
    /// OEM code used to filter ArtTrigger.
    pub oem_code: u16,
}

impl Default for ArtNetConfig {
    fn default() -> Self {
        Self {
            interface: None,
            port: ARTNET_UDP_PORT,
            unicast: true,
            synchronization: true,
            table_cleanup: true,
            master: DMX_MAX_VALUE,
            poll_interval_ms: POLL_INTERVAL_MS,
            node_timeout_ms: NODE_TIMEOUT_MS,
            oem_code: DEFAULT_OEM_CODE,
        }
    }
}

impl ArtNetConfig {
    /// Reject intervals the poll scheduler cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms < 4 {
            return Err(ConfigError::ValidationError(format!(
                "artnet.poll_interval_ms must be at least 4, got {}",
                self.poll_interval_ms
            )));
        }
        if self.node_timeout_ms <= self.poll_interval_ms {
            return Err(ConfigError::ValidationError(format!(
                "artnet.node_timeout_ms ({}) must exceed poll_interval_ms ({})",
                self.node_timeout_ms, self.poll_interval_ms
            )));
        }
        if self.interface.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::ValidationError(
                "artnet.interface cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Test-pattern source driven by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Universes to stream.
    pub universes: Vec<u16>,
    /// Frames per second.
    pub fps: u32,
    /// Physical port hint placed in every ArtDmx.
    pub port_index: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            universes: vec![0],
            fps: 44,
            port_index: 0,
        }
    }
}

impl OutputConfig {
    /// Check frame rate and universe range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.fps) {
            return Err(ConfigError::ValidationError(format!(
                "output.fps must be within 1..=1000, got {}",
                self.fps
            )));
        }
        if let Some(u) = self.universes.iter().find(|&&u| u > MAX_PORT_ADDRESS) {
            return Err(ConfigError::ValidationError(format!(
                "output.universes: {u} exceeds {MAX_PORT_ADDRESS}"
            )));
        }
        if self.universes.len() > MAX_UNIVERSES {
            return Err(ConfigError::ValidationError(format!(
                "output.universes: {} entries exceed capacity {MAX_UNIVERSES}",
                self.universes.len()
            )));
        }
        Ok(())
    }
}
