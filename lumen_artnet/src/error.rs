//! Error types for the Art-Net engine.

use lumen_common::config::ConfigError;
use lumen_common::consts::DMX_UNIVERSE_SIZE;
use std::io;
use thiserror::Error;

use crate::universes::RegistryFull;

/// Errors surfaced by the controller and its collaborators.
///
/// Malformed inbound traffic is never reported here; it is dropped.
#[derive(Debug, Error)]
pub enum ArtNetError {
    /// Socket send/receive failure. Not retried.
    #[error("Transport error: {0}")]
    Io(#[from] io::Error),

    /// The active-universe registry is at capacity.
    #[error(transparent)]
    RegistryFull(#[from] RegistryFull),

    /// Caller passed more than one universe of channel data.
    #[error("DMX frame of {0} channels exceeds {max}", max = DMX_UNIVERSE_SIZE)]
    FrameTooLong(usize),

    /// No IPv4 interface matched the request.
    #[error("No usable IPv4 interface: {0}")]
    InterfaceNotFound(String),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ArtNetError>;
