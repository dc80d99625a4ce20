//! Common re-exports.
//!
//! ```rust
//! use lumen_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Protocol Constants ─────────────────────────────────────────────
pub use crate::consts::{
    ARTNET_UDP_PORT, DMX_MAX_VALUE, DMX_UNIVERSE_SIZE, MAX_NODES, MAX_UNIVERSES,
    UNICAST_SUBSCRIBER_LIMIT,
};
