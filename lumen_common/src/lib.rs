//! Lumen Common Library
//!
//! Shared constants and configuration loading used by every Lumen crate.
//!
//! # Module Structure
//!
//! - [`consts`] - Protocol numbers and table capacities
//! - [`config`] - TOML configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use lumen_common::consts::{ARTNET_UDP_PORT, MAX_UNIVERSES};
//! use lumen_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
