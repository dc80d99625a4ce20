//! # Lumen Art-Net Library
//!
//! Art-Net 4 controller engine: node discovery, DMX fanout and output
//! synchronization over UDP.
//!
//! # Module Structure
//!
//! - [`packet`] - Wire codec for ArtPoll, ArtPollReply, ArtDmx, ArtSync, ArtTrigger
//! - [`universes`] - Sorted fixed-capacity active-universe registry
//! - [`controller`] - `ArtNetController` engine
//! - [`directory`] / [`poll_table`] - Subscriber lookup and the fixed-size table
//! - [`transport`] - `Transport` trait and the UDP socket
//! - [`clock`] / [`trigger`] - Injected time source and trigger callback
//! - [`config`] - TOML configuration of the binary
//! - [`pattern`] - Chase test pattern
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    lumen_artnet (single crate)                   │
//! │  ┌─────────────┐    ┌──────────────────┐    ┌────────────────┐   │
//! │  │  Transport  │◄──►│  ArtNetController │◄──►│   Directory    │   │
//! │  │    (UDP)    │    │  templates + seq │    │  (PollTable)   │   │
//! │  └─────────────┘    └────────┬─────────┘    └────────────────┘   │
//! │                              │                                   │
//! │                              ▼                                   │
//! │                     ┌────────────────┐                           │
//! │                     │ TriggerHandler │ (boxed callback)          │
//! │                     └────────────────┘                           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod packet;
pub mod pattern;
pub mod poll_table;
pub mod transport;
pub mod trigger;
pub mod universes;

// Re-export key types for convenience
pub use crate::clock::{Clock, MonotonicClock};
pub use crate::controller::{ArtNetController, Fanout};
pub use crate::directory::Directory;
pub use crate::error::{ArtNetError, Result};
pub use crate::poll_table::PollTable;
pub use crate::transport::{NetworkInterface, Transport, UdpTransport};
pub use crate::trigger::TriggerHandler;
