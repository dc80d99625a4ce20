//! System-wide constants for the Lumen workspace.
//!
//! Protocol numbers are fixed by Art-Net 4; table sizes bound the memory
//! footprint of the controller on small boards.

/// Well-known Art-Net UDP port.
pub const ARTNET_UDP_PORT: u16 = 6454;

/// Art-Net protocol revision carried in every outbound packet.
pub const ARTNET_PROTOCOL_REVISION: u8 = 14;

/// Highest meaningful 15-bit port-address.
pub const MAX_PORT_ADDRESS: u16 = 0x7FFF;

/// Channels in one DMX512 universe.
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// Full-scale DMX channel value.
pub const DMX_MAX_VALUE: u8 = 255;

/// Maximum number of concurrently transmitted universes.
///
/// Sizes both the active-universe registry and the poll table's universe index.
pub const MAX_UNIVERSES: usize = 128;

/// Maximum number of discovered nodes held by the poll table.
pub const MAX_NODES: usize = 255;

/// Subscriber count above which a universe is broadcast instead of unicast.
pub const UNICAST_SUBSCRIBER_LIMIT: usize = 40;

/// Interval between ArtPoll broadcasts (ms).
pub const POLL_INTERVAL_MS: u32 = 8_000;

/// Age after which a silent node is evicted from the poll table (ms).
pub const NODE_TIMEOUT_MS: u32 = 3 * POLL_INTERVAL_MS;

/// Default OEM code used to filter ArtTrigger packets.
pub const DEFAULT_OEM_CODE: u16 = 0x20E0;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/lumen/artnet.toml";
