//! Art-Net wire codec.
//!
//! Outbound packets (`ArtPoll`, `ArtDmx`, `ArtSync`) are fixed-size byte
//! buffers built once and patched in place. Inbound packets (`ArtPollReply`,
//! `ArtTrigger`) are borrowed, bounds-checked views over a receive buffer.
//!
//! All multi-byte fields follow Art-Net 4: the opcode and port-address are
//! little-endian, the protocol version and DMX length are big-endian.

use bitflags::bitflags;
use lumen_common::consts::{ARTNET_PROTOCOL_REVISION, DMX_UNIVERSE_SIZE};
use static_assertions::{const_assert, const_assert_eq};
use std::net::Ipv4Addr;

/// Packet preamble: `"Art-Net\0"`.
pub const ARTNET_ID: [u8; 8] = *b"Art-Net\0";

/// Shortest datagram that can carry ID, opcode and protocol version.
pub const ARTNET_MIN_HEADER_SIZE: usize = 12;

/// Receive buffer size; large enough for every packet the controller parses.
pub const ART_PACKET_MAX_SIZE: usize = ART_DMX_SIZE;

// ─── Field Offsets ──────────────────────────────────────────────────

/// Opcode (u16 LE).
pub const OFFSET_OPCODE: usize = 8;
/// Protocol version high byte.
pub const OFFSET_PROT_VER_HI: usize = 10;
/// Protocol version low byte.
pub const OFFSET_PROT_VER_LO: usize = 11;

/// ArtPoll: TalkToMe flags.
pub const POLL_TALK_TO_ME: usize = 12;
/// ArtPoll: diagnostics priority.
pub const POLL_PRIORITY: usize = 13;
/// ArtPoll size.
pub const ART_POLL_SIZE: usize = 14;

/// ArtSync size (two zero aux bytes after the header).
pub const ART_SYNC_SIZE: usize = 14;

/// ArtDmx: sequence number.
pub const DMX_SEQUENCE: usize = 12;
/// ArtDmx: physical input port.
pub const DMX_PHYSICAL: usize = 13;
/// ArtDmx: port-address (SubUni, Net).
pub const DMX_PORT_ADDRESS: usize = 14;
/// ArtDmx: length high byte.
pub const DMX_LENGTH_HI: usize = 16;
/// ArtDmx: length low byte.
pub const DMX_LENGTH_LO: usize = 17;
/// ArtDmx: first channel.
pub const DMX_DATA: usize = 18;
/// ArtDmx size with a full universe.
pub const ART_DMX_SIZE: usize = DMX_DATA + DMX_UNIVERSE_SIZE;

/// ArtPollReply: node IPv4 address.
pub const POLL_REPLY_IP: usize = 10;
/// ArtPollReply: UDP port (u16 LE).
pub const POLL_REPLY_PORT: usize = 14;
/// ArtPollReply: Net switch (bits 14-8 of the port-address).
pub const POLL_REPLY_NET_SWITCH: usize = 18;
/// ArtPollReply: Sub switch (bits 7-4 of the port-address).
pub const POLL_REPLY_SUB_SWITCH: usize = 19;
/// ArtPollReply: OEM high byte.
pub const POLL_REPLY_OEM_HI: usize = 20;
/// ArtPollReply: OEM low byte.
pub const POLL_REPLY_OEM_LO: usize = 21;
/// ArtPollReply: short name, NUL padded.
pub const POLL_REPLY_SHORT_NAME: usize = 26;
/// ArtPollReply: short name length.
pub const POLL_REPLY_SHORT_NAME_LEN: usize = 18;
/// ArtPollReply: long name, NUL padded.
pub const POLL_REPLY_LONG_NAME: usize = 44;
/// ArtPollReply: long name length.
pub const POLL_REPLY_LONG_NAME_LEN: usize = 64;
/// ArtPollReply: number of ports, low byte.
pub const POLL_REPLY_NUM_PORTS_LO: usize = 173;
/// ArtPollReply: per-port type flags.
pub const POLL_REPLY_PORT_TYPES: usize = 174;
/// ArtPollReply: per-port output universe (bits 3-0 of the port-address).
pub const POLL_REPLY_SW_OUT: usize = 190;
/// ArtPollReply: Art-Net 3 packet size.
pub const ART_POLL_REPLY_SIZE: usize = 239;
/// ArtPollReply: shortest reply that still carries the output switches.
pub const ART_POLL_REPLY_MIN_SIZE: usize = POLL_REPLY_SW_OUT + PORTS_PER_NODE;

/// Ports described by one ArtPollReply.
pub const PORTS_PER_NODE: usize = 4;
/// PortTypes bit: the port can output DMX from the network.
pub const PORT_TYPE_OUTPUT: u8 = 0x80;

/// ArtTrigger: OEM high byte.
pub const TRIGGER_OEM_HI: usize = 14;
/// ArtTrigger: OEM low byte.
pub const TRIGGER_OEM_LO: usize = 15;
/// ArtTrigger: key.
pub const TRIGGER_KEY: usize = 16;
/// ArtTrigger: sub-key.
pub const TRIGGER_SUB_KEY: usize = 17;
/// ArtTrigger: payload.
pub const TRIGGER_DATA: usize = 18;
/// ArtTrigger size.
pub const ART_TRIGGER_SIZE: usize = TRIGGER_DATA + 512;

/// OEM code accepted by every device.
pub const OEM_BROADCAST: u16 = 0xFFFF;

const_assert_eq!(ARTNET_ID.len(), OFFSET_OPCODE);
const_assert_eq!(ART_DMX_SIZE, 530);
const_assert_eq!(ART_TRIGGER_SIZE, ART_DMX_SIZE);
const_assert!(ART_POLL_REPLY_MIN_SIZE <= ART_POLL_REPLY_SIZE);
const_assert!(ART_POLL_REPLY_SIZE <= ART_PACKET_MAX_SIZE);

// ─── OpCode ─────────────────────────────────────────────────────────

/// Art-Net operation codes handled by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OpCode {
    /// Discovery request.
    Poll = 0x2000,
    /// Discovery response.
    PollReply = 0x2100,
    /// DMX512 frame.
    Dmx = 0x5000,
    /// Apply buffered frames.
    Sync = 0x5200,
    /// Out-of-band command.
    Trigger = 0x9900,
}

impl OpCode {
    /// Convert from the raw wire value. Returns `None` for opcodes the
    /// controller does not know.
    #[inline]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x2000 => Some(Self::Poll),
            0x2100 => Some(Self::PollReply),
            0x5000 => Some(Self::Dmx),
            0x5200 => Some(Self::Sync),
            0x9900 => Some(Self::Trigger),
            _ => None,
        }
    }
}

bitflags! {
    /// ArtPoll `TalkToMe` behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TalkToMe: u8 {
        /// Nodes send ArtPollReply whenever their conditions change.
        const REPLY_ON_CHANGE = 0x02;
        /// Nodes send diagnostics messages.
        const DIAGNOSTICS = 0x04;
        /// Diagnostics are unicast rather than broadcast.
        const DIAGNOSTICS_UNICAST = 0x08;
        /// Disable VLC transmission.
        const DISABLE_VLC = 0x10;
        /// Only nodes inside the target port-address range reply.
        const TARGETED = 0x20;
    }
}

/// Validate the Art-Net preamble and return the raw opcode.
///
/// Returns `None` for datagrams shorter than [`ARTNET_MIN_HEADER_SIZE`] or
/// without the exact `"Art-Net\0"` ID.
#[inline]
pub fn parse_header(datagram: &[u8]) -> Option<u16> {
    if datagram.len() < ARTNET_MIN_HEADER_SIZE || datagram[..OFFSET_OPCODE] != ARTNET_ID {
        return None;
    }
    Some(u16::from_le_bytes([
        datagram[OFFSET_OPCODE],
        datagram[OFFSET_OPCODE + 1],
    ]))
}

fn write_header(buf: &mut [u8], opcode: OpCode) {
    buf[..OFFSET_OPCODE].copy_from_slice(&ARTNET_ID);
    buf[OFFSET_OPCODE..OFFSET_OPCODE + 2].copy_from_slice(&(opcode as u16).to_le_bytes());
    buf[OFFSET_PROT_VER_HI] = 0;
    buf[OFFSET_PROT_VER_LO] = ARTNET_PROTOCOL_REVISION;
}

// ─── Outbound Templates ─────────────────────────────────────────────

/// ArtPoll template. Static after construction.
#[derive(Debug, Clone)]
pub struct ArtPoll {
    buf: [u8; ART_POLL_SIZE],
}

impl ArtPoll {
    /// Build a poll asking nodes to reply on change.
    pub fn new(talk_to_me: TalkToMe) -> Self {
        let mut buf = [0u8; ART_POLL_SIZE];
        write_header(&mut buf, OpCode::Poll);
        buf[POLL_TALK_TO_ME] = talk_to_me.bits();
        Self { buf }
    }

    /// Current TalkToMe flags.
    pub fn talk_to_me(&self) -> TalkToMe {
        TalkToMe::from_bits_retain(self.buf[POLL_TALK_TO_ME])
    }

    /// Wire bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for ArtPoll {
    fn default() -> Self {
        Self::new(TalkToMe::REPLY_ON_CHANGE)
    }
}

/// ArtSync template. Static after construction.
#[derive(Debug, Clone)]
pub struct ArtSync {
    buf: [u8; ART_SYNC_SIZE],
}

impl ArtSync {
    /// Build a sync packet.
    pub fn new() -> Self {
        let mut buf = [0u8; ART_SYNC_SIZE];
        write_header(&mut buf, OpCode::Sync);
        Self { buf }
    }

    /// Wire bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for ArtSync {
    fn default() -> Self {
        Self::new()
    }
}

/// ArtDmx template, patched in place for every frame.
///
/// The sequence counter lives in the template itself and is shared by every
/// universe sent through it.
#[derive(Debug, Clone)]
pub struct ArtDmx {
    buf: [u8; ART_DMX_SIZE],
}

impl ArtDmx {
    /// Build an empty frame. The sequence starts at 0 so the first advance
    /// yields 1.
    pub fn new() -> Self {
        let mut buf = [0u8; ART_DMX_SIZE];
        write_header(&mut buf, OpCode::Dmx);
        Self { buf }
    }

    /// Current sequence number.
    #[inline]
    pub fn sequence(&self) -> u8 {
        self.buf[DMX_SEQUENCE]
    }

    /// Advance the sequence within 1..=255; 0 is never produced.
    #[inline]
    pub fn advance_sequence(&mut self) -> u8 {
        let next = match self.buf[DMX_SEQUENCE].wrapping_add(1) {
            0 => 1,
            n => n,
        };
        self.buf[DMX_SEQUENCE] = next;
        next
    }

    /// Physical input port hint.
    #[inline]
    pub fn physical(&self) -> u8 {
        self.buf[DMX_PHYSICAL]
    }

    /// Set the physical input port hint.
    #[inline]
    pub fn set_physical(&mut self, port: u8) {
        self.buf[DMX_PHYSICAL] = port;
    }

    /// Target port-address.
    #[inline]
    pub fn port_address(&self) -> u16 {
        u16::from_le_bytes([self.buf[DMX_PORT_ADDRESS], self.buf[DMX_PORT_ADDRESS + 1]])
    }

    /// Set the target port-address.
    #[inline]
    pub fn set_port_address(&mut self, universe: u16) {
        self.buf[DMX_PORT_ADDRESS..DMX_PORT_ADDRESS + 2].copy_from_slice(&universe.to_le_bytes());
    }

    /// Channel count in the length field.
    #[inline]
    pub fn length(&self) -> usize {
        u16::from_be_bytes([self.buf[DMX_LENGTH_HI], self.buf[DMX_LENGTH_LO]]) as usize
    }

    /// Set the channel count. Clamped to a full universe.
    #[inline]
    pub fn set_length(&mut self, length: usize) {
        let length = length.min(DMX_UNIVERSE_SIZE) as u16;
        self.buf[DMX_LENGTH_HI] = (length >> 8) as u8;
        self.buf[DMX_LENGTH_LO] = (length & 0xFF) as u8;
    }

    /// The full 512-channel payload area.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf[DMX_DATA..]
    }

    /// Channel data covered by the length field.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buf[DMX_DATA..DMX_DATA + self.length()]
    }

    /// Wire bytes: header plus `length` channels.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..DMX_DATA + self.length()]
    }
}

impl Default for ArtDmx {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inbound Views ──────────────────────────────────────────────────

/// Borrowed view of a received ArtPollReply.
#[derive(Debug, Clone, Copy)]
pub struct ArtPollReply<'a> {
    bytes: &'a [u8],
}

impl<'a> ArtPollReply<'a> {
    /// Wrap a validated datagram. Returns `None` if it is too short to carry
    /// the output switch fields.
    pub fn parse(datagram: &'a [u8]) -> Option<Self> {
        (datagram.len() >= ART_POLL_REPLY_MIN_SIZE).then_some(Self { bytes: datagram })
    }

    /// Node IPv4 address as announced in the packet.
    pub fn ip(&self) -> Ipv4Addr {
        let b = &self.bytes[POLL_REPLY_IP..POLL_REPLY_IP + 4];
        Ipv4Addr::new(b[0], b[1], b[2], b[3])
    }

    /// Announced UDP port.
    pub fn port(&self) -> u16 {
        u16::from_le_bytes([self.bytes[POLL_REPLY_PORT], self.bytes[POLL_REPLY_PORT + 1]])
    }

    /// Net switch (7 bits).
    pub fn net_switch(&self) -> u8 {
        self.bytes[POLL_REPLY_NET_SWITCH] & 0x7F
    }

    /// Sub switch (4 bits).
    pub fn sub_switch(&self) -> u8 {
        self.bytes[POLL_REPLY_SUB_SWITCH] & 0x0F
    }

    /// Node OEM code.
    pub fn oem(&self) -> u16 {
        u16::from_be_bytes([
            self.bytes[POLL_REPLY_OEM_HI],
            self.bytes[POLL_REPLY_OEM_LO],
        ])
    }

    /// Number of ports the node reports (clamped to four).
    pub fn num_ports(&self) -> usize {
        usize::from(self.bytes[POLL_REPLY_NUM_PORTS_LO]).min(PORTS_PER_NODE)
    }

    /// Short name up to the first NUL. Lossy on invalid UTF-8.
    pub fn short_name(&self) -> String {
        name_field(self.bytes, POLL_REPLY_SHORT_NAME, POLL_REPLY_SHORT_NAME_LEN)
    }

    /// Long name up to the first NUL. Lossy on invalid UTF-8.
    pub fn long_name(&self) -> String {
        name_field(self.bytes, POLL_REPLY_LONG_NAME, POLL_REPLY_LONG_NAME_LEN)
    }

    /// Port-addresses of every port flagged as a DMX output.
    pub fn output_universes(&self) -> impl Iterator<Item = u16> + '_ {
        let base = (u16::from(self.net_switch()) << 8) | (u16::from(self.sub_switch()) << 4);
        (0..PORTS_PER_NODE).filter_map(move |port| {
            let port_type = self.bytes[POLL_REPLY_PORT_TYPES + port];
            (port_type & PORT_TYPE_OUTPUT != 0)
                .then(|| base | u16::from(self.bytes[POLL_REPLY_SW_OUT + port] & 0x0F))
        })
    }
}

fn name_field(bytes: &[u8], offset: usize, len: usize) -> String {
    let end = (offset + len).min(bytes.len());
    let Some(field) = bytes.get(offset..end) else {
        return String::new();
    };
    let field = field.split(|&b| b == 0).next().unwrap_or_default();
    String::from_utf8_lossy(field).into_owned()
}

/// ArtTrigger key values defined by Art-Net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKey {
    /// Sub-key is an ASCII character to process as a keypress.
    Ascii,
    /// Sub-key is a macro number to execute.
    Macro,
    /// Sub-key is a soft-key number to process.
    Soft,
    /// Sub-key is a show number to run.
    Show,
    /// Undefined or manufacturer specific.
    Other(u8),
}

impl From<u8> for TriggerKey {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Ascii,
            1 => Self::Macro,
            2 => Self::Soft,
            3 => Self::Show,
            other => Self::Other(other),
        }
    }
}

/// Borrowed view of a received ArtTrigger.
#[derive(Debug, Clone, Copy)]
pub struct ArtTrigger<'a> {
    bytes: &'a [u8],
}

impl<'a> ArtTrigger<'a> {
    /// Wrap a validated datagram. Returns `None` if the key fields are
    /// missing. The payload may be shorter than 512 bytes.
    pub fn parse(datagram: &'a [u8]) -> Option<Self> {
        (datagram.len() >= TRIGGER_DATA).then_some(Self { bytes: datagram })
    }

    /// OEM code the trigger is addressed to.
    pub fn oem(&self) -> u16 {
        u16::from_be_bytes([self.bytes[TRIGGER_OEM_HI], self.bytes[TRIGGER_OEM_LO]])
    }

    /// True for the universal OEM code or an exact match on both bytes.
    pub fn accepts(&self, oem_code: u16) -> bool {
        let oem = self.oem();
        oem == OEM_BROADCAST || oem == oem_code
    }

    /// Raw key.
    pub fn key(&self) -> u8 {
        self.bytes[TRIGGER_KEY]
    }

    /// Sub-key.
    pub fn sub_key(&self) -> u8 {
        self.bytes[TRIGGER_SUB_KEY]
    }

    /// Payload, at most 512 bytes.
    pub fn payload(&self) -> &'a [u8] {
        let end = self.bytes.len().min(ART_TRIGGER_SIZE);
        &self.bytes[TRIGGER_DATA..end]
    }
}
