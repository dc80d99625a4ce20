//! Shared fixtures for controller integration tests.

#![allow(dead_code)]

use lumen_artnet::config::ArtNetConfig;
use lumen_artnet::packet::{
    ART_POLL_REPLY_SIZE, ART_TRIGGER_SIZE, ARTNET_ID, ArtPollReply, PORT_TYPE_OUTPUT,
    POLL_REPLY_IP, POLL_REPLY_NET_SWITCH, POLL_REPLY_PORT_TYPES, POLL_REPLY_SUB_SWITCH,
    POLL_REPLY_SW_OUT, TRIGGER_DATA, TRIGGER_KEY, TRIGGER_OEM_HI, TRIGGER_OEM_LO,
    TRIGGER_SUB_KEY,
};
use lumen_artnet::{ArtNetController, Clock, Directory, Transport};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;
use std::net::Ipv4Addr;
use std::rc::Rc;

pub const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 100);
pub const BROADCAST: Ipv4Addr = Ipv4Addr::new(10, 255, 255, 255);
pub const PORT: u16 = 6454;

/// One datagram handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub bytes: Vec<u8>,
    pub addr: Ipv4Addr,
    pub port: u16,
}

impl Sent {
    pub fn opcode(&self) -> u16 {
        u16::from_le_bytes([self.bytes[8], self.bytes[9]])
    }

    pub fn is_broadcast(&self) -> bool {
        self.addr == BROADCAST
    }
}

/// Transport that records every send and replays queued inbound datagrams.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<Sent>,
    pub inbound: VecDeque<(Vec<u8>, Ipv4Addr)>,
    /// Send attempts so far, failed ones included.
    pub attempts: usize,
    /// Attempt numbers that fail with `ConnectionRefused`.
    pub fail_on: BTreeSet<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&mut self, bytes: Vec<u8>, from: Ipv4Addr) {
        self.inbound.push_back((bytes, from));
    }

    /// Fail the `n`-th send from now (0 is the next one).
    pub fn fail_nth(&mut self, n: usize) {
        self.fail_on.insert(self.attempts + n);
    }

    pub fn opcodes(&self) -> Vec<u16> {
        self.sent.iter().map(Sent::opcode).collect()
    }

    pub fn count(&self, opcode: u16) -> usize {
        self.sent.iter().filter(|s| s.opcode() == opcode).count()
    }

    pub fn take(&mut self) -> Vec<Sent> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for RecordingTransport {
    fn send_to(&mut self, bytes: &[u8], addr: Ipv4Addr, port: u16) -> io::Result<()> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_on.contains(&attempt) {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        self.sent.push(Sent {
            bytes: bytes.to_vec(),
            addr,
            port,
        });
        Ok(())
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, Ipv4Addr, u16)>> {
        let Some((bytes, from)) = self.inbound.pop_front() else {
            return Ok(None);
        };
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);
        Ok(Some((len, from, PORT)))
    }

    fn local_address(&self) -> Ipv4Addr {
        LOCAL
    }

    fn broadcast_address(&self) -> Ipv4Addr {
        BROADCAST
    }
}

/// Clock advanced by hand; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<u32>>);

impl ManualClock {
    pub fn new(start: u32) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    pub fn set(&self, millis: u32) {
        self.0.set(millis);
    }

    pub fn advance(&self, millis: u32) {
        self.0.set(self.0.get().wrapping_add(millis));
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u32 {
        self.0.get()
    }
}

/// Directory backed by a map, recording what the controller fed it.
#[derive(Debug, Default)]
pub struct MapDirectory {
    pub subscribers: BTreeMap<u16, Vec<Ipv4Addr>>,
    pub added: Vec<(Ipv4Addr, u32)>,
    pub sweeps: Vec<u32>,
}

impl MapDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Universe with `count` subscribers 10.1.x.y.
    pub fn with_subscribers(universe: u16, count: usize) -> Self {
        let mut directory = Self::new();
        directory.subscribers.insert(universe, addresses(count));
        directory
    }
}

impl Directory for MapDirectory {
    fn add(&mut self, reply: &ArtPollReply<'_>, now_millis: u32) {
        self.added.push((reply.ip(), now_millis));
        for universe in reply.output_universes() {
            let list = self.subscribers.entry(universe).or_default();
            if !list.contains(&reply.ip()) {
                list.push(reply.ip());
            }
        }
    }

    fn lookup(&self, universe: u16) -> Option<&[Ipv4Addr]> {
        self.subscribers.get(&universe).map(Vec::as_slice)
    }

    fn sweep(&mut self, now_millis: u32) {
        self.sweeps.push(now_millis);
    }
}

pub fn addresses(count: usize) -> Vec<Ipv4Addr> {
    (0..count)
        .map(|i| Ipv4Addr::new(10, 1, (i / 250) as u8, (i % 250) as u8 + 1))
        .collect()
}

pub type TestController = ArtNetController<RecordingTransport, MapDirectory, ManualClock>;

pub fn controller(config: &ArtNetConfig, directory: MapDirectory) -> (TestController, ManualClock) {
    let clock = ManualClock::new(0);
    let controller =
        ArtNetController::new(config, RecordingTransport::new(), directory, clock.clone());
    (controller, clock)
}

pub fn started(config: &ArtNetConfig, directory: MapDirectory) -> (TestController, ManualClock) {
    let (mut controller, clock) = controller(config, directory);
    controller.start().unwrap();
    controller.transport_mut().take();
    (controller, clock)
}

/// ArtPollReply from `ip` with one output port per `sw_out` entry.
pub fn poll_reply(ip: Ipv4Addr, net: u8, sub: u8, sw_out: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; ART_POLL_REPLY_SIZE];
    buf[..8].copy_from_slice(&ARTNET_ID);
    buf[8..10].copy_from_slice(&0x2100u16.to_le_bytes());
    buf[POLL_REPLY_IP..POLL_REPLY_IP + 4].copy_from_slice(&ip.octets());
    buf[POLL_REPLY_NET_SWITCH] = net;
    buf[POLL_REPLY_SUB_SWITCH] = sub;
    for (port, &sw) in sw_out.iter().enumerate() {
        buf[POLL_REPLY_PORT_TYPES + port] = PORT_TYPE_OUTPUT;
        buf[POLL_REPLY_SW_OUT + port] = sw;
    }
    buf
}

/// ArtTrigger addressed to `oem`.
pub fn trigger(oem: u16, key: u8, sub_key: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; TRIGGER_DATA + payload.len().min(ART_TRIGGER_SIZE - TRIGGER_DATA)];
    buf[..8].copy_from_slice(&ARTNET_ID);
    buf[8..10].copy_from_slice(&0x9900u16.to_le_bytes());
    buf[10] = 0;
    buf[11] = 14;
    let [hi, lo] = oem.to_be_bytes();
    buf[TRIGGER_OEM_HI] = hi;
    buf[TRIGGER_OEM_LO] = lo;
    buf[TRIGGER_KEY] = key;
    buf[TRIGGER_SUB_KEY] = sub_key;
    let len = buf.len() - TRIGGER_DATA;
    buf[TRIGGER_DATA..].copy_from_slice(&payload[..len]);
    buf
}
