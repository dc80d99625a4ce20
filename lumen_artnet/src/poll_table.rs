//! Fixed-capacity poll table.
//!
//! Nodes announce themselves with ArtPollReply; each output port maps to a
//! 15-bit port-address. The table keeps a node list with last-seen
//! timestamps and a universe index sorted by universe, both in `heapless`
//! storage. Exhaustion drops the new entry with a warning.

use heapless::Vec as FixedVec;
use lumen_common::consts::{MAX_NODES, MAX_UNIVERSES, NODE_TIMEOUT_MS};
use std::net::Ipv4Addr;
use tracing::{debug, warn};

use crate::directory::Directory;
use crate::packet::{ArtPollReply, PORTS_PER_NODE};

/// One discovered node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    /// Announced IPv4 address.
    pub ip: Ipv4Addr,
    /// Controller clock at the last ArtPollReply.
    pub last_seen: u32,
    /// Output port-addresses, ascending.
    pub universes: FixedVec<u16, PORTS_PER_NODE>,
}

#[derive(Debug, Clone)]
struct Subscribers {
    universe: u16,
    addresses: FixedVec<Ipv4Addr, MAX_NODES>,
}

/// Directory backed by fixed-size tables.
#[derive(Debug, Clone)]
pub struct PollTable {
    nodes: FixedVec<NodeEntry, MAX_NODES>,
    universes: FixedVec<Subscribers, MAX_UNIVERSES>,
    node_timeout_ms: u32,
}

impl PollTable {
    /// Empty table evicting nodes silent for longer than `node_timeout_ms`.
    pub fn new(node_timeout_ms: u32) -> Self {
        Self {
            nodes: FixedVec::new(),
            universes: FixedVec::new(),
            node_timeout_ms,
        }
    }

    /// Discovered nodes in discovery order (until the first eviction).
    pub fn nodes(&self) -> &[NodeEntry] {
        &self.nodes
    }

    /// Number of discovered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of universes with at least one subscriber.
    pub fn universe_count(&self) -> usize {
        self.universes.len()
    }

    /// `(universe, subscribers)` pairs in ascending universe order.
    pub fn universes(&self) -> impl Iterator<Item = (u16, &[Ipv4Addr])> {
        self.universes
            .iter()
            .map(|s| (s.universe, s.addresses.as_slice()))
    }

    fn position(&self, universe: u16) -> Result<usize, usize> {
        self.universes.binary_search_by_key(&universe, |s| s.universe)
    }

    fn subscribe(&mut self, universe: u16, ip: Ipv4Addr) {
        let index = match self.position(universe) {
            Ok(index) => index,
            Err(index) => {
                let entry = Subscribers {
                    universe,
                    addresses: FixedVec::new(),
                };
                if self.universes.insert(index, entry).is_err() {
                    warn!(universe, %ip, "Poll table universe index full, entry ignored");
                    return;
                }
                index
            }
        };

        let addresses = &mut self.universes[index].addresses;
        if !addresses.contains(&ip) && addresses.push(ip).is_err() {
            warn!(universe, %ip, "Subscriber list full, entry ignored");
        }
    }

    fn unsubscribe(&mut self, universe: u16, ip: Ipv4Addr) {
        let Ok(index) = self.position(universe) else {
            return;
        };
        let addresses = &mut self.universes[index].addresses;
        if let Some(pos) = addresses.iter().position(|a| *a == ip) {
            addresses.remove(pos);
        }
        if addresses.is_empty() {
            self.universes.remove(index);
        }
    }
}

impl Default for PollTable {
    fn default() -> Self {
        Self::new(NODE_TIMEOUT_MS)
    }
}

impl Directory for PollTable {
    fn add(&mut self, reply: &ArtPollReply<'_>, now_millis: u32) {
        let ip = reply.ip();
        let mut outputs: FixedVec<u16, PORTS_PER_NODE> = FixedVec::new();
        for universe in reply.output_universes() {
            if !outputs.contains(&universe) {
                // At most PORTS_PER_NODE distinct values.
                let _ = outputs.push(universe);
            }
        }
        outputs.sort_unstable();

        match self.nodes.iter().position(|n| n.ip == ip) {
            Some(index) => {
                let node = &mut self.nodes[index];
                node.last_seen = now_millis;
                if node.universes != outputs {
                    let previous = core::mem::replace(&mut node.universes, outputs.clone());
                    for &universe in previous.iter().filter(|u| !outputs.contains(u)) {
                        self.unsubscribe(universe, ip);
                    }
                }
            }
            None => {
                let node = NodeEntry {
                    ip,
                    last_seen: now_millis,
                    universes: outputs.clone(),
                };
                if self.nodes.push(node).is_err() {
                    warn!(%ip, "Poll table full ({MAX_NODES} nodes), node ignored");
                    return;
                }
                debug!(
                    %ip,
                    port = reply.port(),
                    oem = reply.oem(),
                    ports = reply.num_ports(),
                    name = %reply.short_name(),
                    long_name = %reply.long_name(),
                    universes = ?outputs.as_slice(),
                    "Node discovered"
                );
            }
        }

        for &universe in &outputs {
            self.subscribe(universe, ip);
        }
    }

    fn lookup(&self, universe: u16) -> Option<&[Ipv4Addr]> {
        self.position(universe)
            .ok()
            .map(|index| self.universes[index].addresses.as_slice())
    }

    fn sweep(&mut self, now_millis: u32) {
        let timeout = self.node_timeout_ms;
        while let Some(index) = self
            .nodes
            .iter()
            .position(|n| now_millis.wrapping_sub(n.last_seen) > timeout)
        {
            let node = self.nodes.swap_remove(index);
            for &universe in &node.universes {
                self.unsubscribe(universe, node.ip);
            }
            debug!(ip = %node.ip, "Node expired");
        }
    }
}
