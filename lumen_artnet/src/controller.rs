//! Art-Net controller.
//!
//! Owns the outbound packet templates, the shared ArtDmx sequence counter,
//! the active-universe registry and the fanout policy, and runs the inbound
//! dispatch for discovery replies and triggers.
//!
//! # Reactive loop
//!
//! ```text
//! Idle ──tick──► PollSent ──ArtPollReply*──► Directory updated
//!   ▲                                              │
//!   └──── flush_sync ◄── FrameBuffered ◄── send_dmx┘
//! ```
//!
//! There is no connection state: every exchange is a single UDP datagram.
//! All state is confined to the owning thread; every operation takes
//! `&mut self` because the templates are patched in place.

use lumen_common::consts::{
    ARTNET_UDP_PORT, DMX_MAX_VALUE, DMX_UNIVERSE_SIZE, MAX_NODES, MAX_UNIVERSES,
    UNICAST_SUBSCRIBER_LIMIT,
};
use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::config::ArtNetConfig;
use crate::directory::Directory;
use crate::error::{ArtNetError, Result};
use crate::packet::{
    ART_PACKET_MAX_SIZE, ArtDmx, ArtPoll, ArtPollReply, ArtSync, ArtTrigger, OpCode, TalkToMe,
    TriggerKey, parse_header,
};
use crate::transport::Transport;
use crate::trigger::TriggerHandler;
use crate::universes::ActiveUniverses;

/// How a frame left the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fanout {
    /// Sent once to each of this many subscribers.
    Unicast(usize),
    /// Sent once to the broadcast address.
    Broadcast,
    /// Unicast mode with no known subscriber: nothing sent.
    Dropped,
}

impl Fanout {
    /// Decide the fanout for a universe.
    ///
    /// Unicast mode sends to up to [`UNICAST_SUBSCRIBER_LIMIT`] subscribers
    /// and degrades to broadcast beyond that. Without any subscriber the
    /// frame is dropped rather than broadcast.
    pub fn plan(unicast: bool, subscribers: Option<&[Ipv4Addr]>) -> Self {
        if !unicast {
            return Fanout::Broadcast;
        }
        match subscribers {
            None | Some([]) => Fanout::Dropped,
            Some(s) if s.len() <= UNICAST_SUBSCRIBER_LIMIT => Fanout::Unicast(s.len()),
            Some(_) => Fanout::Broadcast,
        }
    }

    /// True if at least one datagram is sent.
    pub fn transmits(self) -> bool {
        !matches!(self, Fanout::Dropped)
    }
}

/// Send `bytes` to every target of `fanout`. A failed send does not stop the
/// batch; returns the number of datagrams delivered and the first error.
fn transmit<T: Transport>(
    transport: &mut T,
    bytes: &[u8],
    fanout: Fanout,
    subscribers: Option<&[Ipv4Addr]>,
    broadcast: Ipv4Addr,
    port: u16,
) -> (usize, Option<io::Error>) {
    let targets: &[Ipv4Addr] = match fanout {
        Fanout::Unicast(_) => subscribers.unwrap_or_default(),
        Fanout::Broadcast => std::slice::from_ref(&broadcast),
        Fanout::Dropped => &[],
    };

    let mut delivered = 0;
    let mut first_error = None;
    for &addr in targets {
        match transport.send_to(bytes, addr, port) {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(%addr, "Send failed: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    (delivered, first_error)
}

/// Art-Net controller engine.
pub struct ArtNetController<T: Transport, D: Directory, C: Clock> {
    transport: T,
    directory: D,
    clock: C,

    dmx: ArtDmx,
    poll: ArtPoll,
    sync: ArtSync,
    rx: [u8; ART_PACKET_MAX_SIZE],
    active: ActiveUniverses<MAX_UNIVERSES>,

    port: u16,
    local: Ipv4Addr,
    broadcast: Ipv4Addr,

    unicast: bool,
    synchronization: bool,
    table_cleanup: bool,
    master: u8,
    oem_code: u16,
    poll_interval_ms: u32,

    last_poll_ms: u32,
    dmx_pending: bool,
    running: bool,
    trigger: Option<Box<dyn TriggerHandler>>,
}

impl<T: Transport, D: Directory, C: Clock> ArtNetController<T, D, C> {
    /// Build a controller from configuration and its collaborators.
    ///
    /// Nothing is sent until [`start`](Self::start).
    pub fn new(config: &ArtNetConfig, transport: T, directory: D, clock: C) -> Self {
        let local = transport.local_address();
        let broadcast = transport.broadcast_address();

        Self {
            transport,
            directory,
            clock,
            dmx: ArtDmx::new(),
            poll: ArtPoll::new(TalkToMe::REPLY_ON_CHANGE),
            sync: ArtSync::new(),
            rx: [0u8; ART_PACKET_MAX_SIZE],
            active: ActiveUniverses::new(),
            port: config.port,
            local,
            broadcast,
            unicast: config.unicast,
            synchronization: config.synchronization,
            table_cleanup: config.table_cleanup,
            master: config.master,
            oem_code: config.oem_code,
            poll_interval_ms: config.poll_interval_ms,
            last_poll_ms: 0,
            dmx_pending: false,
            running: false,
            trigger: None,
        }
    }

    /// Refresh interface addresses and broadcast the first ArtPoll.
    pub fn start(&mut self) -> Result<()> {
        self.local = self.transport.local_address();
        self.broadcast = self.transport.broadcast_address();

        self.transport
            .send_to(self.poll.as_bytes(), self.broadcast, self.port)?;
        self.running = true;

        info!(
            local = %self.local,
            broadcast = %self.broadcast,
            unicast = self.unicast,
            synchronization = self.synchronization,
            "Art-Net controller started"
        );
        Ok(())
    }

    /// Stop servicing the network. [`run_once`](Self::run_once) becomes a
    /// no-op; outbound calls still work so a final blackout can be sent.
    pub fn stop(&mut self) {
        if self.running {
            info!("Art-Net controller stopped");
        }
        self.running = false;
    }

    /// True between [`start`](Self::start) and [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// One scheduling tick: poll (unicast only), then handle at most one
    /// inbound datagram. Returns the opcode dispatched, if any.
    pub fn run_once(&mut self) -> Result<Option<OpCode>> {
        if !self.running {
            return Ok(None);
        }
        if self.unicast {
            let now = self.clock.now_millis();
            self.poll(now)?;
        }
        self.receive_and_dispatch()
    }

    // ─── Outbound ───────────────────────────────────────────────────

    /// Send one universe of channel data.
    ///
    /// Registers the universe, advances the shared sequence, applies the
    /// master dimmer and fans the frame out. The length field follows
    /// `data.len()`.
    ///
    /// # Errors
    /// `FrameTooLong` for more than 512 channels. `Io` carries the first
    /// failed send; the remaining targets are still tried and the sync is
    /// marked pending if any datagram went out. A full registry is logged
    /// and the frame is still sent.
    pub fn send_dmx(&mut self, universe: u16, data: &[u8], port_index: u8) -> Result<Fanout> {
        let length = data.len();
        if length > DMX_UNIVERSE_SIZE {
            return Err(ArtNetError::FrameTooLong(length));
        }

        if let Err(e) = self.register_universe(universe) {
            warn!("{e}");
        }

        self.dmx.set_physical(port_index);
        self.dmx.set_port_address(universe);
        self.dmx.set_length(length);
        let sequence = self.dmx.advance_sequence();

        scale_into(&mut self.dmx.data_mut()[..length], data, self.master);

        let subscribers = self.directory.lookup(universe);
        let fanout = Fanout::plan(self.unicast, subscribers);
        let (delivered, failure) = transmit(
            &mut self.transport,
            self.dmx.as_bytes(),
            fanout,
            subscribers,
            self.broadcast,
            self.port,
        );

        if delivered > 0 {
            self.dmx_pending = true;
        }
        trace!(universe, sequence, length, ?fanout, delivered, "ArtDmx");
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(fanout),
        }
    }

    /// Add `universe` to the set covered by [`blackout`](Self::blackout)
    /// without sending anything. Returns true if it was newly added.
    ///
    /// # Errors
    /// `RegistryFull` when the registry is at capacity.
    pub fn register_universe(&mut self, universe: u16) -> Result<bool> {
        Ok(self.active.contains_or_insert(universe)?)
    }

    /// Broadcast ArtSync if synchronization is enabled and a frame was sent
    /// since the last sync. Returns true if a sync went out.
    pub fn flush_sync(&mut self) -> Result<bool> {
        if !(self.synchronization && self.dmx_pending) {
            return Ok(false);
        }
        self.dmx_pending = false;
        self.transport
            .send_to(self.sync.as_bytes(), self.broadcast, self.port)?;
        trace!("ArtSync");
        Ok(true)
    }

    /// Send a zeroed full universe to every active universe, then sync.
    ///
    /// Each transmitted universe consumes one sequence number; universes
    /// without subscribers in unicast mode are skipped. A failed send does
    /// not stop the sweep: every universe is attempted and the sync is sent
    /// before the first error is returned. Returns the number of universes
    /// that reached at least one target.
    pub fn blackout(&mut self) -> Result<usize> {
        self.dmx.set_length(DMX_UNIVERSE_SIZE);
        self.dmx.data_mut().fill(0);

        let mut transmitted = 0;
        let mut first_error = None;
        for index in 0..self.active.len() {
            let universe = self.active.as_slice()[index];
            let subscribers = self.directory.lookup(universe);
            let fanout = Fanout::plan(self.unicast, subscribers);
            if !fanout.transmits() {
                continue;
            }

            self.dmx.set_port_address(universe);
            self.dmx.advance_sequence();
            let (delivered, failure) = transmit(
                &mut self.transport,
                self.dmx.as_bytes(),
                fanout,
                subscribers,
                self.broadcast,
                self.port,
            );
            if delivered > 0 {
                transmitted += 1;
            }
            if first_error.is_none() {
                first_error = failure;
            }
        }

        info!(universes = transmitted, "Blackout");
        self.dmx_pending = true;
        let synced = self.flush_sync();

        match first_error {
            Some(e) => Err(e.into()),
            None => synced.map(|_| transmitted),
        }
    }

    // ─── Inbound ────────────────────────────────────────────────────

    /// Broadcast ArtPoll when the poll interval has elapsed, and sweep the
    /// directory once more than a quarter interval has passed since the last
    /// poll. Millisecond timestamps wrap.
    pub fn poll(&mut self, now_millis: u32) -> Result<()> {
        if now_millis.wrapping_sub(self.last_poll_ms) > self.poll_interval_ms {
            self.transport
                .send_to(self.poll.as_bytes(), self.broadcast, self.port)?;
            self.last_poll_ms = now_millis;
            debug!(now_millis, "ArtPoll");
        }

        if self.table_cleanup
            && now_millis.wrapping_sub(self.last_poll_ms) > self.poll_interval_ms / 4
        {
            self.directory.sweep(now_millis);
        }
        Ok(())
    }

    /// Read one datagram and dispatch it by opcode.
    ///
    /// Short or foreign datagrams are dropped without side effects. Returns
    /// the opcode of a valid Art-Net datagram, whether or not it was acted on.
    pub fn receive_and_dispatch(&mut self) -> Result<Option<OpCode>> {
        let Some((len, from, _)) = self.transport.recv_from(&mut self.rx)? else {
            return Ok(None);
        };
        let datagram = &self.rx[..len.min(ART_PACKET_MAX_SIZE)];

        let Some(raw) = parse_header(datagram) else {
            trace!(%from, len, "Dropped non Art-Net datagram");
            return Ok(None);
        };
        let opcode = OpCode::from_u16(raw);

        match opcode {
            Some(OpCode::PollReply) => match ArtPollReply::parse(datagram) {
                Some(reply) => {
                    debug!(%from, node = %reply.ip(), "ArtPollReply");
                    let now = self.clock.now_millis();
                    self.directory.add(&reply, now);
                }
                None => trace!(%from, len, "Dropped truncated ArtPollReply"),
            },
            Some(OpCode::Trigger) => {
                if let (Some(handler), Some(trigger)) =
                    (self.trigger.as_mut(), ArtTrigger::parse(datagram))
                {
                    if trigger.accepts(self.oem_code) {
                        debug!(
                            %from,
                            key = ?TriggerKey::from(trigger.key()),
                            sub_key = trigger.sub_key(),
                            "ArtTrigger"
                        );
                        handler.handle(trigger.key(), trigger.sub_key(), trigger.payload());
                    } else {
                        trace!(%from, oem = trigger.oem(), "ArtTrigger for another OEM");
                    }
                }
            }
            _ => trace!(%from, opcode = raw, "Ignored opcode"),
        }
        Ok(opcode)
    }

    // ─── Configuration ──────────────────────────────────────────────

    /// Install the ArtTrigger handler.
    pub fn set_trigger_handler(&mut self, handler: impl TriggerHandler + 'static) {
        self.trigger = Some(Box::new(handler));
    }

    /// Remove the ArtTrigger handler; triggers are then ignored.
    pub fn clear_trigger_handler(&mut self) {
        self.trigger = None;
    }

    /// Unicast mode.
    pub fn unicast(&self) -> bool {
        self.unicast
    }

    /// Enable or disable unicast fanout.
    pub fn set_unicast(&mut self, unicast: bool) {
        self.unicast = unicast;
    }

    /// ArtSync enabled.
    pub fn synchronization(&self) -> bool {
        self.synchronization
    }

    /// Enable or disable ArtSync.
    pub fn set_synchronization(&mut self, synchronization: bool) {
        self.synchronization = synchronization;
    }

    /// Directory sweep enabled.
    pub fn table_cleanup(&self) -> bool {
        self.table_cleanup
    }

    /// Enable or disable the directory sweep.
    pub fn set_table_cleanup(&mut self, table_cleanup: bool) {
        self.table_cleanup = table_cleanup;
    }

    /// Master dimmer level.
    pub fn master(&self) -> u8 {
        self.master
    }

    /// Set the master dimmer: 0 dark, 255 pass-through.
    pub fn set_master(&mut self, master: u8) {
        self.master = master;
    }

    /// OEM code used by the trigger filter.
    pub fn oem_code(&self) -> u16 {
        self.oem_code
    }

    /// Set the OEM code used by the trigger filter.
    pub fn set_oem_code(&mut self, oem_code: u16) {
        self.oem_code = oem_code;
    }

    // ─── State ──────────────────────────────────────────────────────

    /// Universes transmitted so far, ascending.
    pub fn active_universes(&self) -> &[u16] {
        self.active.as_slice()
    }

    /// Forget every active universe.
    pub fn clear_active_universes(&mut self) {
        self.active.clear();
    }

    /// Sequence number of the last ArtDmx (0 before the first).
    pub fn sequence(&self) -> u8 {
        self.dmx.sequence()
    }

    /// True if a frame was sent since the last ArtSync.
    pub fn is_sync_pending(&self) -> bool {
        self.dmx_pending
    }

    /// Directory collaborator.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Transport collaborator.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable transport collaborator.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport, D: Directory, C: Clock> fmt::Display for ArtNetController<T, D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Art-Net Controller")?;
        writeln!(f, " Max Node's    : {MAX_NODES}")?;
        write!(f, " Max Universes : {MAX_UNIVERSES}")?;
        if self.port != ARTNET_UDP_PORT {
            write!(f, "\n Port          : {}", self.port)?;
        }
        if !self.unicast {
            write!(f, "\n Unicast is disabled")?;
        }
        if !self.synchronization {
            write!(f, "\n Synchronization is disabled")?;
        }
        Ok(())
    }
}

/// Copy `src` into `dst` through the master dimmer.
///
/// 255 copies, 0 zero-fills, anything else scales each channel by
/// `master * value / 255`, truncating.
#[inline]
pub fn scale_into(dst: &mut [u8], src: &[u8], master: u8) {
    match master {
        DMX_MAX_VALUE => dst.copy_from_slice(src),
        0 => dst.fill(0),
        m => {
            for (out, &value) in dst.iter_mut().zip(src) {
                *out = ((u32::from(m) * u32::from(value)) / u32::from(DMX_MAX_VALUE)) as u8;
            }
        }
    }
}
