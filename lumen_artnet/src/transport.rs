//! UDP transport.
//!
//! The controller talks to the network only through [`Transport`], so tests
//! can substitute a recording implementation. [`UdpTransport`] is the real
//! one: a non-blocking, broadcast-enabled socket bound to the Art-Net port
//! on the selected interface.

use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use tracing::{debug, info};

use crate::error::{ArtNetError, Result};

/// Datagram transport used by the controller.
///
/// `recv_from` must not block; it returns `Ok(None)` when nothing is queued.
pub trait Transport {
    /// Send one datagram to `addr:port`.
    fn send_to(&mut self, bytes: &[u8], addr: Ipv4Addr, port: u16) -> io::Result<()>;

    /// Receive one datagram into `buf`: `(length, source address, source port)`.
    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, Ipv4Addr, u16)>>;

    /// Address of the local interface.
    fn local_address(&self) -> Ipv4Addr;

    /// Directed broadcast address of the local network.
    fn broadcast_address(&self) -> Ipv4Addr;
}

/// IPv4 interface the controller transmits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    /// Interface name (e.g. `eth0`).
    pub name: String,
    /// Interface address.
    pub address: Ipv4Addr,
    /// Directed broadcast address.
    pub broadcast: Ipv4Addr,
}

impl NetworkInterface {
    /// Find an interface by name, or the first non-loopback IPv4 interface
    /// that is up when `name` is `None`.
    pub fn resolve(name: Option<&str>) -> Result<Self> {
        let addrs = getifaddrs().map_err(io::Error::from)?;

        for ifaddr in addrs {
            if let Some(wanted) = name {
                if ifaddr.interface_name != wanted {
                    continue;
                }
            } else if ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK)
                || !ifaddr.flags.contains(InterfaceFlags::IFF_UP)
            {
                continue;
            }

            let Some(address) = ifaddr
                .address
                .as_ref()
                .and_then(|a| a.as_sockaddr_in())
                .map(|sin| *SocketAddrV4::from(*sin).ip())
            else {
                continue;
            };

            let broadcast = ifaddr
                .broadcast
                .as_ref()
                .and_then(|a| a.as_sockaddr_in())
                .map(|sin| *SocketAddrV4::from(*sin).ip())
                .or_else(|| {
                    ifaddr
                        .netmask
                        .as_ref()
                        .and_then(|a| a.as_sockaddr_in())
                        .map(|sin| directed_broadcast(address, *SocketAddrV4::from(*sin).ip()))
                })
                .unwrap_or(Ipv4Addr::BROADCAST);

            debug!(interface = %ifaddr.interface_name, %address, %broadcast, "Interface resolved");
            return Ok(Self {
                name: ifaddr.interface_name,
                address,
                broadcast,
            });
        }

        Err(ArtNetError::InterfaceNotFound(
            name.unwrap_or("any non-loopback").to_string(),
        ))
    }
}

/// Directed broadcast for `address` under `netmask`.
pub fn directed_broadcast(address: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(address.to_bits() | !netmask.to_bits())
}

/// Non-blocking UDP socket bound to the Art-Net port.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    local: Ipv4Addr,
    broadcast: Ipv4Addr,
}

impl UdpTransport {
    /// Bind `0.0.0.0:port` so directed broadcasts from nodes are received,
    /// and enable broadcast transmission.
    pub fn open(port: u16, interface: &NetworkInterface) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;

        info!(
            interface = %interface.name,
            local = %interface.address,
            broadcast = %interface.broadcast,
            port,
            "UDP transport open"
        );

        Ok(Self {
            socket,
            local: interface.address,
            broadcast: interface.broadcast,
        })
    }
}

impl Transport for UdpTransport {
    fn send_to(&mut self, bytes: &[u8], addr: Ipv4Addr, port: u16) -> io::Result<()> {
        self.socket
            .send_to(bytes, SocketAddrV4::new(addr, port))
            .map(|_| ())
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, Ipv4Addr, u16)>> {
        match self.socket.recv_from(buf) {
            Ok((len, SocketAddr::V4(from))) => Ok(Some((len, *from.ip(), from.port()))),
            // Bound to an IPv4 wildcard; anything else is not ours.
            Ok((_, SocketAddr::V6(_))) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn local_address(&self) -> Ipv4Addr {
        self.local
    }

    fn broadcast_address(&self) -> Ipv4Addr {
        self.broadcast
    }
}
