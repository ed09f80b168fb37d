//! Datagram transport traits for reaching the collector.
//!
//! The [`DatagramTransport`] trait abstracts over the outbound link to the
//! PSK Reporter collector, and [`Connector`] abstracts over how such a link
//! is (re)established. The scheduler in the `pskreporter` crate only talks
//! to these traits, so reconnect and flush logic can be exercised with the
//! mock connector from `pskreporter-test-harness` as well as with the real
//! UDP implementation in `pskreporter-transport`.

use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;

use crate::error::Result;

/// IPv4 payload budget: minimum MTU (576) minus worst-case IPv4 header (60),
/// UDP header (8), and 20 bytes of headroom.
pub const IPV4_MAX_PAYLOAD_BYTES: usize = 576 - 60 - 8 - 20;

/// IPv6 payload budget: minimum MTU (1280) minus IPv6 header (40) and UDP
/// header (8).
pub const IPV6_MAX_PAYLOAD_BYTES: usize = 1280 - 40 - 8;

/// Address family of the collector, used to size datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4 destination (or a hostname, which is assumed to resolve to IPv4).
    V4,
    /// IPv6 destination.
    V6,
}

impl AddressFamily {
    /// Guess the address family from a `host:port` string.
    ///
    /// Literal socket addresses are classified exactly. Otherwise a string
    /// with a single colon (`host:port`) is treated as IPv4 and anything with
    /// more colons (`[2001:db8::1]:4739`) as IPv6.
    ///
    /// # Example
    ///
    /// ```
    /// use pskreporter_core::AddressFamily;
    ///
    /// assert_eq!(AddressFamily::from_host_port("report.pskreporter.info:4739"), AddressFamily::V4);
    /// assert_eq!(AddressFamily::from_host_port("[::1]:4739"), AddressFamily::V6);
    /// ```
    pub fn from_host_port(host_port: &str) -> Self {
        if let Ok(addr) = host_port.parse::<SocketAddr>() {
            return Self::from_socket_addr(&addr);
        }
        if host_port.matches(':').count() == 1 {
            AddressFamily::V4
        } else {
            AddressFamily::V6
        }
    }

    /// Address family of a resolved socket address.
    pub fn from_socket_addr(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => AddressFamily::V4,
            SocketAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// Largest datagram the client will emit for this family.
    pub fn max_payload_bytes(&self) -> usize {
        match self {
            AddressFamily::V4 => IPV4_MAX_PAYLOAD_BYTES,
            AddressFamily::V6 => IPV6_MAX_PAYLOAD_BYTES,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// An established outbound datagram link to the collector.
///
/// Each [`send`](DatagramTransport::send) writes exactly one datagram. There
/// is no acknowledgment; success only means the datagram was handed to the
/// network stack.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Write one datagram to the collector.
    async fn send(&mut self, datagram: &[u8]) -> Result<()>;

    /// Close the link. Later `send()` calls return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Local socket address, if known. Used to label packet counters.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Remote socket address, if known. Used to label packet counters.
    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// Factory for [`DatagramTransport`]s to one configured collector.
///
/// The scheduler calls [`connect`](Connector::connect) on start-up and again
/// after every transport failure.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial the collector.
    async fn connect(&self) -> Result<Box<dyn DatagramTransport>>;

    /// Address family of the collector, fixed for the connector's lifetime.
    fn address_family(&self) -> AddressFamily;

    /// Human-readable collector address for logs.
    fn describe(&self) -> String;
}
