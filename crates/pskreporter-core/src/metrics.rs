//! Hook for an external packet counter.
//!
//! The client does not export metrics itself. Applications that do (for
//! example through a Prometheus registry) implement [`PacketCounter`] and
//! hand it to the builder; the scheduler calls it once per datagram written.

use std::net::SocketAddr;

/// Receives one call per datagram successfully written to the collector.
pub trait PacketCounter: Send + Sync {
    /// Count one datagram sent from `local` to `remote`.
    ///
    /// Either address may be `None` when the transport cannot report it.
    fn increment(&self, local: Option<SocketAddr>, remote: Option<SocketAddr>);
}
