//! Transport implementations for the PSK Reporter spot client.
//!
//! This crate provides concrete implementations of the
//! [`DatagramTransport`](pskreporter_core::DatagramTransport) and
//! [`Connector`](pskreporter_core::Connector) traits from `pskreporter-core`:
//!
//! - [`UdpTransport`]: a connected UDP socket to the collector
//! - [`UdpConnector`]: dials a fresh [`UdpTransport`] for a `host:port` string
//!
//! PSK Reporter listens on UDP port 4739 (production) and 14739 (test).

pub mod udp;

pub use udp::{UdpConnector, UdpTransport};

/// Production collector address.
pub const PSKREPORTER_COLLECTOR: &str = "report.pskreporter.info:4739";

/// Test collector address; reports sent here are not published.
pub const PSKREPORTER_TEST_COLLECTOR: &str = "report.pskreporter.info:14739";
