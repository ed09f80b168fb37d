//! pskreporter-core: Core types, traits, and error definitions for the
//! PSK Reporter spot client.
//!
//! This crate holds everything shared between the wire encoder, the
//! transports, and the client itself, without pulling in a runtime.
//!
//! # Key types
//!
//! - [`Spot`] / [`Station`] -- what gets reported
//! - [`SpotKind`] -- which optional sender fields a client sends
//! - [`DatagramTransport`] / [`Connector`] -- outbound link to the collector
//! - [`PacketCounter`] -- optional external counter sink
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod helpers;
pub mod metrics;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use pskreporter_core::*`.
pub use error::{Error, Result};
pub use helpers::{epoch_seconds_u32, format_freq_mhz, unix_time_seconds};
pub use metrics::PacketCounter;
pub use transport::{
    AddressFamily, Connector, DatagramTransport, IPV4_MAX_PAYLOAD_BYTES, IPV6_MAX_PAYLOAD_BYTES,
};
pub use types::*;
