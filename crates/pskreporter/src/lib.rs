//! # pskreporter -- Report received spots to PSK Reporter
//!
//! `pskreporter` sends reception reports ("spots") from amateur radio
//! decoding software to the [PSK Reporter](https://pskreporter.info)
//! collector. Spots are queued, batched into IPFIX datagrams sized to stay
//! under the minimum path MTU, and sent over UDP by a background task that
//! reconnects with exponential backoff.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pskreporter::{InformationSource, Spot, SpotKind, SpotterBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let spotter = SpotterBuilder::new(pskreporter::PSKREPORTER_COLLECTOR)
//!         .receiver("N0CALL", "JJ00OG")
//!         .decoder_software("mydecoder 1.0")
//!         .spot_kind(SpotKind::CallsignFrequencySnrImdModeSourceLocatorFlowstart)
//!         .build()
//!         .await?;
//!
//!     spotter
//!         .feed(Spot::new(
//!             "N1CALL",
//!             "II00OG",
//!             50_313_650,
//!             -3,
//!             2,
//!             "FT8",
//!             InformationSource::AUTOMATIC,
//!             pskreporter::unix_time_seconds(),
//!         ))
//!         .await?;
//!
//!     spotter.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                      | Purpose                                          |
//! |----------------------------|--------------------------------------------------|
//! | `pskreporter-core`         | Spot types, transport traits, errors             |
//! | `pskreporter-ipfix`        | IPFIX templates, records, sets, message header   |
//! | `pskreporter-transport`    | Connected UDP transport and connector            |
//! | **`pskreporter`**          | This crate -- queue, packer, scheduler, builder  |
//!
//! Batching: a flush happens on the next one-second tick once 25 spots are
//! queued, or once a non-empty queue has waited five minutes. Templates are
//! sent with every early datagram and then with decaying probability, down
//! to roughly one datagram in ten.

pub mod builder;
pub mod connection;
pub mod packer;
pub mod queue;
pub mod scheduler;
pub mod spotter;

pub use builder::SpotterBuilder;
pub use spotter::Spotter;

pub use pskreporter_core::{
    format_freq_mhz, unix_time_seconds, AddressFamily, Connector, DatagramTransport, Error,
    InformationSource, PacketCounter, ParseSpotKindError, Result, Spot, SpotKind, Station,
};
pub use pskreporter_transport::{
    UdpConnector, UdpTransport, PSKREPORTER_COLLECTOR, PSKREPORTER_TEST_COLLECTOR,
};
