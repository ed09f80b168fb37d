//! pskreporter-test-harness: Mock connectors, a loopback collector, and an
//! IPFIX reader for testing the PSK Reporter client.
//!
//! [`MockConnector`] gives scheduler tests scripted dial and send failures
//! and a record of every datagram, without touching the network.
//! [`MockCollector`] is a real UDP socket on localhost for end-to-end tests,
//! and [`IpfixReader`] decodes what either of them captured the way the
//! collector would.

pub mod counting_sink;
pub mod mock_collector;
pub mod mock_connector;
pub mod reader;

pub use counting_sink::CountingSink;
pub use mock_collector::MockCollector;
pub use mock_connector::{MockConnector, MockTransport, MOCK_LOCAL_ADDR, MOCK_PEER_ADDR};
pub use reader::{DecodedMessage, DecodedRecord, FieldSpec, FieldValue, IpfixReader, Template};
