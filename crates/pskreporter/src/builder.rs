//! SpotterBuilder -- fluent builder for constructing [`Spotter`] instances.
//!
//! Collects the receiving station's details and the batching parameters,
//! validates them, and spawns the background scheduler.
//!
//! # Example
//!
//! ```no_run
//! use pskreporter::{SpotKind, SpotterBuilder};
//!
//! # async fn example() -> pskreporter::Result<()> {
//! let spotter = SpotterBuilder::new("report.pskreporter.info:4739")
//!     .receiver("N0CALL", "JJ00OG")
//!     .antenna("Dipole")
//!     .decoder_software("mydecoder 1.0")
//!     .spot_kind(SpotKind::CallsignFrequencySnrImdModeSourceLocatorFlowstart)
//!     .build()
//!     .await?;
//! # spotter.close().await
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;
use tokio::time::Instant;

use pskreporter_core::error::{Error, Result};
use pskreporter_core::transport::Connector;
use pskreporter_core::{PacketCounter, SpotKind, Station};
use pskreporter_ipfix::message::HEADER_LEN;
use pskreporter_ipfix::record::encode_receiver_record;
use pskreporter_ipfix::set::{encode_data_set, MAX_PADDING, RECEIVER_SET_ID, SET_HEADER_LEN};
use pskreporter_ipfix::template::template_sets;
use pskreporter_transport::UdpConnector;

use crate::connection::ConnectionManager;
use crate::queue::spot_queue;
use crate::scheduler::{spawn_scheduler, HeaderProbability, Scheduler, SchedulerConfig, Session};
use crate::spotter::{Spotter, SpotterInfo};

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default queue length that triggers a flush on the next tick.
pub const DEFAULT_MAX_SPOTS: usize = 25;

/// Default longest time a non-empty queue waits for a flush.
pub const DEFAULT_LINGER_TIME: Duration = Duration::from_secs(300);

/// Default scheduler tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default bound on waiting for the scheduler in [`Spotter::close`].
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Length of a generated persistent identifier.
pub const PERSISTENT_IDENTIFIER_LEN: usize = 16;

/// Fluent builder for [`Spotter`].
///
/// Only the collector address is needed up front; everything else has a
/// default, though a real client should always set the receiver and the
/// decoder software.
pub struct SpotterBuilder {
    collector: String,
    receiver: Station,
    antenna: Option<String>,
    decoder_software: String,
    persistent_identifier: Option<String>,
    spot_kind: SpotKind,
    packet_counter: Option<Arc<dyn PacketCounter>>,
    rng_seed: Option<u64>,
    queue_capacity: usize,
    max_spots: usize,
    linger_time: Duration,
    tick_interval: Duration,
    close_timeout: Duration,
}

impl SpotterBuilder {
    /// Create a builder reporting to `collector` (`host:port`).
    pub fn new(collector: &str) -> Self {
        SpotterBuilder {
            collector: collector.to_string(),
            receiver: Station::default(),
            antenna: None,
            decoder_software: String::new(),
            persistent_identifier: None,
            spot_kind: SpotKind::default(),
            packet_counter: None,
            rng_seed: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_spots: DEFAULT_MAX_SPOTS,
            linger_time: DEFAULT_LINGER_TIME,
            tick_interval: DEFAULT_TICK_INTERVAL,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Set the receiving station's callsign and Maidenhead locator.
    pub fn receiver(mut self, callsign: &str, locator: &str) -> Self {
        self.receiver = Station::new(callsign, locator);
        self
    }

    /// Describe the receiving antenna. An empty string means no antenna
    /// field (and the shorter receiver template).
    pub fn antenna(mut self, antenna: &str) -> Self {
        self.antenna = if antenna.is_empty() {
            None
        } else {
            Some(antenna.to_string())
        };
        self
    }

    /// Set the decoding software name and version.
    pub fn decoder_software(mut self, software: &str) -> Self {
        self.decoder_software = software.to_string();
        self
    }

    /// Set the persistent identifier. An empty string means generate one.
    pub fn persistent_identifier(mut self, id: &str) -> Self {
        self.persistent_identifier = if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        };
        self
    }

    /// Choose which optional sender fields are reported (default: none).
    pub fn spot_kind(mut self, kind: SpotKind) -> Self {
        self.spot_kind = kind;
        self
    }

    /// Count every datagram sent.
    pub fn packet_counter(mut self, counter: Arc<dyn PacketCounter>) -> Self {
        self.packet_counter = Some(counter);
        self
    }

    /// Seed the client's random source instead of using OS entropy.
    ///
    /// Makes the session identifier, generated persistent identifier, and
    /// template decisions reproducible.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Set how many spots may be queued before `feed` waits (default: 10000).
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the queue length that triggers a flush (default: 25).
    pub fn max_spots(mut self, n: usize) -> Self {
        self.max_spots = n;
        self
    }

    /// Set how long a non-empty queue may wait for a flush (default: 300s).
    pub fn linger_time(mut self, linger: Duration) -> Self {
        self.linger_time = linger;
        self
    }

    /// Set the scheduler tick (default: 1s).
    pub fn tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = tick;
        self
    }

    /// Set how long [`Spotter::close`] waits for the final flush (default: 10s).
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Build a [`Spotter`] with a caller-provided connector.
    ///
    /// This is the entry point for tests (pass a `MockConnector` from
    /// `pskreporter-test-harness`) and for custom transports. Must be
    /// called within a tokio runtime.
    pub async fn build_with_connector(self, connector: Box<dyn Connector>) -> Result<Spotter> {
        if self.max_spots == 0 {
            return Err(Error::InvalidParameter("max_spots must be at least 1".into()));
        }
        if self.queue_capacity < self.max_spots {
            return Err(Error::InvalidParameter(format!(
                "queue_capacity {} is smaller than max_spots {}",
                self.queue_capacity, self.max_spots
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(Error::InvalidParameter("tick_interval must be non-zero".into()));
        }

        let receiver_record = encode_receiver_record(
            &self.receiver,
            &self.decoder_software,
            self.antenna.as_deref(),
        )
        .map_err(|e| Error::InvalidParameter(e.to_string()))?;
        let receiver_set = encode_data_set(RECEIVER_SET_ID, &receiver_record)?;
        let templates = template_sets(self.spot_kind, self.antenna.is_some());

        let family = connector.address_family();
        let max_payload_bytes = family.max_payload_bytes();
        let overhead = HEADER_LEN + templates.len() + receiver_set.len() + SET_HEADER_LEN + MAX_PADDING;
        if overhead > max_payload_bytes {
            return Err(Error::InvalidParameter(format!(
                "receiver record leaves no room for spots in a {max_payload_bytes}-byte {family} datagram"
            )));
        }

        let mut rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let session_id: u32 = rng.gen();
        let persistent_identifier = match self.persistent_identifier {
            Some(id) => id,
            None => (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(PERSISTENT_IDENTIFIER_LEN)
                .map(char::from)
                .collect(),
        };

        let (tx, queue) = spot_queue(self.queue_capacity);
        let (done_tx, done_rx) = oneshot::channel();
        let (ack_tx, ack_rx) = oneshot::channel();

        let scheduler = Scheduler {
            session: Session {
                spot_kind: self.spot_kind,
                templates,
                receiver_set,
                session_id,
                sequence_number: 0,
                header_probability: HeaderProbability::new(),
                last_flush: Instant::now(),
                rng,
            },
            queue,
            conn: ConnectionManager::new(connector),
            counter: self.packet_counter,
            config: SchedulerConfig {
                max_spots: self.max_spots,
                linger_time: self.linger_time,
                tick_interval: self.tick_interval,
            },
            done: done_rx,
            done_ack: Some(ack_tx),
        };

        tracing::debug!(
            receiver = %self.receiver,
            spot_kind = %self.spot_kind,
            session_id,
            family = %family,
            "Starting spot client"
        );
        let task = spawn_scheduler(scheduler);

        Ok(Spotter::new(
            tx,
            done_tx,
            ack_rx,
            task,
            SpotterInfo {
                close_timeout: self.close_timeout,
                receiver: self.receiver,
                persistent_identifier,
                session_id,
                spot_kind: self.spot_kind,
                max_payload_bytes,
            },
        ))
    }

    /// Build a [`Spotter`] that reports over UDP to the collector given in
    /// [`new`](Self::new).
    pub async fn build(self) -> Result<Spotter> {
        if self.collector.is_empty() {
            return Err(Error::InvalidParameter("collector address is empty".into()));
        }
        let connector = UdpConnector::new(self.collector.as_str());
        self.build_with_connector(Box::new(connector)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pskreporter_core::AddressFamily;
    use pskreporter_test_harness::MockConnector;

    fn builder() -> SpotterBuilder {
        SpotterBuilder::new("localhost:4739")
            .receiver("N0CALL", "JJ00OG")
            .decoder_software("testsw")
    }

    #[tokio::test]
    async fn builder_defaults() {
        let b = SpotterBuilder::new("localhost:4739");
        assert_eq!(b.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(b.max_spots, DEFAULT_MAX_SPOTS);
        assert_eq!(b.linger_time, DEFAULT_LINGER_TIME);
        assert_eq!(b.tick_interval, DEFAULT_TICK_INTERVAL);
        assert_eq!(b.close_timeout, DEFAULT_CLOSE_TIMEOUT);
        assert_eq!(b.spot_kind, SpotKind::CallsignFrequencyModeSourceFlowstart);
        assert!(b.antenna.is_none());
    }

    #[tokio::test]
    async fn empty_antenna_and_identifier_are_unset() {
        let b = builder().antenna("").persistent_identifier("");
        assert!(b.antenna.is_none());
        assert!(b.persistent_identifier.is_none());
    }

    #[tokio::test]
    async fn generates_persistent_identifier() {
        let spotter = builder()
            .build_with_connector(Box::new(MockConnector::new()))
            .await
            .unwrap();
        let id = spotter.persistent_identifier().to_string();
        assert_eq!(id.len(), PERSISTENT_IDENTIFIER_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        spotter.close().await.unwrap();
    }

    #[tokio::test]
    async fn keeps_given_persistent_identifier() {
        let spotter = builder()
            .persistent_identifier("my-station")
            .build_with_connector(Box::new(MockConnector::new()))
            .await
            .unwrap();
        assert_eq!(spotter.persistent_identifier(), "my-station");
        spotter.close().await.unwrap();
    }

    #[tokio::test]
    async fn seed_makes_session_reproducible() {
        let a = builder()
            .rng_seed(73)
            .build_with_connector(Box::new(MockConnector::new()))
            .await
            .unwrap();
        let b = builder()
            .rng_seed(73)
            .build_with_connector(Box::new(MockConnector::new()))
            .await
            .unwrap();
        assert_eq!(a.session_id(), b.session_id());
        assert_eq!(a.persistent_identifier(), b.persistent_identifier());
        a.close().await.unwrap();
        b.close().await.unwrap();
    }

    #[tokio::test]
    async fn payload_budget_follows_connector_family() {
        let v6 = builder()
            .build_with_connector(Box::new(MockConnector::with_family(AddressFamily::V6)))
            .await
            .unwrap();
        assert_eq!(v6.max_payload_bytes(), 1232);
        v6.close().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_zero_max_spots() {
        let result = builder()
            .max_spots(0)
            .build_with_connector(Box::new(MockConnector::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn rejects_queue_smaller_than_batch() {
        let result = builder()
            .queue_capacity(10)
            .max_spots(25)
            .build_with_connector(Box::new(MockConnector::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn rejects_zero_tick() {
        let result = builder()
            .tick_interval(Duration::ZERO)
            .build_with_connector(Box::new(MockConnector::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn rejects_oversized_receiver_strings() {
        let long = "X".repeat(256);
        let result = builder()
            .decoder_software(&long)
            .build_with_connector(Box::new(MockConnector::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn rejects_receiver_that_fills_datagram() {
        let long = "X".repeat(200);
        let result = builder()
            .antenna(&long)
            .decoder_software(&long)
            .build_with_connector(Box::new(MockConnector::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn rejects_empty_collector() {
        let result = SpotterBuilder::new("").build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn connector_is_not_dialed_on_invalid_parameters() {
        let mock = MockConnector::new();
        let _ = builder()
            .max_spots(0)
            .build_with_connector(Box::new(mock.clone()))
            .await;
        tokio::task::yield_now().await;
        assert!(mock.dial_attempts().is_empty());
    }
}
