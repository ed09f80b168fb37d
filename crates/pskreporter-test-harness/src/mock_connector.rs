//! Mock connector and transport for deterministic scheduler tests.
//!
//! [`MockConnector`] implements [`Connector`] with scripted dial and send
//! failures. Every transport it hands out shares one state block with the
//! connector, so a test can keep a clone of the connector, move the other
//! clone into the client, and inspect afterwards what was dialed and sent.
//!
//! Dial attempts are stamped with [`tokio::time::Instant`], so under
//! `#[tokio::test(start_paused = true)]` the gaps between attempts are the
//! exact backoff delays the scheduler slept.
//!
//! # Example
//!
//! ```
//! use pskreporter_test_harness::MockConnector;
//!
//! let connector = MockConnector::new();
//! connector.fail_next_dials(3);
//! let for_client = connector.clone();
//! // ... build a client with `Box::new(for_client)` ...
//! assert!(connector.datagrams().is_empty());
//! ```

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use pskreporter_core::error::{Error, Result};
use pskreporter_core::transport::{AddressFamily, Connector, DatagramTransport};

/// Local address reported by mock transports.
pub const MOCK_LOCAL_ADDR: &str = "127.0.0.1:40000";

/// Peer address reported by mock transports.
pub const MOCK_PEER_ADDR: &str = "127.0.0.1:4739";

#[derive(Debug, Default)]
struct MockState {
    /// Remaining dials that should fail.
    dial_failures: u32,
    /// Remaining sends that should fail.
    send_failures: u32,
    /// Never complete a dial.
    hang_dials: bool,
    /// Time of every dial attempt, failed or not.
    dial_attempts: Vec<Instant>,
    /// Successful dials.
    connections: usize,
    /// Every datagram written successfully, in order.
    datagrams: Vec<Vec<u8>>,
    /// Sends that failed.
    failed_sends: usize,
    /// Transports closed.
    closes: usize,
}

/// A scripted [`Connector`]. Clones share state.
#[derive(Debug, Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
    family: AddressFamily,
}

impl MockConnector {
    /// Create a connector for an IPv4 collector that always succeeds.
    pub fn new() -> Self {
        Self::with_family(AddressFamily::V4)
    }

    /// Create a connector reporting the given address family.
    pub fn with_family(family: AddressFamily) -> Self {
        MockConnector {
            state: Arc::new(Mutex::new(MockState::default())),
            family,
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock connector state poisoned")
    }

    /// Make the next `n` dial attempts fail with [`Error::Transport`].
    pub fn fail_next_dials(&self, n: u32) {
        self.state().dial_failures = n;
    }

    /// Make the next `n` sends fail with [`Error::Transport`].
    pub fn fail_next_sends(&self, n: u32) {
        self.state().send_failures = n;
    }

    /// Make every dial hang forever (until the task is aborted).
    pub fn hang_dials(&self) {
        self.state().hang_dials = true;
    }

    /// All datagrams written so far.
    pub fn datagrams(&self) -> Vec<Vec<u8>> {
        self.state().datagrams.clone()
    }

    /// Time of every dial attempt.
    pub fn dial_attempts(&self) -> Vec<Instant> {
        self.state().dial_attempts.clone()
    }

    /// Gaps between consecutive dial attempts.
    pub fn dial_delays(&self) -> Vec<Duration> {
        self.state()
            .dial_attempts
            .windows(2)
            .map(|w| w[1] - w[0])
            .collect()
    }

    /// Number of successful dials.
    pub fn connections(&self) -> usize {
        self.state().connections
    }

    /// Number of sends that failed.
    pub fn failed_sends(&self) -> usize {
        self.state().failed_sends
    }

    /// Number of transports closed.
    pub fn closes(&self) -> usize {
        self.state().closes
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn DatagramTransport>> {
        let hang = {
            let mut state = self.state();
            state.dial_attempts.push(Instant::now());
            if state.dial_failures > 0 {
                state.dial_failures -= 1;
                return Err(Error::Transport("scripted dial failure".into()));
            }
            state.hang_dials
        };

        if hang {
            std::future::pending::<()>().await;
        }

        self.state().connections += 1;
        Ok(Box::new(MockTransport {
            state: Arc::clone(&self.state),
            connected: true,
        }))
    }

    fn address_family(&self) -> AddressFamily {
        self.family
    }

    fn describe(&self) -> String {
        "mock collector".to_string()
    }
}

/// Transport handed out by [`MockConnector`].
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    connected: bool,
}

#[async_trait]
impl DatagramTransport for MockTransport {
    async fn send(&mut self, datagram: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let mut state = self.state.lock().expect("mock connector state poisoned");
        if state.send_failures > 0 {
            state.send_failures -= 1;
            state.failed_sends += 1;
            return Err(Error::Transport("scripted send failure".into()));
        }
        state.datagrams.push(datagram.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.connected {
            self.connected = false;
            self.state.lock().expect("mock connector state poisoned").closes += 1;
        }
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        MOCK_LOCAL_ADDR.parse().ok()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        MOCK_PEER_ADDR.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dial_and_send_records_datagrams() {
        let connector = MockConnector::new();
        let mut transport = connector.connect().await.unwrap();
        transport.send(b"one").await.unwrap();
        transport.send(b"two").await.unwrap();

        assert_eq!(connector.connections(), 1);
        assert_eq!(connector.datagrams(), vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[tokio::test]
    async fn scripted_dial_failures() {
        let connector = MockConnector::new();
        connector.fail_next_dials(2);

        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_ok());
        assert_eq!(connector.dial_attempts().len(), 3);
        assert_eq!(connector.connections(), 1);
    }

    #[tokio::test]
    async fn scripted_send_failures() {
        let connector = MockConnector::new();
        connector.fail_next_sends(1);
        let mut transport = connector.connect().await.unwrap();

        assert!(matches!(
            transport.send(b"lost").await,
            Err(Error::Transport(_))
        ));
        transport.send(b"kept").await.unwrap();
        assert_eq!(connector.failed_sends(), 1);
        assert_eq!(connector.datagrams(), vec![b"kept".to_vec()]);
    }

    #[tokio::test]
    async fn close_disconnects() {
        let connector = MockConnector::new();
        let mut transport = connector.connect().await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(connector.closes(), 1);
        assert!(matches!(
            transport.send(b"late").await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn dial_delays_follow_virtual_time() {
        let connector = MockConnector::new();
        connector.fail_next_dials(1);
        let _ = connector.connect().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        let _ = connector.connect().await;

        assert_eq!(connector.dial_delays(), vec![Duration::from_millis(250)]);
    }

    #[test]
    fn reports_family() {
        assert_eq!(MockConnector::new().address_family(), AddressFamily::V4);
        assert_eq!(
            MockConnector::with_family(AddressFamily::V6).address_family(),
            AddressFamily::V6
        );
    }
}
