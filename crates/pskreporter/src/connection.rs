//! Connection manager: owns the transport and the reconnect backoff.
//!
//! The collector is reached through a [`Connector`], which hands out a fresh
//! [`DatagramTransport`] on every dial. A failed dial or send drops the
//! transport; the scheduler then dials again after [`Backoff::next_delay`].
//! Retries never give up.

use std::net::SocketAddr;
use std::time::Duration;

use pskreporter_core::error::{Error, Result};
use pskreporter_core::transport::{Connector, DatagramTransport};

/// First reconnect delay.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Reconnect delays never exceed this.
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Exponential backoff: 100 ms, doubling per attempt, capped at 10 s.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Backoff with the default 100 ms start and 10 s cap.
    pub fn new() -> Self {
        Self::with_limits(INITIAL_BACKOFF, MAX_BACKOFF)
    }

    /// Backoff with custom limits.
    pub fn with_limits(initial: Duration, max: Duration) -> Self {
        Backoff {
            initial,
            max,
            current: initial,
        }
    }

    /// The delay to sleep before the next attempt; advances the backoff.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Start again from the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the current transport, if any, and dials through the connector.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn DatagramTransport>>,
    backoff: Backoff,
    max_payload_bytes: usize,
}

impl ConnectionManager {
    /// Wrap a connector. The payload budget is fixed here from the
    /// connector's address family.
    pub fn new(connector: Box<dyn Connector>) -> Self {
        let max_payload_bytes = connector.address_family().max_payload_bytes();
        ConnectionManager {
            connector,
            transport: None,
            backoff: Backoff::new(),
            max_payload_bytes,
        }
    }

    /// Largest datagram that may be sent.
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Whether a transport is currently held.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Human-readable collector description for logs.
    pub fn describe(&self) -> String {
        self.connector.describe()
    }

    /// Dial once, replacing any existing transport.
    pub async fn connect(&mut self) -> Result<()> {
        self.disconnect().await;
        let transport = self.connector.connect().await?;
        tracing::info!(
            collector = %self.connector.describe(),
            local = ?transport.local_addr(),
            remote = ?transport.peer_addr(),
            "Connected to collector"
        );
        self.transport = Some(transport);
        Ok(())
    }

    /// Write one datagram. Fails with [`Error::NotConnected`] when no
    /// transport is held.
    pub async fn send(&mut self, datagram: &[u8]) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        transport.send(datagram).await
    }

    /// Close and drop the transport, if any. Close errors are only logged.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                tracing::debug!(error = %e, "Error closing transport");
            }
        }
    }

    /// Local address of the current transport.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.as_ref().and_then(|t| t.local_addr())
    }

    /// Collector address of the current transport.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.transport.as_ref().and_then(|t| t.peer_addr())
    }

    /// The delay before the next dial; advances the backoff.
    pub fn next_backoff(&mut self) -> Duration {
        self.backoff.next_delay()
    }

    /// Reset the backoff after a healthy connection.
    pub fn reset_backoff(&mut self) {
        self.backoff.reset();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("collector", &self.connector.describe())
            .field("connected", &self.transport.is_some())
            .field("backoff", &self.backoff)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .finish()
    }
}
