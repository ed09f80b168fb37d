//! Loopback UDP collector for end-to-end tests.
//!
//! [`MockCollector`] binds a UDP socket on localhost and hands back whatever
//! datagrams arrive, so a client built with the real `UdpConnector` can be
//! pointed at [`addr`](MockCollector::addr) and its output decoded with
//! [`IpfixReader`](crate::IpfixReader).
//!
//! # Example
//!
//! ```
//! use pskreporter_test_harness::MockCollector;
//!
//! # async fn example() -> pskreporter_core::Result<()> {
//! let collector = MockCollector::bind().await?;
//! let target = collector.addr().to_string();
//! // ... point a client at `target` ...
//! # Ok(())
//! # }
//! ```

use pskreporter_core::error::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Largest datagram the collector will accept.
const MAX_DATAGRAM: usize = 65_535;

/// A UDP receiver on `127.0.0.1` with an OS-assigned port.
#[derive(Debug)]
pub struct MockCollector {
    socket: UdpSocket,
    addr: SocketAddr,
}

impl MockCollector {
    /// Bind on `127.0.0.1:0`.
    pub async fn bind() -> Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock collector: {e}")))?;
        let addr = socket.local_addr().map_err(Error::Io)?;
        tracing::debug!(addr = %addr, "Mock collector listening");
        Ok(Self { socket, addr })
    }

    /// Address to point the client at.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait up to `timeout` for one datagram.
    ///
    /// Returns [`Error::Timeout`] if nothing arrives in time.
    pub async fn recv(&self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((n, src))) => {
                tracing::trace!(bytes = n, remote = %src, "Mock collector received datagram");
                buf.truncate(n);
                Ok((buf, src))
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Err(Error::Timeout),
        }
    }

    /// Collect datagrams until none arrives for `idle` (or an error occurs).
    pub async fn recv_until_idle(&self, idle: Duration) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Ok((datagram, _)) = self.recv(idle).await {
            out.push(datagram);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receives_datagrams() {
        let collector = MockCollector::bind().await.unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"73", collector.addr()).await.unwrap();

        let (data, src) = collector.recv(Duration::from_secs(2)).await.unwrap();
        assert_eq!(data, b"73");
        assert_eq!(src, sender.local_addr().unwrap());
    }

    #[tokio::test]
    async fn recv_times_out() {
        let collector = MockCollector::bind().await.unwrap();
        let result = collector.recv(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn recv_until_idle_collects_all() {
        let collector = MockCollector::bind().await.unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        for msg in [&b"a"[..], b"bb", b"ccc"] {
            sender.send_to(msg, collector.addr()).await.unwrap();
        }

        let got = collector.recv_until_idle(Duration::from_millis(200)).await;
        assert_eq!(got, vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]);
    }
}
