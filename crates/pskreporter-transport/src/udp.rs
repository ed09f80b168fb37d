//! UDP transport to the PSK Reporter collector.
//!
//! [`UdpTransport`] is a connected UDP socket: the collector address is
//! resolved once, a local socket of the matching family is bound to an
//! ephemeral port, and every datagram goes to that one peer. UDP "connect"
//! performs no handshake, so dialing only fails on resolution or local
//! socket errors; unreachable collectors usually surface later as send
//! errors (ICMP port unreachable) or not at all.
//!
//! [`UdpConnector`] implements [`Connector`] for a `host:port` string and is
//! what the client's builder uses by default.
//!
//! # Example
//!
//! ```no_run
//! use pskreporter_core::DatagramTransport;
//! use pskreporter_transport::UdpTransport;
//!
//! # async fn example() -> pskreporter_core::Result<()> {
//! let mut transport = UdpTransport::connect("report.pskreporter.info:4739").await?;
//! transport.send(&[0x00, 0x0A, 0x00, 0x10]).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use pskreporter_core::error::{Error, Result};
use pskreporter_core::transport::{AddressFamily, Connector, DatagramTransport};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Connected UDP socket to one collector.
#[derive(Debug)]
pub struct UdpTransport {
    /// The underlying socket, `None` after `close()` is called.
    socket: Option<UdpSocket>,
    /// The local address the socket is bound to.
    local_addr: SocketAddr,
    /// The resolved collector address.
    peer_addr: SocketAddr,
}

impl UdpTransport {
    /// Resolve `host_port` and connect a fresh socket to it.
    ///
    /// The first resolved address is used. The local socket is bound to the
    /// unspecified address of the same family on an ephemeral port.
    pub async fn connect(host_port: &str) -> Result<Self> {
        tracing::debug!(addr = %host_port, "Resolving collector address");

        let peer_addr = tokio::net::lookup_host(host_port)
            .await
            .map_err(|e| {
                tracing::error!(addr = %host_port, error = %e, "Failed to resolve collector");
                Error::Transport(format!("failed to resolve {host_port}: {e}"))
            })?
            .next()
            .ok_or_else(|| Error::Transport(format!("no addresses found for {host_port}")))?;

        Self::connect_addr(peer_addr).await
    }

    /// Connect a fresh socket to an already resolved address.
    pub async fn connect_addr(peer_addr: SocketAddr) -> Result<Self> {
        let bind_addr: SocketAddr = match peer_addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| {
            tracing::error!(addr = %bind_addr, error = %e, "Failed to bind UDP socket");
            Error::Io(e)
        })?;

        socket.connect(peer_addr).await.map_err(|e| {
            tracing::error!(remote = %peer_addr, error = %e, "Failed to connect UDP socket");
            Error::Io(e)
        })?;

        let local_addr = socket.local_addr().map_err(|e| {
            tracing::error!(error = %e, "Failed to get local address");
            Error::Io(e)
        })?;

        tracing::info!(local = %local_addr, remote = %peer_addr, "UDP socket connected");

        Ok(Self {
            socket: Some(socket),
            local_addr,
            peer_addr,
        })
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send(&mut self, datagram: &[u8]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        tracing::trace!(
            local = %self.local_addr,
            remote = %self.peer_addr,
            bytes = datagram.len(),
            "Sending datagram"
        );

        let written = socket.send(datagram).await.map_err(|e| {
            tracing::error!(
                local = %self.local_addr,
                remote = %self.peer_addr,
                error = %e,
                "Failed to send datagram"
            );
            Error::Io(e)
        })?;

        if written != datagram.len() {
            return Err(Error::Transport(format!(
                "short datagram write: {written} of {} bytes",
                datagram.len()
            )));
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.socket.take().is_some() {
            tracing::debug!(remote = %self.peer_addr, "Closing UDP socket");
        }
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer_addr)
    }
}

/// [`Connector`] that dials a `host:port` collector over UDP.
#[derive(Debug, Clone)]
pub struct UdpConnector {
    host_port: String,
    family: AddressFamily,
}

impl UdpConnector {
    /// Create a connector for `host_port`, e.g. `"report.pskreporter.info:4739"`.
    ///
    /// The address family used to size datagrams is guessed from the string
    /// once, here, and never re-derived from later DNS answers.
    pub fn new(host_port: impl Into<String>) -> Self {
        let host_port = host_port.into();
        let family = AddressFamily::from_host_port(&host_port);
        UdpConnector { host_port, family }
    }

    /// The configured collector address.
    pub fn host_port(&self) -> &str {
        &self.host_port
    }
}

#[async_trait]
impl Connector for UdpConnector {
    async fn connect(&self) -> Result<Box<dyn DatagramTransport>> {
        let transport = UdpTransport::connect(&self.host_port).await?;
        Ok(Box::new(transport))
    }

    fn address_family(&self) -> AddressFamily {
        self.family
    }

    fn describe(&self) -> String {
        self.host_port.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn receiver() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn connect_and_addresses() {
        let rx = receiver().await;
        let rx_addr = rx.local_addr().unwrap();

        let transport = UdpTransport::connect(&rx_addr.to_string()).await.unwrap();
        assert_eq!(transport.peer_addr(), Some(rx_addr));
        let local = transport.local_addr().unwrap();
        assert!(local.is_ipv4());
        assert_ne!(local.port(), 0, "OS should assign a nonzero port");
    }

    #[tokio::test]
    async fn send_loopback() {
        let rx = receiver().await;
        let mut transport = UdpTransport::connect_addr(rx.local_addr().unwrap())
            .await
            .unwrap();

        let data = b"\x00\x0A\x00\x10 CQ DE N0CALL";
        transport.send(data).await.unwrap();

        let mut buf = [0u8; 256];
        let (n, src) = tokio::time::timeout(Duration::from_secs(2), rx.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], data);
        assert_eq!(src.port(), transport.local_addr().unwrap().port());
    }

    #[tokio::test]
    async fn datagrams_stay_separate() {
        let rx = receiver().await;
        let mut transport = UdpTransport::connect_addr(rx.local_addr().unwrap())
            .await
            .unwrap();

        let messages: &[&[u8]] = &[b"first", b"second datagram", b"3"];
        for msg in messages {
            transport.send(msg).await.unwrap();
        }

        let mut buf = [0u8; 256];
        for expected in messages {
            let n = tokio::time::timeout(Duration::from_secs(2), rx.recv(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&buf[..n], *expected);
        }
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let rx = receiver().await;
        let mut transport = UdpTransport::connect_addr(rx.local_addr().unwrap())
            .await
            .unwrap();
        transport.close().await.unwrap();
        // Closing twice is harmless.
        transport.close().await.unwrap();

        let result = transport.send(b"late").await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn connect_unresolvable_host_fails() {
        let result = UdpTransport::connect("no-such-host.invalid:4739").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn connector_dials_fresh_sockets() {
        let rx = receiver().await;
        let connector = UdpConnector::new(rx.local_addr().unwrap().to_string());
        assert_eq!(connector.address_family(), AddressFamily::V4);
        assert_eq!(connector.describe(), rx.local_addr().unwrap().to_string());

        let a = connector.connect().await.unwrap();
        let b = connector.connect().await.unwrap();
        assert_ne!(a.local_addr(), b.local_addr());
    }

    #[test]
    fn connector_family_from_host_port() {
        assert_eq!(
            UdpConnector::new("[::1]:4739").address_family(),
            AddressFamily::V6
        );
        assert_eq!(
            UdpConnector::new("localhost:4739").address_family(),
            AddressFamily::V4
        );
    }
}
