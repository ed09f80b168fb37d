//! The [`Spotter`] handle: feed spots in, close when done.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use pskreporter_core::error::{Error, Result};
use pskreporter_core::{Spot, SpotKind, Station};

/// Handle to a running spot client.
///
/// Created by [`SpotterBuilder`](crate::SpotterBuilder). Spots passed to
/// [`feed`](Self::feed) are queued and sent by a background task in batches.
/// Delivery is not guaranteed: PSK Reporter is reached over UDP and never
/// acknowledges anything.
///
/// Call [`close`](Self::close) to flush what is queued and stop the task.
/// Dropping the handle also stops the task, after the same best-effort
/// final flush, but nobody waits for it.
#[derive(Debug)]
pub struct Spotter {
    tx: mpsc::Sender<Spot>,
    done: oneshot::Sender<()>,
    done_ack: oneshot::Receiver<()>,
    task: JoinHandle<()>,
    close_timeout: Duration,
    receiver: Station,
    persistent_identifier: String,
    session_id: u32,
    spot_kind: SpotKind,
    max_payload_bytes: usize,
}

/// Everything [`Spotter::new`] needs besides the channels and task.
#[derive(Debug)]
pub(crate) struct SpotterInfo {
    pub close_timeout: Duration,
    pub receiver: Station,
    pub persistent_identifier: String,
    pub session_id: u32,
    pub spot_kind: SpotKind,
    pub max_payload_bytes: usize,
}

impl Spotter {
    pub(crate) fn new(
        tx: mpsc::Sender<Spot>,
        done: oneshot::Sender<()>,
        done_ack: oneshot::Receiver<()>,
        task: JoinHandle<()>,
        info: SpotterInfo,
    ) -> Self {
        Spotter {
            tx,
            done,
            done_ack,
            task,
            close_timeout: info.close_timeout,
            receiver: info.receiver,
            persistent_identifier: info.persistent_identifier,
            session_id: info.session_id,
            spot_kind: info.spot_kind,
            max_payload_bytes: info.max_payload_bytes,
        }
    }

    /// Queue a spot for sending.
    ///
    /// Waits while the queue is full. Fails with [`Error::NotConnected`]
    /// only if the background task is gone.
    pub async fn feed(&self, spot: Spot) -> Result<()> {
        self.tx.send(spot).await.map_err(|_| Error::NotConnected)
    }

    /// Queue a spot from synchronous code, blocking the thread while the
    /// queue is full.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context; use
    /// [`feed`](Self::feed) there.
    pub fn blocking_feed(&self, spot: Spot) -> Result<()> {
        self.tx.blocking_send(spot).map_err(|_| Error::NotConnected)
    }

    /// The receiving station.
    pub fn receiver(&self) -> &Station {
        &self.receiver
    }

    /// The persistent identifier, generated at build time if none was given.
    pub fn persistent_identifier(&self) -> &str {
        &self.persistent_identifier
    }

    /// The random session identifier sent as the IPFIX observation domain.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// The sender record layout used by this client.
    pub fn spot_kind(&self) -> SpotKind {
        self.spot_kind
    }

    /// Largest datagram this client will send.
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Stop the background task after a final best-effort flush.
    ///
    /// Waits at most the configured close timeout for the task to
    /// acknowledge. Returns [`Error::Timeout`] if it does not (for example
    /// because it is stuck in a dial), after aborting the task, and
    /// [`Error::NotConnected`] if the task had already exited.
    pub async fn close(self) -> Result<()> {
        let Spotter {
            tx,
            done,
            done_ack,
            task,
            close_timeout,
            receiver,
            ..
        } = self;
        drop(tx);

        if done.send(()).is_err() {
            let _ = task.await;
            return Err(Error::NotConnected);
        }

        match tokio::time::timeout(close_timeout, done_ack).await {
            Ok(Ok(())) => {
                let _ = task.await;
                tracing::debug!(callsign = %receiver.callsign, "Connection to collector closed");
                Ok(())
            }
            Ok(Err(_)) => {
                let _ = task.await;
                Err(Error::NotConnected)
            }
            Err(_) => {
                tracing::warn!(
                    callsign = %receiver.callsign,
                    timeout_ms = close_timeout.as_millis() as u64,
                    "Timed out waiting for the scheduler to close"
                );
                task.abort();
                Err(Error::Timeout)
            }
        }
    }
}
