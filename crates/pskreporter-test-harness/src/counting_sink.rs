//! Recording [`PacketCounter`] for assertions on per-datagram counting.

use pskreporter_core::PacketCounter;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Counts increments and remembers the address labels of each one.
///
/// Clones share state, so one clone can go to the builder and the other
/// stay with the test.
#[derive(Debug, Clone, Default)]
pub struct CountingSink {
    count: Arc<AtomicU64>,
    labels: Arc<Mutex<Vec<(Option<SocketAddr>, Option<SocketAddr>)>>>,
}

impl CountingSink {
    /// Create a sink at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of increments so far.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// `(local, remote)` of every increment, in order.
    pub fn labels(&self) -> Vec<(Option<SocketAddr>, Option<SocketAddr>)> {
        self.labels
            .lock()
            .expect("counting sink labels poisoned")
            .clone()
    }
}

impl PacketCounter for CountingSink {
    fn increment(&self, local: Option<SocketAddr>, remote: Option<SocketAddr>) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.labels
            .lock()
            .expect("counting sink labels poisoned")
            .push((local, remote));
    }
}
