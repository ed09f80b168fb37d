//! Bounded FIFO of pending spots.
//!
//! Producers hold the [`mpsc::Sender`] half and wait for capacity when the
//! queue is full. The scheduler owns the [`SpotQueue`] consumer, polls it
//! without blocking, and puts back the one spot per flush that did not fit
//! in the datagram.

use pskreporter_core::Spot;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Create a queue holding at most `capacity` spots.
///
/// Returns the producer half (cloned into every [`Spotter`](crate::Spotter)
/// caller) and the consumer half owned by the scheduler.
pub fn spot_queue(capacity: usize) -> (mpsc::Sender<Spot>, SpotQueue) {
    let (tx, rx) = mpsc::channel(capacity);
    let queue = SpotQueue {
        rx,
        requeue_tx: tx.clone(),
        carry: None,
    };
    (tx, queue)
}

/// Consumer side of the spot queue.
#[derive(Debug)]
pub struct SpotQueue {
    rx: mpsc::Receiver<Spot>,
    /// Sender used to push overflow spots back onto the tail.
    requeue_tx: mpsc::Sender<Spot>,
    /// Overflow spot that could not be re-sent because the channel was full.
    carry: Option<Spot>,
}

impl SpotQueue {
    /// Number of spots waiting, including a carried overflow spot.
    pub fn len(&self) -> usize {
        self.rx.len() + usize::from(self.carry.is_some())
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the next spot without waiting.
    ///
    /// A carried overflow spot is returned before anything in the channel.
    pub fn try_pop(&mut self) -> Option<Spot> {
        if let Some(spot) = self.carry.take() {
            return Some(spot);
        }
        self.rx.try_recv().ok()
    }

    /// Put a spot that did not fit back onto the tail of the queue.
    ///
    /// If producers have filled the channel in the meantime, the spot is kept
    /// aside and handed out first by the next [`try_pop`](Self::try_pop).
    pub fn requeue(&mut self, spot: Spot) {
        match self.requeue_tx.try_send(spot) {
            Ok(()) => {}
            Err(TrySendError::Full(spot)) | Err(TrySendError::Closed(spot)) => {
                tracing::debug!(sender = %spot.sender, "Queue full, carrying overflow spot");
                if let Some(previous) = self.carry.replace(spot) {
                    // Only one spot is put back per flush and the carry slot
                    // is always drained first, so this cannot happen.
                    tracing::warn!(sender = %previous.sender, "Dropping carried spot");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pskreporter_core::InformationSource;

    fn spot(n: u64) -> Spot {
        Spot::new(
            format!("K{n}"),
            "FN31",
            14_074_000 + n,
            -10,
            0,
            "FT8",
            InformationSource::AUTOMATIC,
            0,
        )
    }

    #[tokio::test]
    async fn fifo_order() {
        let (tx, mut queue) = spot_queue(8);
        for n in 0..3 {
            tx.send(spot(n)).await.unwrap();
        }
        assert_eq!(queue.len(), 3);

        let got: Vec<u64> = std::iter::from_fn(|| queue.try_pop())
            .map(|s| s.frequency)
            .collect();
        assert_eq!(got, vec![14_074_000, 14_074_001, 14_074_002]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn requeue_goes_to_tail() {
        let (tx, mut queue) = spot_queue(8);
        for n in 0..3 {
            tx.send(spot(n)).await.unwrap();
        }

        let first = queue.try_pop().unwrap();
        queue.requeue(first);

        let got: Vec<u64> = std::iter::from_fn(|| queue.try_pop())
            .map(|s| s.frequency - 14_074_000)
            .collect();
        assert_eq!(got, vec![1, 2, 0]);
    }

    #[tokio::test]
    async fn requeue_into_full_channel_uses_carry() {
        let (tx, mut queue) = spot_queue(2);
        tx.send(spot(0)).await.unwrap();
        tx.send(spot(1)).await.unwrap();

        let first = queue.try_pop().unwrap();
        // A producer takes the freed slot before the spot is put back.
        tx.send(spot(2)).await.unwrap();
        queue.requeue(first);

        assert_eq!(queue.len(), 3);
        let got: Vec<u64> = std::iter::from_fn(|| queue.try_pop())
            .map(|s| s.frequency - 14_074_000)
            .collect();
        assert_eq!(got, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn full_queue_applies_backpressure() {
        let (tx, mut queue) = spot_queue(1);
        tx.send(spot(0)).await.unwrap();
        assert!(tx.try_send(spot(1)).is_err());

        let pending = tokio::spawn({
            let tx = tx.clone();
            async move { tx.send(spot(1)).await }
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        queue.try_pop().unwrap();
        pending.await.unwrap().unwrap();
        assert_eq!(queue.len(), 1);
    }
}
