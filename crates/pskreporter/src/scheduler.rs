//! Batching scheduler: the single background task behind a [`Spotter`].
//!
//! The task owns the queue consumer, the transport, the random source and
//! all per-session counters, so none of them need locking. It runs a small
//! state machine:
//!
//! - **Connecting** -- dial, then send one initial flush (templates plus
//!   whatever is already queued). On failure sleep the backoff delay and
//!   try again; the sleep is cut short by a shutdown request.
//! - **Armed** -- every tick, flush if at least `max_spots` are queued or the
//!   queue is non-empty and `linger_time` has passed since the last flush.
//!   A failed flush drops the transport and goes back to Connecting.
//! - **ShuttingDown** -- one best-effort final flush, close the transport,
//!   acknowledge the close request.
//! - **Closed** -- the task returns.
//!
//! [`Spotter`]: crate::Spotter

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use pskreporter_core::error::Result;
use pskreporter_core::{unix_time_seconds, PacketCounter, SpotKind};
use pskreporter_ipfix::message::{encode_message, MessageHeader, HEADER_LEN};
use pskreporter_ipfix::set::{encode_data_set, SENDER_SET_ID};

use crate::connection::ConnectionManager;
use crate::packer::pack_sender_records;
use crate::queue::SpotQueue;

/// Template probability at session start. Values above 1 guarantee the
/// first few flushes carry templates.
pub const INITIAL_HEADER_PROBABILITY: f32 = 4.0;

/// Factor applied to the template probability after every flush.
pub const HEADER_PROBABILITY_DECAY: f32 = 0.65;

/// The template probability never drops below this.
pub const HEADER_PROBABILITY_FLOOR: f32 = 0.1;

/// Decaying probability of including the template sets in a flush.
///
/// PSK Reporter prefers templates to be repeated occasionally rather than in
/// every datagram. Lost template datagrams are made up for by later ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderProbability(f32);

impl HeaderProbability {
    /// Start at [`INITIAL_HEADER_PROBABILITY`].
    pub fn new() -> Self {
        HeaderProbability(INITIAL_HEADER_PROBABILITY)
    }

    /// Current probability (may exceed 1 early in the session).
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Whether a uniform `[0, 1)` sample selects templates.
    pub fn includes(&self, sample: f32) -> bool {
        sample < self.0
    }

    /// Apply one flush worth of decay.
    pub fn decay(&mut self) {
        self.0 = (self.0 * HEADER_PROBABILITY_DECAY).max(HEADER_PROBABILITY_FLOOR);
    }
}

impl Default for HeaderProbability {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for a transport and a successful initial flush.
    Connecting,
    /// Connected; flushing on ticks.
    Armed,
    /// Close requested; final flush pending.
    ShuttingDown,
    /// Task finished.
    Closed,
}

/// Flush timing knobs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SchedulerConfig {
    pub max_spots: usize,
    pub linger_time: Duration,
    pub tick_interval: Duration,
}

/// Everything about the reporting session that changes only in the task.
#[derive(Debug)]
pub(crate) struct Session {
    pub spot_kind: SpotKind,
    /// Receiver and sender template sets, fixed for the session.
    pub templates: Vec<u8>,
    /// Encoded receiver data set, fixed for the session.
    pub receiver_set: Vec<u8>,
    /// Observation domain ID.
    pub session_id: u32,
    pub sequence_number: u32,
    pub header_probability: HeaderProbability,
    pub last_flush: Instant,
    pub rng: StdRng,
}

/// The background task state.
pub(crate) struct Scheduler {
    pub session: Session,
    pub queue: SpotQueue,
    pub conn: ConnectionManager,
    pub counter: Option<Arc<dyn PacketCounter>>,
    pub config: SchedulerConfig,
    /// Close request from the handle; a dropped handle counts as one.
    pub done: oneshot::Receiver<()>,
    pub done_ack: Option<oneshot::Sender<()>>,
}

/// Spawn the scheduler task.
pub(crate) fn spawn_scheduler(scheduler: Scheduler) -> JoinHandle<()> {
    tokio::spawn(scheduler.run())
}

impl Scheduler {
    async fn run(mut self) {
        debug!(
            collector = %self.conn.describe(),
            session_id = self.session.session_id,
            max_payload_bytes = self.conn.max_payload_bytes(),
            "Scheduler started"
        );

        let mut state = State::Connecting;
        loop {
            let next = match state {
                State::Connecting => self.connecting().await,
                State::Armed => self.armed().await,
                State::ShuttingDown => self.shutting_down().await,
                State::Closed => break,
            };
            if next != state {
                debug!(from = ?state, to = ?next, "Scheduler state change");
            }
            state = next;
        }
    }

    async fn connecting(&mut self) -> State {
        match self.conn.connect().await {
            Ok(()) => match self.flush().await {
                Ok(()) => {
                    self.conn.reset_backoff();
                    return State::Armed;
                }
                Err(e) => {
                    warn!(collector = %self.conn.describe(), error = %e, "Initial flush failed");
                    self.conn.disconnect().await;
                }
            },
            Err(e) => {
                warn!(collector = %self.conn.describe(), error = %e, "Failed to connect to collector");
            }
        }

        let delay = self.conn.next_backoff();
        debug!(delay_ms = delay.as_millis() as u64, "Waiting before reconnecting");

        tokio::select! {
            biased;

            _ = &mut self.done => State::ShuttingDown,
            _ = tokio::time::sleep(delay) => State::Connecting,
        }
    }

    async fn armed(&mut self) -> State {
        let tick = self.config.tick_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut self.done => return State::ShuttingDown,

                _ = ticker.tick() => {
                    if !self.flush_due() {
                        continue;
                    }
                    if let Err(e) = self.flush().await {
                        warn!(collector = %self.conn.describe(), error = %e, "Flush failed, reconnecting");
                        self.conn.disconnect().await;
                        return State::Connecting;
                    }
                }
            }
        }
    }

    async fn shutting_down(&mut self) -> State {
        let queued = self.queue.len();
        if self.conn.is_connected() {
            if let Err(e) = self.flush().await {
                warn!(error = %e, "Final flush failed");
            }
        } else {
            warn!(queued, "Not connected, skipping final flush");
        }
        self.conn.disconnect().await;

        if let Some(ack) = self.done_ack.take() {
            if ack.send(()).is_err() {
                debug!("Close requester went away before acknowledgment");
            }
        }

        info!(
            collector = %self.conn.describe(),
            datagrams = self.session.sequence_number,
            unsent = self.queue.len(),
            "Spot client closed"
        );
        State::Closed
    }

    fn flush_due(&self) -> bool {
        flush_due(
            self.queue.len(),
            self.session.last_flush.elapsed(),
            &self.config,
        )
    }

    /// Build one datagram from the queue and send it.
    ///
    /// The sequence number advances whether or not the write succeeds.
    async fn flush(&mut self) -> Result<()> {
        let session = &mut self.session;

        let sample: f32 = session.rng.gen();
        let include_templates = session.header_probability.includes(sample);
        session.header_probability.decay();

        let templates: &[u8] = if include_templates {
            &session.templates
        } else {
            &[]
        };

        let ceiling = self
            .conn
            .max_payload_bytes()
            .saturating_sub(HEADER_LEN + session.receiver_set.len());
        let budget = ceiling.saturating_sub(templates.len());
        let packed = pack_sender_records(&mut self.queue, session.spot_kind, budget, ceiling);

        let mut records = session.receiver_set.clone();
        records.extend(encode_data_set(SENDER_SET_ID, &packed.payload)?);

        let header = MessageHeader {
            export_time: unix_time_seconds(),
            sequence_number: session.sequence_number,
            observation_domain: session.session_id,
        };
        let datagram = encode_message(&header, templates, &records)?;
        session.sequence_number = session.sequence_number.wrapping_add(1);

        debug!(
            sequence = header.sequence_number,
            records = packed.records,
            dropped = packed.dropped,
            templates = include_templates,
            queued = self.queue.len(),
            "Flushing spots"
        );

        self.conn.send(&datagram).await?;

        tracing::trace!(
            sequence = header.sequence_number,
            bytes = datagram.len(),
            remote = ?self.conn.peer_addr(),
            "Datagram sent"
        );
        if let Some(counter) = &self.counter {
            counter.increment(self.conn.local_addr(), self.conn.peer_addr());
        }
        session.last_flush = Instant::now();
        Ok(())
    }
}

/// Whether a tick should flush: the queue reached `max_spots`, or it is
/// non-empty and has lingered for `linger_time`.
pub(crate) fn flush_due(queued: usize, since_last_flush: Duration, config: &SchedulerConfig) -> bool {
    queued >= config.max_spots || (queued > 0 && since_last_flush >= config.linger_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            max_spots: 25,
            linger_time: Duration::from_secs(300),
            tick_interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn header_probability_decays_to_floor() {
        let mut p = HeaderProbability::new();
        let mut previous = p.value();
        for _ in 0..50 {
            p.decay();
            assert!(p.value() <= previous);
            assert!(p.value() >= HEADER_PROBABILITY_FLOOR);
            previous = p.value();
        }
        assert_eq!(p.value(), HEADER_PROBABILITY_FLOOR);
    }

    #[test]
    fn header_probability_first_flushes_always_include() {
        let mut p = HeaderProbability::new();
        // 4.0, 2.6, 1.69, 1.0985
        for _ in 0..4 {
            assert!(p.value() > 1.0);
            assert!(p.includes(0.999_999));
            p.decay();
        }
        assert!(p.value() < 1.0);
    }

    #[test]
    fn header_probability_at_floor_is_one_in_ten() {
        let mut p = HeaderProbability::new();
        for _ in 0..20 {
            p.decay();
        }
        assert!(p.includes(0.05));
        assert!(!p.includes(0.1));
        assert!(!p.includes(0.5));
    }

    #[test]
    fn flush_on_count_threshold() {
        assert!(flush_due(25, Duration::ZERO, &config()));
        assert!(flush_due(100, Duration::from_secs(1), &config()));
        assert!(!flush_due(24, Duration::from_secs(299), &config()));
    }

    #[test]
    fn flush_on_linger() {
        assert!(flush_due(1, Duration::from_secs(300), &config()));
        assert!(!flush_due(1, Duration::from_millis(299_999), &config()));
    }

    #[test]
    fn empty_queue_never_lingers() {
        assert!(!flush_due(0, Duration::from_secs(3600), &config()));
    }
}
