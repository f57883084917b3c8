//! The counter's background worker.
//!
//! Exactly one [`Worker`] exists per counter and it is the only code that
//! touches the [`Ring`]. Adds, flushes, rotation ticks and the stop request are
//! merged by a single `select!` loop and applied one per iteration, so no lock
//! guards the buckets. After every mutation the worker publishes the ring
//! total to an atomic that `Counter::total` reads.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{
    sync::{mpsc, oneshot},
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tracing::{debug, info, trace};

use crate::ring::Ring;

/// Requests sent from a `Counter` to its `Worker`.
#[derive(Debug)]
pub(crate) enum Event {
    /// Accumulate a value. If `ack` is present it is completed once the value
    /// is part of the total.
    Add {
        value: u64,
        ack: Option<oneshot::Sender<()>>,
    },
    /// Zero the ring, completing `ack` once done.
    Flush { ack: oneshot::Sender<()> },
}

#[derive(Debug)]
pub(crate) struct Worker {
    ring: Ring,
    published: Arc<AtomicU64>,
    events: mpsc::Receiver<Event>,
    shutdown: oneshot::Receiver<()>,
    first_rotation: Instant,
    resolution: Duration,
}

impl Worker {
    /// Create a new `Worker`. Rotations happen at `first_rotation` and every
    /// `resolution` after.
    pub(crate) fn new(
        buckets: usize,
        resolution: Duration,
        first_rotation: Instant,
        published: Arc<AtomicU64>,
        events: mpsc::Receiver<Event>,
        shutdown: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            ring: Ring::new(buckets),
            published,
            events,
            shutdown,
            first_rotation,
            resolution,
        }
    }

    /// Run this [`Worker`] until a stop is requested or every sender is
    /// dropped.
    pub(crate) async fn run(mut self) {
        let mut rotation = time::interval_at(self.first_rotation, self.resolution);
        // Missed ticks are all delivered so no bucket is skipped.
        rotation.set_missed_tick_behavior(MissedTickBehavior::Burst);

        debug!(
            buckets = self.ring.len(),
            resolution = ?self.resolution,
            "rotating counter worker started"
        );

        loop {
            tokio::select! {
                biased;

                res = &mut self.shutdown => {
                    match res {
                        Ok(()) => info!("shutdown signal received"),
                        Err(_) => debug!("counter handle dropped, worker exiting"),
                    }
                    break;
                }
                _ = rotation.tick() => {
                    self.ring.rotate();
                    self.publish();
                    trace!(total = self.ring.total(), "rotated");
                }
                event = self.events.recv() => {
                    match event {
                        Some(event) => self.handle(event),
                        None => {
                            debug!("intake closed, worker exiting");
                            break;
                        }
                    }
                }
            }
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Add { value, ack } => {
                self.ring.add(value);
                self.publish();
                if let Some(ack) = ack {
                    // The caller may have stopped waiting, nothing to do.
                    let _ = ack.send(());
                }
            }
            Event::Flush { ack } => {
                self.ring.flush();
                self.publish();
                let _ = ack.send(());
            }
        }
    }

    #[inline]
    fn publish(&self) {
        self.published.store(self.ring.total(), Ordering::Release);
    }
}
