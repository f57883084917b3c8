//! The public counter handle.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{Duration, Instant},
};
use tracing::{error, warn};

use crate::{
    Config, Error,
    layout::Layout,
    worker::{Event, Worker},
};

/// A running sum over a trailing window of time.
///
/// Values passed to [`Counter::add`] land in the bucket that is current when
/// the background worker applies them. Every resolution the worker moves to
/// the next bucket and drops the oldest one from the total, so a value
/// contributes to [`Counter::total`] for between `duration - resolution` and
/// `duration`.
///
/// The counter runs a task on the tokio runtime it was created in. Call
/// [`Counter::stop`] to end it. A counter dropped without stopping aborts its
/// task.
///
/// Share a counter between producers with an `Arc`.
#[derive(Debug)]
pub struct Counter {
    layout: Layout,
    blocking: bool,
    total: Arc<AtomicU64>,
    events: mpsc::Sender<Event>,
    shutdown: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Counter {
    /// Create a new `Counter` holding `duration` of history in buckets roughly
    /// `resolution` wide.
    ///
    /// A `buffer_size` of zero makes [`Counter::add`] wait until its value is
    /// counted. Any other value is the depth of the intake queue, `add` then
    /// returns as soon as its value is queued and the total is eventually
    /// consistent.
    ///
    /// The counter starts rotating immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be laid out, see [`Layout::new`],
    /// if the first rotation cannot be scheduled because the resolution is too
    /// large, or if called outside of a tokio runtime.
    pub fn new(duration: Duration, resolution: Duration, buffer_size: u8) -> Result<Self, Error> {
        let layout = Layout::new(duration, resolution)?;
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        // `interval` would fire immediately, the first rotation must wait a
        // full resolution.
        let first_rotation = Instant::now()
            .checked_add(layout.resolution())
            .ok_or(Error::DurationTooLarge)?;

        let blocking = buffer_size == 0;
        // Blocking adds wait on their own acknowledgement, a single slot is
        // enough to hand values over.
        let depth = usize::from(buffer_size.max(1));
        let (events_tx, events_rx) = mpsc::channel(depth);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let total = Arc::new(AtomicU64::new(0));

        let worker = Worker::new(
            layout.buckets(),
            layout.resolution(),
            first_rotation,
            Arc::clone(&total),
            events_rx,
            shutdown_rx,
        );
        let worker = runtime.spawn(worker.run());

        Ok(Self {
            layout,
            blocking,
            total,
            events: events_tx,
            shutdown: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    /// Create a new `Counter` from a [`Config`].
    ///
    /// # Errors
    ///
    /// See [`Counter::new`].
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(
            Duration::from_millis(config.duration_milliseconds.get()),
            Duration::from_millis(config.resolution_milliseconds.get()),
            config.buffer_size,
        )
    }

    /// Add `value` to the current bucket.
    ///
    /// In blocking mode this returns once the value is reflected in
    /// [`Counter::total`]. Otherwise it returns once the value is queued,
    /// waiting only while the queue is full.
    pub async fn add(&self, value: u64) {
        if self.blocking {
            let (ack_tx, ack_rx) = oneshot::channel();
            let event = Event::Add {
                value,
                ack: Some(ack_tx),
            };
            if self.events.send(event).await.is_err() {
                warn!(value, "counter worker is gone, value dropped");
                return;
            }
            if ack_rx.await.is_err() {
                warn!(value, "counter worker exited before applying value");
            }
        } else {
            let event = Event::Add { value, ack: None };
            if self.events.send(event).await.is_err() {
                warn!(value, "counter worker is gone, value dropped");
            }
        }
    }

    /// The sum of every value still inside the window.
    ///
    /// This never waits on the worker. With a non-zero buffer the result may
    /// not yet include values that are queued.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Zero every bucket and the total.
    ///
    /// The flush is ordered with adds and rotations: values queued before the
    /// call are discarded with the rest, values queued after it are kept.
    /// Rotation and configuration are unaffected.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.events.send(Event::Flush { ack: ack_tx }).await.is_err() {
            warn!("counter worker is gone, flush ignored");
            return;
        }
        if ack_rx.await.is_err() {
            warn!("counter worker exited before flushing");
        }
    }

    /// Stop the counter, waiting for its worker to exit.
    ///
    /// The rotation timer and intake queue are released.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // An error means the worker already exited.
            let _ = shutdown.send(());
        }
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                error!("counter worker failed: {err}");
            }
        }
    }

    /// The number of buckets the window is divided into.
    #[must_use]
    pub fn buckets(&self) -> usize {
        self.layout.buckets()
    }

    /// The width of the window.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.layout.duration()
    }

    /// The effective width of a bucket. May differ from the requested
    /// resolution, see [`Layout`].
    #[must_use]
    pub fn resolution(&self) -> Duration {
        self.layout.resolution()
    }

    /// Whether [`Counter::add`] waits for its value to be counted.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }
}

impl Drop for Counter {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
