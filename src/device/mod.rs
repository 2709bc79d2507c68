//! Core device instance: shared state, lifecycle, and settings operations.
//!
//! One [`Device`] owns the record queue, the alert latch, the configuration
//! store, the counters, and the producer task. Reader handles and attribute
//! operations pin the instance through reference counting; tear-down stops
//! the producer, waits for any in-flight tick, and wakes every blocked
//! reader.

pub mod producer;
pub mod reader;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use anyhow::{ensure, Result};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::alert::AlertLatch;
use crate::attrs::AttrSet;
use crate::clock::Clock;
use crate::config::{BindingConfig, Mode, Settings};
use crate::error::DeviceError;
use crate::queue::SampleQueue;
use crate::record::Sample;

use self::reader::Reader;

/// Monotonically increasing data-plane counters.
///
/// Updated atomically so `stats` shows never contend with the hot path.
#[derive(Debug, Default)]
pub struct Counters {
    updates: AtomicU64,
    alerts: AtomicU64,
    drops: AtomicU64,
}

impl Counters {
    pub(crate) fn count_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_alert(&self) {
        self.alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_drop(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Lock-free snapshot of all three counters.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            updates: self.updates.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Records ever committed to the queue.
    pub updates: u64,
    /// Clear-to-armed transitions of the alert latch.
    pub alerts: u64,
    /// Records evicted on overflow or discarded without commit.
    pub drops: u64,
}

/// Queue and latch guarded together; their critical sections cover only a
/// capacity check, one record move, and a latch/counter touch.
pub(crate) struct Fifo {
    pub(crate) queue: SampleQueue,
    pub(crate) alert: AlertLatch,
}

/// State shared between the lifecycle owner, the producer task, reader
/// handles, and attribute operations.
pub(crate) struct Shared {
    /// Record queue + alert latch under the short-critical-section lock.
    pub(crate) fifo: parking_lot::Mutex<Fifo>,
    /// Configuration store. Never acquired while holding `fifo`.
    pub(crate) settings: tokio::sync::Mutex<Settings>,
    pub(crate) counters: Counters,
    /// Signalled after every commit; waiting readers re-check the queue.
    pub(crate) data_ready: Notify,
    /// Nudges the producer to restart its delay with a fresh period.
    pub(crate) reschedule: Notify,
    /// One-way stopping flag; cancelling it also wakes every waiter.
    pub(crate) cancel: CancellationToken,
    pub(crate) clock: Clock,
}

impl Shared {
    fn new(settings: Settings) -> Self {
        Self {
            fifo: parking_lot::Mutex::new(Fifo {
                queue: SampleQueue::new(),
                alert: AlertLatch::new(),
            }),
            settings: tokio::sync::Mutex::new(settings),
            counters: Counters::default(),
            data_ready: Notify::new(),
            reschedule: Notify::new(),
            cancel: CancellationToken::new(),
            clock: Clock::new(),
        }
    }

    pub(crate) fn stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Pop one record for a reader, clearing the latch when the record
    /// carries the threshold mark.
    pub(crate) fn consume_one(&self) -> Option<Sample> {
        let mut fifo = self.fifo.lock();
        let sample = fifo.queue.pop_one()?;
        if sample.crossed_threshold() {
            fifo.alert.clear();
        }
        Some(sample)
    }

    /// Observe (queue non-empty, latch armed) in one critical section.
    pub(crate) fn stream_state(&self) -> (bool, bool) {
        let fifo = self.fifo.lock();
        (!fifo.queue.is_empty(), fifo.alert.is_armed())
    }

    /// Set the producer period. Rejects zero; the producer restarts its
    /// delay so the new cadence takes effect within one pending tick.
    pub(crate) async fn set_sampling_ms(&self, ms: u32) -> Result<(), DeviceError> {
        if ms == 0 {
            return Err(DeviceError::InvalidArgument);
        }

        {
            let mut settings = self.settings.lock().await;
            settings.sampling_ms = ms;
        }

        // A no-op once the producer has exited.
        self.reschedule.notify_one();
        Ok(())
    }

    pub(crate) async fn set_threshold_mc(&self, mc: i32) {
        self.settings.lock().await.threshold_mc = mc;
    }

    pub(crate) async fn set_mode(&self, mode: Mode) {
        self.settings.lock().await.mode = mode;
    }

    pub(crate) async fn set_debug(&self, debug: bool) {
        self.settings.lock().await.debug = debug;
    }
}

/// Owning handle to a running device instance.
pub struct Device {
    shared: Arc<Shared>,
    producer: Option<tokio::task::JoinHandle<()>>,
}

impl Device {
    /// Bring up a device: initialize state, apply binding overrides, and
    /// schedule the producer's first tick. Must run inside a tokio runtime.
    pub fn probe(binding: &BindingConfig) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(ms) = binding.sampling_ms {
            ensure!(ms > 0, "binding sampling-ms must be positive");
            settings.sampling_ms = ms;
        }
        if let Some(mc) = binding.threshold_mc {
            settings.threshold_mc = mc;
        }

        info!(
            sampling_ms = settings.sampling_ms,
            threshold_mc = settings.threshold_mc,
            "simtemp device ready",
        );

        let shared = Arc::new(Shared::new(settings));
        let producer = tokio::spawn(producer::run(Arc::clone(&shared)));

        Ok(Self {
            shared,
            producer: Some(producer),
        })
    }

    /// Open a reader stream. Fails once tear-down has begun.
    pub fn open(&self) -> Result<Reader, DeviceError> {
        Reader::open(&self.shared)
    }

    /// Cloneable opener usable by endpoint servers. The handle itself does
    /// not pin the instance; each opened reader does.
    pub fn handle(&self) -> DeviceHandle {
        DeviceHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Control attribute surface bound to this instance.
    pub fn attributes(&self) -> AttrSet {
        AttrSet::new(Arc::downgrade(&self.shared))
    }

    /// Lock-free counter snapshot.
    pub fn stats(&self) -> CounterSnapshot {
        self.shared.counters.snapshot()
    }

    /// Records currently queued.
    pub fn queued(&self) -> usize {
        self.shared.fifo.lock().queue.len()
    }

    /// Copy of the current settings.
    pub async fn settings(&self) -> Settings {
        self.shared.settings.lock().await.clone()
    }

    /// Set the producer period in milliseconds. Zero is rejected and leaves
    /// all state unchanged.
    pub async fn set_sampling_ms(&self, ms: u32) -> Result<(), DeviceError> {
        self.shared.set_sampling_ms(ms).await
    }

    /// Set the alert threshold in milli-degrees Celsius.
    pub async fn set_threshold_mc(&self, mc: i32) {
        self.shared.set_threshold_mc(mc).await;
    }

    /// Set the sample generation mode.
    pub async fn set_mode(&self, mode: Mode) {
        self.shared.set_mode(mode).await;
    }

    /// Toggle verbose per-sample logging.
    pub async fn set_debug(&self, debug: bool) {
        self.shared.set_debug(debug).await;
    }

    /// Tear the device down: stop the producer, wait for any in-flight
    /// tick, and wake every blocked reader.
    pub async fn remove(mut self) {
        let verbose = self.shared.settings.lock().await.debug;

        self.shared.cancel.cancel();

        if let Some(task) = self.producer.take() {
            if let Err(e) = task.await {
                error!(error = %e, "producer task failed during tear-down");
            }
        }
        if verbose {
            debug!("tear-down: producer stopped");
        }

        // Anyone who raced past the cancelled check re-evaluates now.
        self.shared.data_ready.notify_waiters();

        info!("simtemp device removed");
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // Dropping without remove() still stops the producer; it just does
        // not wait for the final tick.
        self.shared.cancel.cancel();
    }
}

/// Cloneable opener that outlives the device without pinning it.
#[derive(Clone)]
pub struct DeviceHandle {
    shared: Weak<Shared>,
}

impl DeviceHandle {
    /// Open a reader stream, pinning the instance for the reader's
    /// lifetime.
    pub fn open(&self) -> Result<Reader, DeviceError> {
        let shared = self.shared.upgrade().ok_or(DeviceError::NoDevice)?;
        Reader::open(&shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_applies_binding_overrides() {
        let binding = BindingConfig {
            sampling_ms: Some(250),
            threshold_mc: Some(-10),
        };
        let device = Device::probe(&binding).expect("probe");

        let settings = device.settings().await;
        assert_eq!(settings.sampling_ms, 250);
        assert_eq!(settings.threshold_mc, -10);

        device.remove().await;
    }

    #[tokio::test]
    async fn test_probe_rejects_zero_binding_period() {
        let binding = BindingConfig {
            sampling_ms: Some(0),
            threshold_mc: None,
        };
        assert!(Device::probe(&binding).is_err());
    }

    #[tokio::test]
    async fn test_set_sampling_ms_zero_leaves_state_unchanged() {
        let device = Device::probe(&BindingConfig::default()).expect("probe");

        assert_eq!(
            device.set_sampling_ms(0).await,
            Err(DeviceError::InvalidArgument)
        );
        assert_eq!(device.settings().await.sampling_ms, 1000);

        device.remove().await;
    }

    #[tokio::test]
    async fn test_open_fails_after_remove() {
        let device = Device::probe(&BindingConfig::default()).expect("probe");
        let handle = device.handle();

        assert!(handle.open().is_ok());
        device.remove().await;

        assert_eq!(handle.open().unwrap_err(), DeviceError::NoDevice);
    }

    #[tokio::test]
    async fn test_counters_start_at_zero() {
        let device = Device::probe(&BindingConfig::default()).expect("probe");
        let snap = device.stats();
        assert_eq!(
            snap,
            CounterSnapshot {
                updates: 0,
                alerts: 0,
                drops: 0,
            }
        );
        device.remove().await;
    }
}
