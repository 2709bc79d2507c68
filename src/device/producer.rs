//! Periodic sample producer.
//!
//! One cooperative task per device instance. Each tick snapshots the
//! configuration, synthesizes one sample, commits it to the queue (evicting
//! the oldest on overflow), updates the alert latch and counters, wakes
//! waiting readers, and sleeps until the next tick. A period change
//! interrupts the delay so the new cadence takes effect within one pending
//! tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::Mode;
use crate::record::{Sample, FLAG_NEW_SAMPLE, FLAG_THRESHOLD};

use super::Shared;

/// Producer task body. Exits when the device's cancellation token fires;
/// the sample sequence counter is private to this task.
pub(crate) async fn run(shared: Arc<Shared>) {
    let cancel = shared.cancel.clone();
    let mut seq: i32 = 0;

    loop {
        let period = {
            let settings = shared.settings.lock().await;
            Duration::from_millis(u64::from(settings.sampling_ms))
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = shared.reschedule.notified() => continue,
            _ = tokio::time::sleep(period) => tick(&shared, &mut seq).await,
        }
    }

    debug!("producer stopped");
}

/// One producer tick: synthesize and commit at most one record.
async fn tick(shared: &Shared, seq: &mut i32) {
    if shared.stopping() {
        return;
    }

    let now_ns = shared.clock.now_ns();

    let (mode, threshold_mc, verbose) = {
        let settings = shared.settings.lock().await;
        (settings.mode, settings.threshold_mc, settings.debug)
    };

    let temp_mc = synthesize(mode, *seq);
    *seq = seq.wrapping_add(1);

    let mut flags = FLAG_NEW_SAMPLE;
    if temp_mc >= threshold_mc {
        flags |= FLAG_THRESHOLD;
    }

    let sample = Sample {
        timestamp_ns: now_ns,
        temp_mc,
        flags,
    };

    {
        let mut fifo = shared.fifo.lock();

        if fifo.queue.is_full() {
            if fifo.queue.pop_one().is_some() {
                // Evicted the oldest record.
                shared.counters.count_drop();
            } else {
                // Cannot make room; the incoming record is the drop.
                // Readers are not woken.
                shared.counters.count_drop();
                return;
            }
        }

        if !fifo.queue.try_push(sample) {
            shared.counters.count_drop();
            return;
        }

        if flags & FLAG_THRESHOLD != 0 && fifo.alert.arm_if_clear() {
            shared.counters.count_alert();
        }
        shared.counters.count_update();
    }

    if verbose {
        debug!(
            temp_mc,
            flags = format_args!("{flags:#x}"),
            timestamp_ns = now_ns,
            "sample committed",
        );
    }

    shared.data_ready.notify_waiters();
}

/// Synthesize one temperature in milli-degrees Celsius for the given mode.
///
/// The sequence counter wraps; remainders use truncated division, so
/// post-wrap values may briefly dip below each mode's nominal floor.
pub fn synthesize(mode: Mode, seq: i32) -> i32 {
    match mode {
        Mode::Normal => 30_000 + (seq % 20_000),
        Mode::Ramp => 25_000 + (seq.wrapping_mul(200) % 40_000),
        Mode::Noisy => 30_000 + (seq.wrapping_mul(37) % 4_001) - 2_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn test_normal_mode_sequence() {
        assert_eq!(synthesize(Mode::Normal, 0), 30_000);
        assert_eq!(synthesize(Mode::Normal, 1), 30_001);
        assert_eq!(synthesize(Mode::Normal, 19_999), 49_999);
        assert_eq!(synthesize(Mode::Normal, 20_000), 30_000);
    }

    #[test]
    fn test_ramp_mode_sequence() {
        assert_eq!(synthesize(Mode::Ramp, 0), 25_000);
        assert_eq!(synthesize(Mode::Ramp, 1), 25_200);
        assert_eq!(synthesize(Mode::Ramp, 2), 25_400);
        // The ramp cycles every 200 ticks.
        assert_eq!(synthesize(Mode::Ramp, 200), 25_000);
    }

    #[test]
    fn test_noisy_mode_stays_in_band() {
        for seq in 0..10_000 {
            let t = synthesize(Mode::Noisy, seq);
            assert!(t >= 28_000, "seq={seq} t={t}");
            assert!(t <= 32_001, "seq={seq} t={t}");
        }
        assert_eq!(synthesize(Mode::Noisy, 0), 28_000);
        assert_eq!(synthesize(Mode::Noisy, 1), 28_037);
    }

    #[tokio::test]
    async fn test_tick_commits_and_counts() {
        let shared = Arc::new(Shared::new(Settings::default()));
        let mut seq = 0;

        tick(&shared, &mut seq).await;
        tick(&shared, &mut seq).await;

        let snap = shared.counters.snapshot();
        assert_eq!(snap.updates, 2);
        assert_eq!(snap.drops, 0);
        assert_eq!(shared.fifo.lock().queue.len(), 2);
        assert_eq!(seq, 2);
    }

    #[tokio::test]
    async fn test_tick_evicts_and_counts_drops_when_full() {
        let shared = Arc::new(Shared::new(Settings::default()));
        let mut seq = 0;

        let capacity = shared.fifo.lock().queue.capacity();
        for _ in 0..capacity + 10 {
            tick(&shared, &mut seq).await;
        }

        let snap = shared.counters.snapshot();
        assert_eq!(snap.updates, (capacity + 10) as u64);
        assert_eq!(snap.drops, 10);
        assert_eq!(shared.fifo.lock().queue.len(), capacity);
    }

    #[tokio::test]
    async fn test_tick_arms_latch_once_per_burst() {
        let shared = Arc::new(Shared::new(Settings {
            threshold_mc: 0,
            ..Settings::default()
        }));
        let mut seq = 0;

        tick(&shared, &mut seq).await;
        tick(&shared, &mut seq).await;
        tick(&shared, &mut seq).await;

        let snap = shared.counters.snapshot();
        assert_eq!(snap.alerts, 1);
        assert!(shared.fifo.lock().alert.is_armed());
    }

    #[tokio::test]
    async fn test_tick_after_cancel_is_a_noop() {
        let shared = Arc::new(Shared::new(Settings::default()));
        shared.cancel.cancel();

        let mut seq = 0;
        tick(&shared, &mut seq).await;

        assert_eq!(shared.counters.snapshot().updates, 0);
        assert!(shared.fifo.lock().queue.is_empty());
        assert_eq!(seq, 0);
    }
}
