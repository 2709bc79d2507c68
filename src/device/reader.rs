//! Reader-facing stream surface.
//!
//! Each open reader competes with its peers for records first come, first
//! served; a record is delivered to exactly one reader. Waits tolerate
//! spurious wakeups by re-checking the queue, and return cleanly when
//! cancelled without consuming anything.

use std::sync::Arc;

use crate::error::DeviceError;
use crate::record::{Sample, RECORD_SIZE};

use super::Shared;

/// Readiness bits reported by [`Reader::poll`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// At least one record is queued.
    pub readable: bool,
    /// The alert latch is armed.
    pub priority: bool,
}

impl Readiness {
    /// True when either bit is set.
    pub fn any(self) -> bool {
        self.readable || self.priority
    }
}

/// An open reader stream.
///
/// Holding a `Reader` pins the device instance; dropping it releases the
/// pin. Closing never fails.
pub struct Reader {
    shared: Arc<Shared>,
    nonblocking: bool,
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("nonblocking", &self.nonblocking)
            .finish()
    }
}

impl Reader {
    pub(crate) fn open(shared: &Arc<Shared>) -> Result<Self, DeviceError> {
        if shared.stopping() {
            return Err(DeviceError::Stopping);
        }

        Ok(Self {
            shared: Arc::clone(shared),
            nonblocking: false,
        })
    }

    /// Switch between blocking and non-blocking reads.
    pub fn set_nonblocking(&mut self, nonblocking: bool) {
        self.nonblocking = nonblocking;
    }

    /// Read exactly one record into `buf`.
    ///
    /// `buf` must hold at least one full record; shorter buffers are
    /// rejected before anything is consumed. Returns the record size on
    /// success.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        if buf.len() < RECORD_SIZE {
            return Err(DeviceError::InvalidArgument);
        }

        let sample = self.next_sample().await?;
        buf[..RECORD_SIZE].copy_from_slice(&sample.to_bytes());
        Ok(RECORD_SIZE)
    }

    /// Take the next record, waiting while the queue is empty unless the
    /// handle is non-blocking.
    pub async fn next_sample(&self) -> Result<Sample, DeviceError> {
        loop {
            let wakeup = self.shared.data_ready.notified();
            tokio::pin!(wakeup);
            // Register before checking the queue so a commit between the
            // check and the await is not lost.
            wakeup.as_mut().enable();

            if self.shared.stopping() {
                return Err(DeviceError::Stopping);
            }
            if let Some(sample) = self.shared.consume_one() {
                return Ok(sample);
            }
            if self.nonblocking {
                return Err(DeviceError::WouldBlock);
            }

            tokio::select! {
                _ = wakeup => {}
                _ = self.shared.cancel.cancelled() => return Err(DeviceError::Stopping),
            }
        }
    }

    /// Snapshot of the readiness bits.
    pub fn poll(&self) -> Readiness {
        let (readable, priority) = self.shared.stream_state();
        Readiness { readable, priority }
    }

    /// Wait until any readiness bit is set and return the mask.
    pub async fn wait_ready(&self) -> Result<Readiness, DeviceError> {
        loop {
            let wakeup = self.shared.data_ready.notified();
            tokio::pin!(wakeup);
            wakeup.as_mut().enable();

            if self.shared.stopping() {
                return Err(DeviceError::Stopping);
            }

            let mask = self.poll();
            if mask.any() {
                return Ok(mask);
            }

            tokio::select! {
                _ = wakeup => {}
                _ = self.shared.cancel.cancelled() => return Err(DeviceError::Stopping),
            }
        }
    }
}
