//! Control attribute surface.
//!
//! Named textual attributes in the manner of a sysfs directory: shows are
//! newline-terminated, stores accept surrounding whitespace and an optional
//! trailing newline. Writable attributes reconfigure the producer live; the
//! read-only `stats` attribute renders the counters.

use std::sync::{Arc, Weak};

use crate::config::Mode;
use crate::device::Shared;
use crate::error::DeviceError;

/// Named control attributes exposed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    SamplingMs,
    ThresholdMc,
    Mode,
    Debug,
    Stats,
}

impl Attr {
    /// Every attribute, in registration order.
    pub const ALL: [Attr; 5] = [
        Attr::SamplingMs,
        Attr::ThresholdMc,
        Attr::Mode,
        Attr::Debug,
        Attr::Stats,
    ];

    /// Canonical attribute name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SamplingMs => "sampling_ms",
            Self::ThresholdMc => "threshold_mC",
            Self::Mode => "mode",
            Self::Debug => "debug",
            Self::Stats => "stats",
        }
    }

    /// Look up an attribute by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sampling_ms" => Some(Self::SamplingMs),
            "threshold_mC" => Some(Self::ThresholdMc),
            "mode" => Some(Self::Mode),
            "debug" => Some(Self::Debug),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }

    /// Whether the attribute accepts stores.
    pub const fn writable(self) -> bool {
        !matches!(self, Self::Stats)
    }
}

/// Attribute registry bound to one device instance.
///
/// Operations fail with `NoDevice` once the instance has been torn down.
#[derive(Clone)]
pub struct AttrSet {
    dev: Weak<Shared>,
}

impl AttrSet {
    pub(crate) fn new(dev: Weak<Shared>) -> Self {
        Self { dev }
    }

    fn device(&self) -> Result<Arc<Shared>, DeviceError> {
        let shared = self.dev.upgrade().ok_or(DeviceError::NoDevice)?;
        if shared.stopping() {
            return Err(DeviceError::NoDevice);
        }
        Ok(shared)
    }

    /// Render an attribute's current value, newline-terminated.
    pub async fn show(&self, attr: Attr) -> Result<String, DeviceError> {
        let dev = self.device()?;

        let out = match attr {
            Attr::SamplingMs => format!("{}\n", dev.settings.lock().await.sampling_ms),
            Attr::ThresholdMc => format!("{}\n", dev.settings.lock().await.threshold_mc),
            Attr::Mode => format!("{}\n", dev.settings.lock().await.mode),
            Attr::Debug => format!("{}\n", u8::from(dev.settings.lock().await.debug)),
            Attr::Stats => {
                let snap = dev.counters.snapshot();
                format!(
                    "updates={} alerts={} drops={}\n",
                    snap.updates, snap.alerts, snap.drops,
                )
            }
        };

        Ok(out)
    }

    /// Parse and apply a store to a writable attribute.
    pub async fn store(&self, attr: Attr, input: &str) -> Result<(), DeviceError> {
        let dev = self.device()?;
        let input = input.trim();

        match attr {
            Attr::SamplingMs => {
                let ms: u32 = input.parse().map_err(|_| DeviceError::InvalidArgument)?;
                dev.set_sampling_ms(ms).await
            }
            Attr::ThresholdMc => {
                let mc: i32 = input.parse().map_err(|_| DeviceError::InvalidArgument)?;
                dev.set_threshold_mc(mc).await;
                Ok(())
            }
            Attr::Mode => {
                let mode = Mode::from_name(input).ok_or(DeviceError::InvalidArgument)?;
                dev.set_mode(mode).await;
                Ok(())
            }
            Attr::Debug => {
                // Any integer is accepted; nonzero means on.
                let v: i64 = input.parse().map_err(|_| DeviceError::InvalidArgument)?;
                dev.set_debug(v != 0).await;
                Ok(())
            }
            Attr::Stats => Err(DeviceError::InvalidArgument),
        }
    }
}
