//! Virtual temperature sensor core.
//!
//! A periodic producer synthesizes temperature samples into a bounded
//! 128-record FIFO. Readers consume fixed 16-byte records through a
//! blocking/non-blocking stream with readiness polling; a latched
//! out-of-band alert fires when a sample crosses the configured threshold
//! and clears when a reader consumes the marked record. Textual control
//! attributes reconfigure the producer live.

pub mod alert;
pub mod attrs;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod queue;
pub mod record;
pub mod server;

pub use config::{BindingConfig, Config, Mode, Settings};
pub use device::reader::{Reader, Readiness};
pub use device::{CounterSnapshot, Device, DeviceHandle};
pub use error::DeviceError;
pub use record::{Sample, FLAG_NEW_SAMPLE, FLAG_THRESHOLD, RECORD_SIZE};
