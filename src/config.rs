use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Sample generation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Normal,
    Ramp,
    Noisy,
}

impl Mode {
    /// Canonical lowercase mode name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Ramp => "ramp",
            Self::Noisy => "noisy",
        }
    }

    /// Parse a mode name. Matching is case-insensitive; shows always use
    /// the canonical lowercase form.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "ramp" => Some(Self::Ramp),
            "noisy" => Some(Self::Noisy),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::Normal
    }
}

/// Mutable device settings guarded by the configuration store lock.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Producer period in milliseconds. Always positive.
    pub sampling_ms: u32,
    /// Alert threshold in milli-degrees Celsius.
    pub threshold_mc: i32,
    /// Sample generation mode.
    pub mode: Mode,
    /// Verbose per-sample logging.
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sampling_ms: 1000,
            threshold_mc: 45_000,
            mode: Mode::Normal,
            debug: false,
        }
    }
}

/// Top-level configuration for the simtemp daemon.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Logging verbosity (trace, debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory holding the stream and control sockets. Default: "/tmp/simtemp".
    #[serde(default = "default_runtime_dir")]
    pub runtime_dir: PathBuf,

    /// Optional bring-up overrides applied when the device is probed.
    #[serde(default)]
    pub binding: BindingConfig,
}

/// Optional bring-up properties, the binding analog of the original device.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BindingConfig {
    /// Initial producer period in milliseconds.
    #[serde(default, rename = "sampling-ms")]
    pub sampling_ms: Option<u32>,

    /// Initial alert threshold in milli-degrees Celsius.
    #[serde(default, rename = "threshold-mC")]
    pub threshold_mc: Option<i32>,
}

// --- Default value functions ---

fn default_log_level() -> String {
    "info".to_string()
}

fn default_runtime_dir() -> PathBuf {
    PathBuf::from("/tmp/simtemp")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            runtime_dir: default_runtime_dir(),
            binding: BindingConfig::default(),
        }
    }
}

// --- Validation and loading ---

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.binding.sampling_ms == Some(0) {
            bail!("binding.sampling-ms must be positive");
        }

        Ok(())
    }

    /// Path of the record stream socket.
    pub fn stream_socket_path(&self) -> PathBuf {
        self.runtime_dir.join("simtemp")
    }

    /// Path of the control attribute socket.
    pub fn control_socket_path(&self) -> PathBuf {
        self.runtime_dir.join("control")
    }
}
