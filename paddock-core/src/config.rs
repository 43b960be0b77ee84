//! # Configuration Module
//!
//! Two layers of configuration:
//! - [`Config`], the persisted `config.json` holding the device scaling
//!   ratios. Created on first run, never rewritten afterwards by the core.
//! - [`RuntimeOptions`], process settings (data directory, polling
//!   cadences) with defaults that can be overridden from the environment.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::persist;

/// File name of the persisted config inside the data directory.
pub const CONFIG_FILE: &str = "config.json";
/// File name of the persisted profile document inside the data directory.
pub const PROFILES_FILE: &str = "profiles.json";

/// Recommended Connection Monitor cadence.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(500);
/// Recommended Encoder Tracker cadence. Much finer than the monitor so the
/// wheel-angle display feels continuous.
pub const DEFAULT_ENCODER_INTERVAL: Duration = Duration::from_millis(50);

/// Device scaling ratios. Both are always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Raw encoder units per displayed degree.
    pub encoder_ratio: f64,
    /// Factor applied to `degrees` before it is transmitted.
    pub angle_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            encoder_ratio: 1.0,
            angle_ratio: 1.0,
        }
    }
}

/// Loose on-disk shape; anything that is not a positive number is coerced.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    encoder_ratio: Value,
    #[serde(default)]
    angle_ratio: Value,
}

/// Returns `value` as a strictly positive finite ratio, or `1.0`.
fn coerce_ratio(field: &str, value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(ratio) if ratio.is_finite() && ratio > 0.0 => ratio,
        _ => {
            warn!("[CONFIG] {} is invalid ({}), using 1.0", field, value);
            1.0
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            encoder_ratio: coerce_ratio("encoderRatio", &raw.encoder_ratio),
            angle_ratio: coerce_ratio("angleRatio", &raw.angle_ratio),
        }
    }
}

impl Config {
    /// Builds a config, coercing non-positive ratios the same way a load does.
    pub fn new(encoder_ratio: f64, angle_ratio: f64) -> Self {
        RawConfig {
            encoder_ratio: serde_json::json!(encoder_ratio),
            angle_ratio: serde_json::json!(angle_ratio),
        }
        .into()
    }

    /// Loads the config at `path`, creating it with defaults on first run.
    ///
    /// A file that cannot be read or parsed yields the default config and is
    /// left as it is on disk.
    pub fn load_or_create(path: &Path) -> Self {
        if !path.exists() {
            let config = Config::default();
            match persist::write_json(&config, path) {
                Ok(()) => info!("[CONFIG] Created {}", path.display()),
                Err(e) => warn!("[CONFIG] Could not create {}: {:#}", path.display(), e),
            }
            return config;
        }

        match persist::read_json::<RawConfig>(path) {
            Ok(raw) => {
                let config = Config::from(raw);
                info!(
                    "[CONFIG] Loaded {} (encoderRatio={}, angleRatio={})",
                    path.display(),
                    config.encoder_ratio,
                    config.angle_ratio
                );
                config
            }
            Err(e) => {
                warn!("[CONFIG] Falling back to defaults: {:#}", e);
                Config::default()
            }
        }
    }
}

/// Process settings for the [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeOptions {
    /// Directory holding `profiles.json` and `config.json`.
    pub data_dir: PathBuf,
    pub monitor_interval: Duration,
    pub encoder_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            encoder_interval: DEFAULT_ENCODER_INTERVAL,
        }
    }
}

impl RuntimeOptions {
    /// Defaults overridden by `PADDOCK_DATA_DIR`,
    /// `PADDOCK_MONITOR_INTERVAL_MS` and `PADDOCK_ENCODER_INTERVAL_MS`.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(dir) = std::env::var("PADDOCK_DATA_DIR") {
            options.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = env_millis("PADDOCK_MONITOR_INTERVAL_MS") {
            options.monitor_interval = ms;
        }
        if let Some(ms) = env_millis("PADDOCK_ENCODER_INTERVAL_MS") {
            options.encoder_interval = ms;
        }
        options
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.data_dir.join(PROFILES_FILE)
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            warn!("[CONFIG] Ignoring {}={:?}", name, raw);
            None
        }
    }
}
