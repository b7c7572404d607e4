//! Receiver configuration and the persisted default endpoint.
//!
//! [`ReceiverConfig`] tunes the receive loop and the transport. It deserializes
//! from JSON with every field optional:
//!
//! ```rust
//! use liveview::ReceiverConfig;
//! use std::time::Duration;
//!
//! let config: ReceiverConfig = serde_json::from_str(r#"{"idle_delay_ms": 50}"#).unwrap();
//! assert_eq!(config.idle_delay, Duration::from_millis(50));
//! assert_eq!(config.receive_high_water_mark, None);
//! ```
//!
//! [`EndpointDefaults`] is the small JSON file (`{"default_endpoint": ""}`) a UI
//! reads at startup to pre-fill and auto-connect an endpoint. The receiver core
//! never reads it; callers hand it an endpoint string.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::{LiveViewError, Result};

/// Default pause between receive-loop iterations.
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_millis(100);

/// File name of the persisted defaults.
pub const DEFAULTS_FILE_NAME: &str = "live_view_default.json";

/// Tuning for the receive loop and its transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Pause after each drain-and-emit pass. Caps wake frequency when the
    /// producer is silent; draining itself is never rate limited.
    #[serde(rename = "idle_delay_ms", with = "duration_ms")]
    pub idle_delay: Duration,

    /// Transport receive queue bound (ZeroMQ `RCVHWM`); `None` keeps the
    /// transport default.
    pub receive_high_water_mark: Option<i32>,

    /// Name of the receiver thread
    pub thread_name: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            idle_delay: DEFAULT_IDLE_DELAY,
            receive_high_water_mark: None,
            thread_name: "liveview-receiver".to_string(),
        }
    }
}

impl ReceiverConfig {
    pub fn with_idle_delay(mut self, idle_delay: Duration) -> Self {
        self.idle_delay = idle_delay;
        self
    }

    pub fn with_receive_high_water_mark(mut self, hwm: i32) -> Self {
        self.receive_high_water_mark = Some(hwm);
        self
    }

    /// Upper bound on loop iterations per second.
    pub fn poll_hz(&self) -> f64 {
        1.0 / self.idle_delay.as_secs_f64()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Persisted default endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDefaults {
    #[serde(default)]
    pub default_endpoint: String,
}

impl EndpointDefaults {
    /// `$XDG_CONFIG_HOME/liveview/live_view_default.json`, falling back to
    /// `$HOME/.config/liveview/…`. `None` when neither variable is set.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("liveview").join(DEFAULTS_FILE_NAME))
    }

    /// Read the defaults file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read(path).map_err(|source| LiveViewError::defaults_io(path, source))?;
        serde_json::from_slice(&contents)
            .map_err(|source| LiveViewError::DefaultsFormat { path: path.to_path_buf(), source })
    }

    /// Read the defaults file, creating it with an empty endpoint if missing.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let defaults = Self::default();
        defaults.save(path)?;
        info!(path = %path.display(), "Created defaults file");
        Ok(defaults)
    }

    /// Write the defaults file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| LiveViewError::defaults_io(parent, source))?;
        }

        let json = serde_json::to_vec_pretty(self)
            .map_err(|source| LiveViewError::DefaultsFormat { path: path.to_path_buf(), source })?;
        std::fs::write(path, json).map_err(|source| LiveViewError::defaults_io(path, source))?;
        debug!(path = %path.display(), "Saved defaults file");
        Ok(())
    }

    /// The stored endpoint, or `None` when it is blank.
    pub fn default_endpoint(&self) -> Option<&str> {
        let endpoint = self.default_endpoint.trim();
        (!endpoint.is_empty()).then_some(endpoint)
    }

    pub fn set_default_endpoint(&mut self, endpoint: Option<&str>) {
        self.default_endpoint = endpoint.unwrap_or_default().trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("liveview-config-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn receiver_config_defaults() {
        let config = ReceiverConfig::default();
        assert_eq!(config.idle_delay, Duration::from_millis(100));
        assert_eq!(config.receive_high_water_mark, None);
        assert!((config.poll_hz() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn receiver_config_json_round_trip() {
        let config = ReceiverConfig::default()
            .with_idle_delay(Duration::from_millis(25))
            .with_receive_high_water_mark(4);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["idle_delay_ms"], 25);
        assert_eq!(json["receive_high_water_mark"], 4);

        let back: ReceiverConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn load_or_create_writes_empty_defaults() {
        let dir = scratch_dir("create");
        let path = dir.join("nested").join(DEFAULTS_FILE_NAME);

        let defaults = EndpointDefaults::load_or_create(&path).unwrap();
        assert_eq!(defaults.default_endpoint(), None);
        assert!(path.exists());

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["default_endpoint"], "");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_load_preserves_endpoint() {
        let dir = scratch_dir("save");
        let path = dir.join(DEFAULTS_FILE_NAME);

        let mut defaults = EndpointDefaults::default();
        defaults.set_default_endpoint(Some(" tcp://127.0.0.1:5020 "));
        defaults.save(&path).unwrap();

        let loaded = EndpointDefaults::load_or_create(&path).unwrap();
        assert_eq!(loaded.default_endpoint(), Some("tcp://127.0.0.1:5020"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_a_format_error() {
        let dir = scratch_dir("corrupt");
        let path = dir.join(DEFAULTS_FILE_NAME);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        let err = EndpointDefaults::load(&path).unwrap_err();
        assert!(matches!(err, LiveViewError::DefaultsFormat { .. }));
        assert!(!err.is_retryable());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
