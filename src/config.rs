use crate::recorder::types::RecordingMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Virtual key codes of the default hot keys.
pub const KEY_F1: u32 = 0x70;
pub const KEY_F2: u32 = 0x71;

pub const DEFAULT_THRESHOLD: f64 = 65.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub toggle_key: u32,
    pub screenshot_key: u32,
    pub motion_sample_ms: u64,
    pub mode: RecordingMode,
    /// Embed window names in relative-mode scripts so playback can raise them.
    pub auto_raise: bool,
    pub output_root: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            toggle_key: KEY_F1,
            screenshot_key: KEY_F2,
            motion_sample_ms: 250,
            mode: RecordingMode::Relative,
            auto_raise: false,
            output_root: PathBuf::from("."),
        }
    }
}

impl RecorderConfig {
    pub fn motion_sample_interval(&self) -> Duration {
        Duration::from_millis(self.motion_sample_ms)
    }

    pub fn is_hot_key(&self, code: u32) -> bool {
        code == self.toggle_key || code == self.screenshot_key
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Directory holding the reference screenshots named in the script.
    pub image_dir: PathBuf,
    pub threshold: f64,
    pub retry_attempts: u32,
    pub retry_interval_ms: u64,
    /// Poll interval of `WaitForWindow`.
    pub window_poll_ms: u64,
    /// `None` waits forever.
    pub wait_for_window_timeout_ms: Option<u64>,
    /// Poll interval and deadline when resolving the window for
    /// window-relative positions.
    pub window_lookup_poll_ms: u64,
    pub window_timeout_ms: u64,
    /// Multiplier applied to recorded delays; 0 replays as fast as possible.
    pub delay_scale: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("."),
            threshold: DEFAULT_THRESHOLD,
            retry_attempts: 10,
            retry_interval_ms: 100,
            window_poll_ms: 100,
            wait_for_window_timeout_ms: None,
            window_lookup_poll_ms: 50,
            window_timeout_ms: 2_000,
            delay_scale: 1.0,
        }
    }
}

impl ReplayConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn window_poll(&self) -> Duration {
        Duration::from_millis(self.window_poll_ms)
    }

    pub fn wait_for_window_timeout(&self) -> Option<Duration> {
        self.wait_for_window_timeout_ms.map(Duration::from_millis)
    }

    pub fn window_lookup_poll(&self) -> Duration {
        Duration::from_millis(self.window_lookup_poll_ms)
    }

    pub fn window_timeout(&self) -> Duration {
        Duration::from_millis(self.window_timeout_ms)
    }

    pub fn scaled_delay(&self, ms: u64) -> Duration {
        let scale = if self.delay_scale.is_finite() {
            self.delay_scale.max(0.0)
        } else {
            1.0
        };
        Duration::from_micros((ms as f64 * scale * 1_000.0).round() as u64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recorder: RecorderConfig,
    pub replay: ReplayConfig,
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("replaycast").join("config.json"))
}

/// Load a config file; a missing or unreadable file yields defaults.
pub fn load_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            log::warn!("ignoring invalid config {}: {err}", path.display());
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn save(path: &Path, config: &Config) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let json = serde_json::to_string_pretty(config).map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| e.to_string())
}
