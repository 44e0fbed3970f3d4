//! Persistent settings for reading, writing and playback.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::util::{Error, Result};

/// Environment variable naming a settings file.
pub const CONFIG_ENV: &str = "CHUNKANIM_CONFIG";

/// Container reader options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    /// Memory-map files instead of buffered reads.
    pub use_mmap: bool,
    /// Check every chunk header against the index at open time.
    pub validate_headers: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { use_mmap: true, validate_headers: true }
    }
}

/// Container writer options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WriterConfig {
    /// Write buffer size in bytes.
    pub buffer_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { buffer_capacity: 1024 * 1024 }
    }
}

/// Playback defaults applied to new controllers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Time multiplier for `advance`.
    pub speed: f32,
    /// Samples per second used by tools that step through an animation.
    pub sample_rate: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { speed: 1.0, sample_rate: 30.0 }
    }
}

/// All settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
    pub playback: PlaybackConfig,
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut settings: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        settings.sanitize();
        Ok(settings)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_json(&json)
    }

    /// Load from the file named by `CHUNKANIM_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn sanitize(&mut self) {
        if !self.playback.speed.is_finite() {
            self.playback.speed = 1.0;
        }
        if !(self.playback.sample_rate.is_finite() && self.playback.sample_rate > 0.0) {
            self.playback.sample_rate = PlaybackConfig::default().sample_rate;
        }
        if self.writer.buffer_capacity == 0 {
            self.writer.buffer_capacity = WriterConfig::default().buffer_capacity;
        }
    }
}
