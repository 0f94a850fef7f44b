//! Engine tunables.
//!
//! All values have defaults matching the editor's behavior; a JSON file can
//! override any subset of them.

use crate::audio::Timbre;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Playback and scheduling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Events this far before the start offset are still scheduled, so a
    /// note sitting exactly on the resume point is not lost to rounding.
    pub boundary_tolerance_seconds: f64,

    /// Offset between successive tones of one chord.
    /// Placeholder mixing strategy; set to 0 for a plain block chord.
    pub chord_stagger_seconds: f64,

    /// How long each chord tone rings.
    pub chord_tone_seconds: f64,

    pub chord_gain: f32,
    pub chord_timbre: Timbre,

    pub melody_gain: f32,
    pub melody_timbre: Timbre,

    /// Revoke triggers that have not sounded yet on pause/stop/teardown.
    pub cancel_pending_on_halt: bool,

    /// Period of the host's display frame driving the position loop.
    pub frame_interval_ms: u64,

    /// Silence appended after the last beat when bouncing to WAV.
    pub export_tail_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            boundary_tolerance_seconds: 0.01,
            chord_stagger_seconds: 0.05,
            chord_tone_seconds: 0.4,
            chord_gain: 0.12,
            chord_timbre: Timbre::Sine,
            melody_gain: 0.2,
            melody_timbre: Timbre::Sine,
            cancel_pending_on_halt: true,
            frame_interval_ms: 16,
            export_tail_seconds: 1.0,
        }
    }
}

impl EngineConfig {
    /// Parses a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(EngineError::Config)
    }

    /// Loads a config file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Host frame period as a `Duration`.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}
