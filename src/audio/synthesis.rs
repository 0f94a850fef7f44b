//! The synthesis capability the engine drives.
//!
//! The engine decides *when* and *what*; a `Synthesis` implementation
//! decides how it sounds. All times are absolute seconds on the device
//! clock.

use crate::error::EngineError;
use crate::score::DrumKind;
use serde::{Deserialize, Serialize};

/// Handle to one submitted trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(u64);

impl TriggerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Oscillator shape of a pitched tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timbre {
    #[default]
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

/// Something that can render scheduled sounds against a device clock.
pub trait Synthesis {
    /// Schedules a pitched tone.
    fn trigger_tone(
        &mut self,
        frequency_hz: f64,
        at_device_time: f64,
        duration_seconds: f64,
        timbre: Timbre,
        gain: f32,
    ) -> TriggerId;

    /// Schedules a fixed-timbre drum hit.
    fn trigger_percussion(&mut self, kind: DrumKind, at_device_time: f64) -> TriggerId;

    /// Current device clock in seconds. Monotonic.
    fn device_clock_now(&self) -> f64;

    /// Makes sure the device is running.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DeviceUnavailable` if there is no audio output.
    fn resume_device_if_suspended(&mut self) -> Result<(), EngineError>;

    /// Revokes a trigger that has not started sounding.
    ///
    /// Returns true if the trigger was removed. Capabilities that cannot
    /// revoke scheduled sounds keep the default.
    fn cancel(&mut self, _id: TriggerId) -> bool {
        false
    }

    /// Silences everything and lets the device go idle at session end.
    fn release_output(&mut self) {}
}
