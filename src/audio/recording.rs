//! A synthesis capability that records triggers instead of sounding them.
//!
//! The clock only moves when told to, which makes transport behavior
//! reproducible. Used by the test suites and by `--dry-run` style tooling.

use super::synthesis::{Synthesis, Timbre, TriggerId};
use crate::error::EngineError;
use crate::score::DrumKind;

/// What a recorded trigger would have played.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerSound {
    Tone {
        frequency_hz: f64,
        duration_seconds: f64,
        timbre: Timbre,
        gain: f32,
    },
    Percussion(DrumKind),
}

/// One submitted trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrigger {
    pub id: TriggerId,
    pub at_device_time: f64,
    pub sound: TriggerSound,
}

impl RecordedTrigger {
    pub fn frequency(&self) -> Option<f64> {
        match self.sound {
            TriggerSound::Tone { frequency_hz, .. } => Some(frequency_hz),
            TriggerSound::Percussion(_) => None,
        }
    }

    pub fn drum(&self) -> Option<DrumKind> {
        match self.sound {
            TriggerSound::Percussion(kind) => Some(kind),
            TriggerSound::Tone { .. } => None,
        }
    }
}

/// Records triggers against a manually driven clock.
#[derive(Debug, Default)]
pub struct RecordingSynth {
    clock: f64,
    triggers: Vec<RecordedTrigger>,
    cancelled: Vec<TriggerId>,
    unavailable: bool,
    resume_count: usize,
    release_count: usize,
    next_id: u64,
}

impl RecordingSynth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder whose clock reads `seconds`.
    pub fn at_clock(seconds: f64) -> Self {
        Self {
            clock: seconds,
            ..Self::default()
        }
    }

    /// Simulates a machine with no audio output.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Moves the clock to an absolute time. The clock never goes backwards.
    pub fn set_clock(&mut self, seconds: f64) {
        self.clock = self.clock.max(seconds);
    }

    pub fn advance(&mut self, seconds: f64) {
        self.clock += seconds.max(0.0);
    }

    pub fn set_available(&mut self, available: bool) {
        self.unavailable = !available;
    }

    /// Every trigger submitted so far, in submission order.
    pub fn triggers(&self) -> &[RecordedTrigger] {
        &self.triggers
    }

    /// Triggers that were not cancelled.
    pub fn live_triggers(&self) -> impl Iterator<Item = &RecordedTrigger> {
        self.triggers
            .iter()
            .filter(move |t| !self.cancelled.contains(&t.id))
    }

    pub fn cancelled(&self) -> &[TriggerId] {
        &self.cancelled
    }

    /// Number of `resume_device_if_suspended` calls that succeeded.
    pub fn resume_count(&self) -> usize {
        self.resume_count
    }

    /// Number of `release_output` calls.
    pub fn release_count(&self) -> usize {
        self.release_count
    }

    /// Forgets recorded triggers and cancellations. The clock is kept.
    pub fn clear(&mut self) {
        self.triggers.clear();
        self.cancelled.clear();
    }

    fn record(&mut self, at_device_time: f64, sound: TriggerSound) -> TriggerId {
        self.next_id += 1;
        let id = TriggerId::new(self.next_id);
        self.triggers.push(RecordedTrigger {
            id,
            at_device_time,
            sound,
        });
        id
    }
}

impl Synthesis for RecordingSynth {
    fn trigger_tone(
        &mut self,
        frequency_hz: f64,
        at_device_time: f64,
        duration_seconds: f64,
        timbre: Timbre,
        gain: f32,
    ) -> TriggerId {
        self.record(
            at_device_time,
            TriggerSound::Tone {
                frequency_hz,
                duration_seconds,
                timbre,
                gain,
            },
        )
    }

    fn trigger_percussion(&mut self, kind: DrumKind, at_device_time: f64) -> TriggerId {
        self.record(at_device_time, TriggerSound::Percussion(kind))
    }

    fn device_clock_now(&self) -> f64 {
        self.clock
    }

    fn resume_device_if_suspended(&mut self) -> Result<(), EngineError> {
        if self.unavailable {
            return Err(EngineError::DeviceUnavailable(
                "no audio output".to_string(),
            ));
        }
        self.resume_count += 1;
        Ok(())
    }

    fn cancel(&mut self, id: TriggerId) -> bool {
        let pending = self
            .triggers
            .iter()
            .any(|t| t.id == id && t.at_device_time > self.clock);
        if pending && !self.cancelled.contains(&id) {
            self.cancelled.push(id);
            true
        } else {
            false
        }
    }

    fn release_output(&mut self) {
        self.release_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_cancels() {
        let mut synth = RecordingSynth::at_clock(5.0);
        let past = synth.trigger_percussion(DrumKind::Kick, 4.0);
        let future = synth.trigger_tone(440.0, 6.0, 0.5, Timbre::Sine, 0.2);

        assert!(!synth.cancel(past));
        assert!(synth.cancel(future));
        assert!(!synth.cancel(future));
        assert_eq!(synth.live_triggers().count(), 1);
        assert_eq!(synth.triggers()[1].frequency(), Some(440.0));
        assert_eq!(synth.triggers()[0].drum(), Some(DrumKind::Kick));
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut synth = RecordingSynth::at_clock(3.0);
        synth.set_clock(1.0);
        assert_eq!(synth.device_clock_now(), 3.0);
        synth.advance(0.5);
        assert_eq!(synth.device_clock_now(), 3.5);
    }

    #[test]
    fn test_unavailable_device() {
        let mut synth = RecordingSynth::unavailable();
        assert!(matches!(
            synth.resume_device_if_suspended(),
            Err(EngineError::DeviceUnavailable(_))
        ));
        synth.set_available(true);
        assert!(synth.resume_device_if_suspended().is_ok());
        assert_eq!(synth.resume_count(), 1);
    }
}
