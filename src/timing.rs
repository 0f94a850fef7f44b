//! Conversion between musical positions and logical seconds.
//!
//! Logical time starts at 0 at the top of the score. Every beat lasts
//! `60 / bpm` seconds regardless of the declared beat unit, so note
//! lengths given in quarter-note beats convert with the same factor.

/// Length of one beat in seconds.
pub fn seconds_per_beat(bpm: u32) -> f64 {
    60.0 / bpm as f64
}

/// Tempo and meter needed to place events in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    pub bpm: u32,
    pub beats_per_bar: u32,
    pub bars: u32,
}

impl Timeline {
    pub fn new(bpm: u32, beats_per_bar: u32, bars: u32) -> Self {
        Self {
            bpm,
            beats_per_bar,
            bars,
        }
    }

    pub fn seconds_per_beat(&self) -> f64 {
        seconds_per_beat(self.bpm)
    }

    /// Number of beats in the whole score.
    pub fn total_beats(&self) -> u32 {
        self.bars.saturating_mul(self.beats_per_bar)
    }

    /// Length of the whole score in seconds.
    ///
    /// A timeline with no tempo has no usable length and reports 0.
    pub fn total_duration_seconds(&self) -> f64 {
        let total = self.total_beats() as f64 * self.seconds_per_beat();
        if total.is_finite() {
            total
        } else {
            0.0
        }
    }

    /// Logical time of a beat within a bar.
    pub fn bar_beat_to_seconds(&self, bar_index: u32, beat_in_bar: u32) -> f64 {
        let global_beat = bar_index as u64 * self.beats_per_bar as u64 + beat_in_bar as u64;
        global_beat as f64 * self.seconds_per_beat()
    }

    /// Logical time of a global beat index.
    pub fn beat_to_seconds(&self, beat: u32) -> f64 {
        beat as f64 * self.seconds_per_beat()
    }

    /// Converts a length in quarter-note beats to seconds.
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * self.seconds_per_beat()
    }

    /// Fractional global beat at a logical time.
    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds / self.seconds_per_beat()
    }

    /// The (bar, beat within bar) a logical time falls in.
    ///
    /// Negative times map to (0, 0).
    pub fn seconds_to_bar_beat(&self, seconds: f64) -> (u32, u32) {
        let beat = self.seconds_to_beats(seconds.max(0.0)).floor() as u32;
        let per_bar = self.beats_per_bar.max(1);
        (beat / per_bar, beat % per_bar)
    }

    /// Global beat being played at a logical time, for highlighting.
    ///
    /// Returns `None` before the start or at/after the end of the score.
    pub fn active_beat(&self, seconds: f64) -> Option<u32> {
        if !(0.0..self.total_duration_seconds()).contains(&seconds) {
            return None;
        }
        let beat = self.seconds_to_beats(seconds).floor() as u32;
        Some(beat.min(self.total_beats().saturating_sub(1)))
    }
}
