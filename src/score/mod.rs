//! Score data model.
//!
//! A score is plain data: tempo, time signature, bar count, and three
//! event tracks (rhythm, chords, melody). The playback engine only reads
//! it; the editing helpers here mirror what the editor grids do.

mod pitch;
mod validate;

pub use pitch::{
    chord_tones, name_to_frequency, name_to_note, note_frequency, note_to_name, A4_FREQUENCY,
    CHORD_OPTIONS, MELODY_NOTE_OPTIONS, NOTE_NAMES,
};

use crate::error::ScoreError;
use crate::timing::Timeline;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

/// Valid tempo range in beats per minute.
pub const BPM_RANGE: RangeInclusive<u32> = 40..=240;

/// Valid number of bars in a score.
pub const BARS_RANGE: RangeInclusive<u32> = 1..=32;

/// Default tempo in beats per minute.
pub const DEFAULT_BPM: u32 = 120;

/// Default number of bars.
pub const DEFAULT_BARS: u32 = 8;

/// Duration given to notes placed from the melody grid, in beats.
pub const DEFAULT_MELODY_DURATION: f64 = 0.5;

/// Time signature as (beats per bar, beat unit).
///
/// Serialized as a two-element array, e.g. `[4, 4]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct TimeSignature {
    pub beats_per_bar: u32,
    pub beat_unit: u32,
}

impl TimeSignature {
    pub fn new(beats_per_bar: u32, beat_unit: u32) -> Self {
        Self {
            beats_per_bar,
            beat_unit,
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl From<(u32, u32)> for TimeSignature {
    fn from((beats_per_bar, beat_unit): (u32, u32)) -> Self {
        Self::new(beats_per_bar, beat_unit)
    }
}

impl From<TimeSignature> for (u32, u32) {
    fn from(sig: TimeSignature) -> Self {
        (sig.beats_per_bar, sig.beat_unit)
    }
}

/// Percussion sound of a rhythm event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumKind {
    Kick,
    Snare,
}

impl DrumKind {
    pub fn label(self) -> &'static str {
        match self {
            DrumKind::Kick => "kick",
            DrumKind::Snare => "snare",
        }
    }
}

/// A drum hit on a global beat index (0-based across the whole score).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RhythmEvent {
    pub beat: u32,
    #[serde(rename = "type")]
    pub kind: DrumKind,
}

/// The rhythm track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rhythm {
    pub pattern: Vec<RhythmEvent>,
}

/// A chord held for one bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordEvent {
    pub bar_index: u32,
    #[serde(rename = "chord")]
    pub symbol: String,
}

/// A melody note. Several notes may share the same (bar, beat).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MelodyEvent {
    pub bar_index: u32,
    /// Beat within the bar (0-based).
    #[serde(rename = "beat")]
    pub beat_in_bar: u32,
    /// Pitch name such as "C4".
    #[serde(rename = "note")]
    pub pitch: String,
    /// Length in quarter-note beats.
    #[serde(rename = "duration")]
    pub duration_beats: f64,
}

/// A complete composition as stored by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub bpm: u32,
    pub time_signature: TimeSignature,
    pub bars: u32,
    pub rhythm: Rhythm,
    #[serde(rename = "chords")]
    pub chord_track: Vec<ChordEvent>,
    #[serde(rename = "melody")]
    pub melody_track: Vec<MelodyEvent>,
}

impl Default for Score {
    /// 120 BPM, 4/4, 8 empty bars.
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            time_signature: TimeSignature::default(),
            bars: DEFAULT_BARS,
            rhythm: Rhythm::default(),
            chord_track: Vec::new(),
            melody_track: Vec::new(),
        }
    }
}

impl Score {
    /// Returns the tempo/meter view used for time conversion.
    pub fn timeline(&self) -> Timeline {
        Timeline::new(self.bpm, self.time_signature.beats_per_bar, self.bars)
    }

    /// Total number of beats in the score.
    pub fn total_beats(&self) -> u32 {
        self.timeline().total_beats()
    }

    /// Total playing time in seconds.
    pub fn total_duration_seconds(&self) -> f64 {
        self.timeline().total_duration_seconds()
    }

    // ==================== Rhythm editing ====================

    /// Returns the drum on a global beat, if any.
    pub fn rhythm_at(&self, beat: u32) -> Option<DrumKind> {
        self.rhythm
            .pattern
            .iter()
            .rev()
            .find(|e| e.beat == beat)
            .map(|e| e.kind)
    }

    /// Puts `kind` on `beat`, replacing whatever was there.
    pub fn set_rhythm(&mut self, beat: u32, kind: Option<DrumKind>) {
        self.rhythm.pattern.retain(|e| e.beat != beat);
        if let Some(kind) = kind {
            self.rhythm.pattern.push(RhythmEvent { beat, kind });
        }
    }

    /// Cycles a rhythm cell: empty, kick, snare, empty.
    pub fn cycle_rhythm(&mut self, beat: u32) -> Option<DrumKind> {
        let next = match self.rhythm_at(beat) {
            None => Some(DrumKind::Kick),
            Some(DrumKind::Kick) => Some(DrumKind::Snare),
            Some(DrumKind::Snare) => None,
        };
        self.set_rhythm(beat, next);
        next
    }

    // ==================== Chord editing ====================

    /// Returns the chord symbol of a bar, if any.
    pub fn chord_at(&self, bar: u32) -> Option<&str> {
        self.chord_track
            .iter()
            .find(|c| c.bar_index == bar)
            .map(|c| c.symbol.as_str())
    }

    /// Sets or clears the chord of a bar, keeping the track ordered by bar.
    pub fn set_chord(&mut self, bar: u32, symbol: Option<&str>) {
        self.chord_track.retain(|c| c.bar_index != bar);
        if let Some(symbol) = symbol.filter(|s| !s.is_empty()) {
            self.chord_track.push(ChordEvent {
                bar_index: bar,
                symbol: symbol.to_string(),
            });
            self.chord_track.sort_by_key(|c| c.bar_index);
        }
    }

    /// Steps a bar through the supported chords, then back to no chord.
    pub fn cycle_chord(&mut self, bar: u32) -> Option<&'static str> {
        let next = match self.chord_at(bar) {
            None => Some(CHORD_OPTIONS[0]),
            Some(current) => CHORD_OPTIONS
                .iter()
                .position(|c| *c == current)
                .and_then(|i| CHORD_OPTIONS.get(i + 1).copied()),
        };
        self.set_chord(bar, next);
        next
    }

    // ==================== Melody editing ====================

    /// Returns the melody notes starting on a (bar, beat) cell.
    pub fn melody_at(&self, bar: u32, beat_in_bar: u32) -> impl Iterator<Item = &MelodyEvent> {
        self.melody_track
            .iter()
            .filter(move |m| m.bar_index == bar && m.beat_in_bar == beat_in_bar)
    }

    /// Toggles a melody grid cell.
    ///
    /// Clicking the pitch already on the cell removes it. Any other pitch
    /// replaces the cell's notes with a single default-length note.
    /// Returns true if a note is on the cell afterwards.
    pub fn toggle_melody(&mut self, bar: u32, beat_in_bar: u32, pitch: &str) -> bool {
        let exists = self.melody_at(bar, beat_in_bar).any(|m| m.pitch == pitch);
        if exists {
            self.melody_track.retain(|m| {
                !(m.bar_index == bar && m.beat_in_bar == beat_in_bar && m.pitch == pitch)
            });
            return false;
        }

        self.melody_track
            .retain(|m| !(m.bar_index == bar && m.beat_in_bar == beat_in_bar));
        self.melody_track.push(MelodyEvent {
            bar_index: bar,
            beat_in_bar,
            pitch: pitch.to_string(),
            duration_beats: DEFAULT_MELODY_DURATION,
        });
        self.melody_track
            .sort_by_key(|m| (m.bar_index, m.beat_in_bar));
        true
    }

    /// Adds a melody note without touching others on the same cell.
    pub fn add_melody(&mut self, event: MelodyEvent) {
        self.melody_track.push(event);
        self.melody_track
            .sort_by_key(|m| (m.bar_index, m.beat_in_bar));
    }

    // ==================== Global settings ====================

    /// Sets the tempo, clamped to the valid range.
    pub fn set_bpm(&mut self, bpm: u32) {
        self.bpm = bpm.clamp(*BPM_RANGE.start(), *BPM_RANGE.end());
    }

    /// Sets the bar count, clamped to the valid range.
    ///
    /// Events that no longer fit are dropped.
    pub fn set_bars(&mut self, bars: u32) {
        self.bars = bars.clamp(*BARS_RANGE.start(), *BARS_RANGE.end());
        let total_beats = self.total_beats();
        let bars = self.bars;
        self.rhythm.pattern.retain(|e| e.beat < total_beats);
        self.chord_track.retain(|c| c.bar_index < bars);
        self.melody_track.retain(|m| m.bar_index < bars);
    }

    // ==================== Serialization ====================

    /// Serializes the score to the editor's JSON shape.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses and validates a score from JSON.
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        let score: Score = serde_json::from_str(json)?;
        score.validate()?;
        Ok(score)
    }

    /// Saves the score to a JSON file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ScoreError> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads and validates a score from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScoreError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_score() {
        let score = Score::default();
        assert_eq!(score.bpm, 120);
        assert_eq!(score.time_signature, TimeSignature::new(4, 4));
        assert_eq!(score.bars, 8);
        assert_eq!(score.total_beats(), 32);
        assert!((score.total_duration_seconds() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "bpm": 90,
            "timeSignature": [3, 4],
            "bars": 2,
            "rhythm": { "pattern": [{ "beat": 0, "type": "kick" }, { "beat": 3, "type": "snare" }] },
            "chords": [{ "barIndex": 1, "chord": "Am" }],
            "melody": [{ "barIndex": 0, "beat": 2, "note": "E4", "duration": 1.5 }]
        }"#;
        let score = Score::from_json(json).unwrap();
        assert_eq!(score.bpm, 90);
        assert_eq!(score.time_signature.beats_per_bar, 3);
        assert_eq!(score.rhythm_at(3), Some(DrumKind::Snare));
        assert_eq!(score.chord_at(1), Some("Am"));
        assert_eq!(score.melody_track[0].pitch, "E4");
        assert!((score.melody_track[0].duration_beats - 1.5).abs() < 1e-9);

        let round = Score::from_json(&score.to_json().unwrap()).unwrap();
        assert_eq!(round, score);
        assert!(score.to_json().unwrap().contains("\"timeSignature\""));
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let json = r#"{ "bpm": 300, "timeSignature": [4, 4], "bars": 1,
            "rhythm": { "pattern": [] }, "chords": [], "melody": [] }"#;
        assert!(matches!(
            Score::from_json(json),
            Err(ScoreError::BpmOutOfRange(300))
        ));
        assert!(matches!(
            Score::from_json("not json"),
            Err(ScoreError::Parse(_))
        ));
    }

    #[test]
    fn test_cycle_rhythm() {
        let mut score = Score::default();
        assert_eq!(score.cycle_rhythm(5), Some(DrumKind::Kick));
        assert_eq!(score.cycle_rhythm(5), Some(DrumKind::Snare));
        assert_eq!(score.cycle_rhythm(5), None);
        assert!(score.rhythm.pattern.is_empty());
    }

    #[test]
    fn test_set_rhythm_last_write_wins() {
        let mut score = Score::default();
        score.set_rhythm(2, Some(DrumKind::Kick));
        score.set_rhythm(2, Some(DrumKind::Snare));
        assert_eq!(score.rhythm.pattern.len(), 1);
        assert_eq!(score.rhythm_at(2), Some(DrumKind::Snare));
    }

    #[test]
    fn test_chords_sorted_and_cycled() {
        let mut score = Score::default();
        score.set_chord(3, Some("G"));
        score.set_chord(0, Some("C"));
        score.set_chord(3, Some("F"));
        let bars: Vec<u32> = score.chord_track.iter().map(|c| c.bar_index).collect();
        assert_eq!(bars, vec![0, 3]);
        assert_eq!(score.chord_at(3), Some("F"));

        score.set_chord(3, None);
        assert_eq!(score.chord_at(3), None);

        let mut seen = Vec::new();
        while let Some(symbol) = score.cycle_chord(5) {
            seen.push(symbol);
        }
        assert_eq!(seen, CHORD_OPTIONS.to_vec());
        assert_eq!(score.chord_at(5), None);
    }

    #[test]
    fn test_toggle_melody() {
        let mut score = Score::default();
        assert!(score.toggle_melody(0, 1, "C4"));
        assert!(score.toggle_melody(0, 1, "E4"));
        let cell: Vec<&str> = score.melody_at(0, 1).map(|m| m.pitch.as_str()).collect();
        assert_eq!(cell, vec!["E4"]);
        assert!(!score.toggle_melody(0, 1, "E4"));
        assert_eq!(score.melody_at(0, 1).count(), 0);
    }

    #[test]
    fn test_set_bars_drops_overflow() {
        let mut score = Score::default();
        score.set_rhythm(30, Some(DrumKind::Kick));
        score.set_chord(7, Some("C"));
        score.toggle_melody(6, 0, "C4");
        score.toggle_melody(0, 0, "D4");
        score.set_bars(2);
        assert!(score.rhythm.pattern.is_empty());
        assert!(score.chord_track.is_empty());
        assert_eq!(score.melody_track.len(), 1);

        score.set_bars(100);
        assert_eq!(score.bars, 32);
        score.set_bpm(10);
        assert_eq!(score.bpm, 40);
    }
}
