//! Structural validation of scores loaded from storage.
//!
//! Playback never requires a validated score; this is the check the
//! storage layer runs before accepting one.

use super::{Score, BARS_RANGE, BPM_RANGE};
use crate::error::ScoreError;
use std::collections::HashSet;

impl Score {
    /// Checks the score's structure. The first violated rule is returned.
    pub fn validate(&self) -> Result<(), ScoreError> {
        if !BPM_RANGE.contains(&self.bpm) {
            return Err(ScoreError::BpmOutOfRange(self.bpm));
        }

        let sig = self.time_signature;
        if sig.beats_per_bar < 1 || sig.beat_unit < 1 {
            return Err(ScoreError::InvalidTimeSignature(
                sig.beats_per_bar,
                sig.beat_unit,
            ));
        }

        if !BARS_RANGE.contains(&self.bars) {
            return Err(ScoreError::BarsOutOfRange(self.bars));
        }

        let total_beats = self.total_beats();
        let mut beats = HashSet::new();
        for event in &self.rhythm.pattern {
            if event.beat >= total_beats {
                return Err(ScoreError::RhythmBeatOutOfRange {
                    beat: event.beat,
                    total_beats,
                });
            }
            if !beats.insert(event.beat) {
                return Err(ScoreError::DuplicateRhythmBeat(event.beat));
            }
        }

        let mut bars = HashSet::new();
        for chord in &self.chord_track {
            if chord.bar_index >= self.bars {
                return Err(ScoreError::ChordBarOutOfRange {
                    bar: chord.bar_index,
                    bars: self.bars,
                });
            }
            if !bars.insert(chord.bar_index) {
                return Err(ScoreError::DuplicateChordBar(chord.bar_index));
            }
        }

        for note in &self.melody_track {
            if note.bar_index >= self.bars {
                return Err(ScoreError::MelodyBarOutOfRange {
                    bar: note.bar_index,
                    bars: self.bars,
                });
            }
            if note.beat_in_bar >= sig.beats_per_bar {
                return Err(ScoreError::MelodyBeatOutOfRange {
                    beat: note.beat_in_bar,
                    beats_per_bar: sig.beats_per_bar,
                });
            }
            if !(note.duration_beats.is_finite() && note.duration_beats > 0.0) {
                return Err(ScoreError::NonPositiveDuration(note.duration_beats));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{ChordEvent, DrumKind, MelodyEvent, RhythmEvent, TimeSignature};

    fn melody(bar: u32, beat: u32, duration: f64) -> MelodyEvent {
        MelodyEvent {
            bar_index: bar,
            beat_in_bar: beat,
            pitch: "C4".to_string(),
            duration_beats: duration,
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(Score::default().validate().is_ok());
    }

    #[test]
    fn test_header_ranges() {
        let mut score = Score::default();
        score.bpm = 39;
        assert!(matches!(score.validate(), Err(ScoreError::BpmOutOfRange(39))));
        score.bpm = 240;
        assert!(score.validate().is_ok());

        score.time_signature = TimeSignature::new(0, 4);
        assert!(matches!(
            score.validate(),
            Err(ScoreError::InvalidTimeSignature(0, 4))
        ));
        score.time_signature = TimeSignature::new(3, 8);

        score.bars = 33;
        assert!(matches!(score.validate(), Err(ScoreError::BarsOutOfRange(33))));
        score.bars = 0;
        assert!(matches!(score.validate(), Err(ScoreError::BarsOutOfRange(0))));
    }

    #[test]
    fn test_rhythm_rules() {
        let mut score = Score::default();
        score.bars = 1;
        score.rhythm.pattern.push(RhythmEvent {
            beat: 4,
            kind: DrumKind::Kick,
        });
        assert!(matches!(
            score.validate(),
            Err(ScoreError::RhythmBeatOutOfRange {
                beat: 4,
                total_beats: 4
            })
        ));

        score.rhythm.pattern = vec![
            RhythmEvent {
                beat: 1,
                kind: DrumKind::Kick,
            },
            RhythmEvent {
                beat: 1,
                kind: DrumKind::Snare,
            },
        ];
        assert!(matches!(
            score.validate(),
            Err(ScoreError::DuplicateRhythmBeat(1))
        ));
    }

    #[test]
    fn test_chord_rules() {
        let mut score = Score::default();
        score.chord_track.push(ChordEvent {
            bar_index: 8,
            symbol: "C".into(),
        });
        assert!(matches!(
            score.validate(),
            Err(ScoreError::ChordBarOutOfRange { bar: 8, bars: 8 })
        ));

        score.chord_track = vec![
            ChordEvent {
                bar_index: 2,
                symbol: "C".into(),
            },
            ChordEvent {
                bar_index: 2,
                symbol: "G".into(),
            },
        ];
        assert!(matches!(score.validate(), Err(ScoreError::DuplicateChordBar(2))));

        // Unknown symbols are a playback concern, not a structural one
        score.chord_track.truncate(1);
        score.chord_track[0].symbol = "Xmaj13".into();
        assert!(score.validate().is_ok());
    }

    #[test]
    fn test_melody_rules() {
        let mut score = Score::default();
        score.melody_track.push(melody(8, 0, 1.0));
        assert!(matches!(
            score.validate(),
            Err(ScoreError::MelodyBarOutOfRange { bar: 8, .. })
        ));

        score.melody_track = vec![melody(0, 4, 1.0)];
        assert!(matches!(
            score.validate(),
            Err(ScoreError::MelodyBeatOutOfRange {
                beat: 4,
                beats_per_bar: 4
            })
        ));

        score.melody_track = vec![melody(0, 0, 0.0)];
        assert!(matches!(
            score.validate(),
            Err(ScoreError::NonPositiveDuration(_))
        ));

        // Polyphony on one cell is allowed
        score.melody_track = vec![melody(0, 0, 1.0), melody(0, 0, 2.0)];
        assert!(score.validate().is_ok());
    }
}
