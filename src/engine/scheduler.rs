//! Converts a score into device-clock triggers.
//!
//! One pass walks the rhythm, chord, and melody tracks and submits every
//! event that falls in `[offset - tolerance, total)` to the synthesis
//! capability. The whole remaining timeline goes out at once; scores are
//! capped at 32 bars, which keeps that bounded.

use super::position::Anchor;
use crate::audio::{Synthesis, TriggerId};
use crate::config::EngineConfig;
use crate::score::{chord_tones, name_to_frequency, Score};
use tracing::{debug, warn};

/// A trigger submitted during a scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTrigger {
    pub id: TriggerId,
    /// Absolute device time the sound starts at.
    pub at_device_time: f64,
}

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleReport {
    /// Triggers handed to the synthesis capability, in submission order.
    pub triggers: Vec<ScheduledTrigger>,
    /// Events dropped because they were invalid (unknown chord or pitch,
    /// position outside the score, non-positive duration).
    pub skipped: usize,
    /// Valid events lying before the start offset.
    pub already_played: usize,
}

impl ScheduleReport {
    pub fn submitted(&self) -> usize {
        self.triggers.len()
    }
}

/// Maps logical event times onto the device clock for one pass.
struct Window {
    anchor: Anchor,
    end: f64,
    tolerance: f64,
}

impl Window {
    fn contains(&self, t: f64) -> bool {
        t >= self.anchor.logical_time - self.tolerance && t < self.end
    }

    /// Device time of logical time `t`. Events inside the tolerance band
    /// before the offset play immediately.
    fn device_time(&self, t: f64) -> f64 {
        self.anchor.device_at(t).max(self.anchor.device_time)
    }
}

/// Schedules every event of `score` from logical time `offset_seconds`.
///
/// `device_now` is the device clock reading that corresponds to
/// `offset_seconds`. Invalid events are skipped and logged; the pass never
/// fails.
pub fn schedule_from<S: Synthesis + ?Sized>(
    score: &Score,
    offset_seconds: f64,
    device_now: f64,
    synth: &mut S,
    config: &EngineConfig,
) -> ScheduleReport {
    let timeline = score.timeline();
    let total_beats = timeline.total_beats();
    let beats_per_bar = score.time_signature.beats_per_bar;
    let window = Window {
        anchor: Anchor::new(offset_seconds, device_now),
        end: timeline.total_duration_seconds(),
        tolerance: config.boundary_tolerance_seconds,
    };
    let mut report = ScheduleReport::default();

    // Rhythm: global beat index, fixed-timbre percussion
    for event in &score.rhythm.pattern {
        if event.beat >= total_beats {
            warn!("skipping {} on beat {}: outside the score", event.kind.label(), event.beat);
            report.skipped += 1;
            continue;
        }
        let t = timeline.beat_to_seconds(event.beat);
        if !window.contains(t) {
            report.already_played += 1;
            continue;
        }
        let at = window.device_time(t);
        let id = synth.trigger_percussion(event.kind, at);
        report.triggers.push(ScheduledTrigger {
            id,
            at_device_time: at,
        });
    }

    // Chords: triad at the top of the bar, tones staggered
    for chord in &score.chord_track {
        let Some(tones) = chord_tones(&chord.symbol) else {
            warn!("skipping unknown chord {:?} in bar {}", chord.symbol, chord.bar_index);
            report.skipped += 1;
            continue;
        };
        if chord.bar_index >= score.bars {
            warn!("skipping chord in bar {}: outside the score", chord.bar_index);
            report.skipped += 1;
            continue;
        }
        let t = timeline.bar_beat_to_seconds(chord.bar_index, 0);
        if !window.contains(t) {
            report.already_played += 1;
            continue;
        }
        let at = window.device_time(t);
        for (i, tone) in tones.iter().enumerate() {
            let Some(frequency) = name_to_frequency(tone) else {
                continue;
            };
            let when = at + i as f64 * config.chord_stagger_seconds;
            let id = synth.trigger_tone(
                frequency,
                when,
                config.chord_tone_seconds,
                config.chord_timbre,
                config.chord_gain,
            );
            report.triggers.push(ScheduledTrigger {
                id,
                at_device_time: when,
            });
        }
    }

    // Melody: one tone per note, own duration
    for note in &score.melody_track {
        if note.bar_index >= score.bars || note.beat_in_bar >= beats_per_bar {
            warn!(
                "skipping melody note at bar {} beat {}: outside the score",
                note.bar_index, note.beat_in_bar
            );
            report.skipped += 1;
            continue;
        }
        if !(note.duration_beats.is_finite() && note.duration_beats > 0.0) {
            warn!("skipping melody note with duration {}", note.duration_beats);
            report.skipped += 1;
            continue;
        }
        let Some(frequency) = name_to_frequency(&note.pitch) else {
            warn!("skipping melody note with unknown pitch {:?}", note.pitch);
            report.skipped += 1;
            continue;
        };
        let t = timeline.bar_beat_to_seconds(note.bar_index, note.beat_in_bar);
        if !window.contains(t) {
            report.already_played += 1;
            continue;
        }
        let at = window.device_time(t);
        let id = synth.trigger_tone(
            frequency,
            at,
            timeline.beats_to_seconds(note.duration_beats),
            config.melody_timbre,
            config.melody_gain,
        );
        report.triggers.push(ScheduledTrigger {
            id,
            at_device_time: at,
        });
    }

    debug!(
        offset = offset_seconds,
        device_now,
        submitted = report.submitted(),
        skipped = report.skipped,
        "scheduled score"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{RecordingSynth, Timbre, TriggerSound};
    use crate::score::{DrumKind, MelodyEvent};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn one_bar() -> Score {
        let mut score = Score::default();
        score.bars = 1;
        score
    }

    #[test]
    fn test_kick_on_downbeat() {
        let mut score = one_bar();
        score.set_rhythm(0, Some(DrumKind::Kick));
        let mut synth = RecordingSynth::at_clock(10.0);

        let report = schedule_from(&score, 0.0, 10.0, &mut synth, &EngineConfig::default());
        assert_eq!(report.submitted(), 1);
        let trigger = &synth.triggers()[0];
        assert_eq!(trigger.drum(), Some(DrumKind::Kick));
        assert!(close(trigger.at_device_time, 10.0));
    }

    #[test]
    fn test_offset_drops_played_events() {
        let mut score = one_bar();
        for beat in 0..4 {
            score.set_rhythm(beat, Some(DrumKind::Snare));
        }
        let mut synth = RecordingSynth::new();

        let report = schedule_from(&score, 1.0, 20.0, &mut synth, &EngineConfig::default());
        assert_eq!(report.submitted(), 2);
        assert_eq!(report.already_played, 2);
        let times: Vec<f64> = synth.triggers().iter().map(|t| t.at_device_time).collect();
        assert!(close(times[0], 20.0));
        assert!(close(times[1], 20.5));
    }

    #[test]
    fn test_boundary_tolerance() {
        let mut score = one_bar();
        score.set_rhythm(2, Some(DrumKind::Kick));
        let mut synth = RecordingSynth::new();

        // Resume point lands a hair after the beat
        let report = schedule_from(&score, 1.005, 3.0, &mut synth, &EngineConfig::default());
        assert_eq!(report.submitted(), 1);
        assert!(close(synth.triggers()[0].at_device_time, 3.0));

        let config = EngineConfig {
            boundary_tolerance_seconds: 0.0,
            ..EngineConfig::default()
        };
        let report = schedule_from(&score, 1.005, 3.0, &mut synth, &config);
        assert_eq!(report.submitted(), 0);
    }

    #[test]
    fn test_chord_expands_to_staggered_triad() {
        let mut score = one_bar();
        score.set_chord(0, Some("C"));
        let mut synth = RecordingSynth::new();

        schedule_from(&score, 0.0, 1.0, &mut synth, &EngineConfig::default());
        let triggers = synth.triggers();
        assert_eq!(triggers.len(), 3);
        for (i, expected) in ["C4", "E4", "G4"].iter().enumerate() {
            assert!(close(triggers[i].at_device_time, 1.0 + 0.05 * i as f64));
            let freq = name_to_frequency(expected).unwrap();
            assert!(close(triggers[i].frequency().unwrap(), freq));
            match &triggers[i].sound {
                TriggerSound::Tone {
                    duration_seconds,
                    timbre,
                    gain,
                    ..
                } => {
                    assert!(close(*duration_seconds, 0.4));
                    assert_eq!(*timbre, Timbre::Sine);
                    assert_eq!(*gain, 0.12);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_chord_skipped_others_fire() {
        let mut score = Score::default();
        score.bars = 2;
        score.set_chord(0, Some("Cmaj9"));
        score.set_chord(1, Some("G"));
        score.set_rhythm(0, Some(DrumKind::Kick));
        let mut synth = RecordingSynth::new();

        let report = schedule_from(&score, 0.0, 0.0, &mut synth, &EngineConfig::default());
        assert_eq!(report.skipped, 1);
        assert_eq!(report.submitted(), 4);
        assert_eq!(synth.triggers().iter().filter(|t| t.drum().is_some()).count(), 1);
    }

    #[test]
    fn test_melody_duration_and_polyphony() {
        let mut score = one_bar();
        score.bpm = 60;
        for pitch in ["C4", "E4"] {
            score.add_melody(MelodyEvent {
                bar_index: 0,
                beat_in_bar: 2,
                pitch: pitch.to_string(),
                duration_beats: 1.5,
            });
        }
        let mut synth = RecordingSynth::new();

        schedule_from(&score, 0.0, 100.0, &mut synth, &EngineConfig::default());
        assert_eq!(synth.triggers().len(), 2);
        for trigger in synth.triggers() {
            assert!(close(trigger.at_device_time, 102.0));
            match trigger.sound {
                TriggerSound::Tone {
                    duration_seconds,
                    gain,
                    ..
                } => {
                    assert!(close(duration_seconds, 1.5));
                    assert_eq!(gain, 0.2);
                }
                _ => panic!("melody must be a tone"),
            }
        }
    }

    #[test]
    fn test_invalid_events_skipped() {
        let mut score = one_bar();
        score.set_rhythm(4, Some(DrumKind::Kick));
        score.set_chord(3, Some("C"));
        for (bar, beat, pitch, duration) in [
            (0, 7, "C4", 1.0),
            (2, 0, "C4", 1.0),
            (0, 0, "C4", 0.0),
            (0, 0, "Q9", 1.0),
            (0, 1, "D4", 1.0),
        ] {
            score.melody_track.push(MelodyEvent {
                bar_index: bar,
                beat_in_bar: beat,
                pitch: pitch.to_string(),
                duration_beats: duration,
            });
        }
        let mut synth = RecordingSynth::new();

        let report = schedule_from(&score, 0.0, 0.0, &mut synth, &EngineConfig::default());
        assert_eq!(report.skipped, 6);
        assert_eq!(report.submitted(), 1);
    }

    #[test]
    fn test_out_of_range_octave_skipped() {
        let mut score = one_bar();
        score.set_rhythm(0, Some(DrumKind::Kick));
        score.melody_track.push(MelodyEvent {
            bar_index: 0,
            beat_in_bar: 1,
            pitch: "C200000000".to_string(),
            duration_beats: 1.0,
        });
        let mut synth = RecordingSynth::new();

        let report = schedule_from(&score, 0.0, 0.0, &mut synth, &EngineConfig::default());
        assert_eq!(report.skipped, 1);
        assert_eq!(report.submitted(), 1);
        assert!(synth.triggers().iter().all(|t| t.frequency().is_none()));
    }

    #[test]
    fn test_offset_at_end_schedules_nothing() {
        let mut score = one_bar();
        score.set_rhythm(3, Some(DrumKind::Kick));
        let mut synth = RecordingSynth::new();

        let report = schedule_from(&score, 2.0, 0.0, &mut synth, &EngineConfig::default());
        assert_eq!(report.submitted(), 0);
    }
}
