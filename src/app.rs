//! Application state management.
//!
//! This module contains the main application state: the score being
//! edited, the transport that plays it, and the grid cursor.

use crate::audio::{OutputDevice, Synthesis};
use crate::config::EngineConfig;
use crate::engine::{FrameOutcome, PlaybackState, Transport};
use crate::score::{Score, MELODY_NOTE_OPTIONS};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Where scores are saved when no path was given on the command line.
pub const DEFAULT_SCORE_PATH: &str = "score.json";

/// How long status messages stay on screen.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// The editor row the cursor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Rhythm,
    Chords,
    Melody,
}

impl Lane {
    pub fn label(self) -> &'static str {
        match self {
            Lane::Rhythm => "Rhythm",
            Lane::Chords => "Chords",
            Lane::Melody => "Melody",
        }
    }
}

/// Grid cursor: a global beat plus, for the melody lane, a pitch row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub lane: Lane,
    pub beat: u32,
    /// Index into `MELODY_NOTE_OPTIONS`.
    pub pitch_index: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            lane: Lane::Rhythm,
            beat: 0,
            pitch_index: 0,
        }
    }
}

/// Main application state.
pub struct App<S: Synthesis = OutputDevice> {
    score: Score,
    pub transport: Transport<S>,
    pub cursor: Cursor,
    /// Where `save()` writes.
    pub score_path: PathBuf,
    /// Whether the score has unsaved changes.
    pub modified: bool,
    /// Status message to display (clears after timeout).
    pub status_message: Option<(String, Instant)>,
    pub should_quit: bool,
}

impl<S: Synthesis> App<S> {
    /// Creates an editor session around a score and a synthesis handle.
    pub fn new(score: Score, synth: S, config: EngineConfig, score_path: PathBuf) -> Self {
        let transport = Transport::with_score(synth, config, &score);
        Self {
            score,
            transport,
            cursor: Cursor::default(),
            score_path,
            modified: false,
            status_message: None,
            should_quit: false,
        }
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    /// Sets a status message.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    // ==================== Playback ====================

    /// Toggles between playing and paused.
    pub fn toggle_playback(&mut self) {
        let was_playing = self.transport.is_playing();
        match self.transport.toggle(&self.score) {
            Ok(()) if was_playing => self.set_status("Paused"),
            Ok(()) => self.set_status("Playing"),
            Err(e) => {
                tracing::warn!("playback failed to start: {}", e);
                self.set_status(format!("Cannot play: {}", e));
            }
        }
    }

    /// Stops playback and rewinds to the top.
    pub fn stop_playback(&mut self) {
        self.transport.stop();
        self.set_status("Stopped");
    }

    /// Moves the playback position by a number of beats.
    pub fn seek_beats(&mut self, delta: i32) {
        let timeline = self.score.timeline();
        let target = self.transport.current_logical_time_seconds()
            + timeline.beats_to_seconds(delta as f64);
        self.reposition(target);
    }

    /// Moves the playback position to the beat under the cursor.
    pub fn seek_to_cursor(&mut self) {
        let target = self.score.timeline().beat_to_seconds(self.cursor.beat);
        self.reposition(target);
    }

    fn reposition(&mut self, seconds: f64) {
        if let Err(e) = self.transport.reposition(seconds, &self.score) {
            tracing::warn!("reposition failed: {}", e);
            self.set_status(format!("Cannot play: {}", e));
        }
    }

    /// Advances the position loop by one display frame.
    ///
    /// Called from the main loop on every iteration.
    pub fn update(&mut self) {
        if self.transport.on_frame() == FrameOutcome::Finished {
            self.set_status("Finished");
        }
    }

    /// Global beat to highlight, if playback is running or paused.
    pub fn active_beat(&self) -> Option<u32> {
        if self.transport.playback_state() == PlaybackState::Stopped {
            return None;
        }
        self.score
            .timeline()
            .active_beat(self.transport.current_logical_time_seconds())
    }

    /// Formats the playback position as `bar.beat` (1-based).
    pub fn position_string(&self) -> String {
        let (bar, beat) = self
            .score
            .timeline()
            .seconds_to_bar_beat(self.transport.current_logical_time_seconds());
        format!("{}.{}", bar + 1, beat + 1)
    }

    // ==================== Cursor ====================

    pub fn move_cursor_left(&mut self) {
        let step = self.cursor_step();
        self.cursor.beat = self.cursor.beat.saturating_sub(step);
        self.snap_cursor();
    }

    pub fn move_cursor_right(&mut self) {
        let step = self.cursor_step();
        let last = self.score.total_beats().saturating_sub(1);
        self.cursor.beat = (self.cursor.beat + step).min(last);
        self.snap_cursor();
    }

    /// Moves up a pitch in the melody lane, or to the previous lane.
    pub fn move_cursor_up(&mut self) {
        match self.cursor.lane {
            Lane::Melody if self.cursor.pitch_index + 1 < MELODY_NOTE_OPTIONS.len() => {
                self.cursor.pitch_index += 1;
            }
            Lane::Melody => {}
            Lane::Chords => self.cursor.lane = Lane::Rhythm,
            Lane::Rhythm => {}
        }
        self.snap_cursor();
    }

    /// Moves down a pitch in the melody lane, or to the next lane.
    pub fn move_cursor_down(&mut self) {
        match self.cursor.lane {
            Lane::Rhythm => self.cursor.lane = Lane::Chords,
            Lane::Chords => self.cursor.lane = Lane::Melody,
            Lane::Melody => self.cursor.pitch_index = self.cursor.pitch_index.saturating_sub(1),
        }
        self.snap_cursor();
    }

    /// Cycles which lane the cursor edits.
    pub fn next_lane(&mut self) {
        self.cursor.lane = match self.cursor.lane {
            Lane::Rhythm => Lane::Chords,
            Lane::Chords => Lane::Melody,
            Lane::Melody => Lane::Rhythm,
        };
        self.snap_cursor();
    }

    /// Chord cells span a whole bar.
    fn cursor_step(&self) -> u32 {
        match self.cursor.lane {
            Lane::Chords => self.score.time_signature.beats_per_bar.max(1),
            Lane::Rhythm | Lane::Melody => 1,
        }
    }

    fn snap_cursor(&mut self) {
        let last = self.score.total_beats().saturating_sub(1);
        self.cursor.beat = self.cursor.beat.min(last);
        if self.cursor.lane == Lane::Chords {
            let per_bar = self.score.time_signature.beats_per_bar.max(1);
            self.cursor.beat -= self.cursor.beat % per_bar;
        }
    }

    /// The melody pitch under the cursor.
    pub fn cursor_pitch(&self) -> &'static str {
        MELODY_NOTE_OPTIONS[self.cursor.pitch_index.min(MELODY_NOTE_OPTIONS.len() - 1)]
    }

    // ==================== Editing ====================

    /// Edits the cell under the cursor.
    ///
    /// Edits take effect on the next start; a running playback keeps the
    /// schedule it was started with.
    pub fn edit_at_cursor(&mut self) {
        let per_bar = self.score.time_signature.beats_per_bar.max(1);
        let bar = self.cursor.beat / per_bar;
        let beat_in_bar = self.cursor.beat % per_bar;

        let message = match self.cursor.lane {
            Lane::Rhythm => match self.score.cycle_rhythm(self.cursor.beat) {
                Some(kind) => format!("Beat {}: {}", self.cursor.beat + 1, kind.label()),
                None => format!("Beat {}: cleared", self.cursor.beat + 1),
            },
            Lane::Chords => match self.score.cycle_chord(bar) {
                Some(symbol) => format!("Bar {}: {}", bar + 1, symbol),
                None => format!("Bar {}: no chord", bar + 1),
            },
            Lane::Melody => {
                let pitch = self.cursor_pitch();
                if self.score.toggle_melody(bar, beat_in_bar, pitch) {
                    format!("Added {}", pitch)
                } else {
                    format!("Removed {}", pitch)
                }
            }
        };
        self.mark_modified();
        self.set_status(message);
    }

    /// Changes the tempo by `delta` BPM.
    pub fn adjust_bpm(&mut self, delta: i32) {
        let bpm = self.score.bpm.saturating_add_signed(delta);
        self.score.set_bpm(bpm);
        self.transport.score_changed(&self.score);
        self.mark_modified();
        self.set_status(format!("Tempo: {} BPM", self.score.bpm));
    }

    /// Adds or removes bars at the end of the score.
    pub fn adjust_bars(&mut self, delta: i32) {
        let bars = self.score.bars.saturating_add_signed(delta);
        self.score.set_bars(bars);
        self.transport.score_changed(&self.score);
        self.snap_cursor();
        self.mark_modified();
        self.set_status(format!("Bars: {}", self.score.bars));
    }

    /// Replaces the score with a fresh default one.
    pub fn new_score(&mut self) {
        self.score = Score::default();
        self.transport.load_score(&self.score);
        self.cursor = Cursor::default();
        self.modified = false;
        self.set_status("New score");
    }

    fn mark_modified(&mut self) {
        self.modified = true;
    }

    // ==================== File I/O ====================

    /// Saves the score to `score_path`.
    pub fn save(&mut self) -> bool {
        match self.score.save_to_file(&self.score_path) {
            Ok(()) => {
                self.modified = false;
                self.set_status(format!("Saved to {}", self.score_path.display()));
                true
            }
            Err(e) => {
                tracing::error!("Failed to save score: {}", e);
                self.set_status(format!("Save failed: {}", e));
                false
            }
        }
    }

    /// Stops playback for exit.
    pub fn quit(&mut self) {
        self.transport.shutdown();
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingSynth;
    use crate::score::DrumKind;

    fn test_app() -> App<RecordingSynth> {
        let mut score = Score::default();
        score.bars = 2;
        App::new(
            score,
            RecordingSynth::new(),
            EngineConfig::default(),
            std::env::temp_dir().join("scoreplay_app_test.json"),
        )
    }

    #[test]
    fn test_toggle_and_highlight() {
        let mut app = test_app();
        assert_eq!(app.active_beat(), None);

        app.toggle_playback();
        assert!(app.transport.is_playing());
        app.transport.synth_mut().set_clock(1.25);
        app.update();
        assert_eq!(app.active_beat(), Some(2));
        assert_eq!(app.position_string(), "1.3");

        app.toggle_playback();
        assert_eq!(app.transport.playback_state(), PlaybackState::Paused);
        assert_eq!(app.active_beat(), Some(2));

        app.stop_playback();
        assert_eq!(app.active_beat(), None);
    }

    #[test]
    fn test_playback_finishes() {
        let mut app = test_app();
        app.toggle_playback();
        app.transport.synth_mut().set_clock(4.0);
        app.update();
        assert_eq!(app.transport.playback_state(), PlaybackState::Stopped);
        assert_eq!(
            app.status_message.as_ref().map(|(m, _)| m.as_str()),
            Some("Finished")
        );
    }

    #[test]
    fn test_device_error_is_reported() {
        let mut score = Score::default();
        score.bars = 1;
        let mut app = App::new(
            score,
            RecordingSynth::unavailable(),
            EngineConfig::default(),
            PathBuf::from(DEFAULT_SCORE_PATH),
        );
        app.toggle_playback();
        assert!(!app.transport.is_playing());
        let (message, _) = app.status_message.clone().unwrap();
        assert!(message.starts_with("Cannot play"));
    }

    #[test]
    fn test_edit_lanes() {
        let mut app = test_app();
        app.cursor.beat = 5;
        app.edit_at_cursor();
        assert_eq!(app.score().rhythm_at(5), Some(DrumKind::Kick));
        assert!(app.modified);

        app.move_cursor_down();
        assert_eq!(app.cursor.lane, Lane::Chords);
        app.edit_at_cursor();
        assert_eq!(app.score().chord_at(1), Some("C"));

        app.move_cursor_down();
        app.cursor.beat = 6;
        app.cursor.pitch_index = 2;
        app.edit_at_cursor();
        let notes: Vec<_> = app.score().melody_at(1, 2).collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch, "E4");
        app.edit_at_cursor();
        assert_eq!(app.score().melody_at(1, 2).count(), 0);
    }

    #[test]
    fn test_chord_cursor_snaps_to_bar() {
        let mut app = test_app();
        app.cursor.beat = 6;
        app.next_lane();
        assert_eq!(app.cursor.beat, 4);
        app.move_cursor_left();
        assert_eq!(app.cursor.beat, 0);
        app.move_cursor_right();
        app.move_cursor_right();
        assert_eq!(app.cursor.beat, 4);
    }

    #[test]
    fn test_seek_beats_clamps() {
        let mut app = test_app();
        app.seek_beats(3);
        assert_eq!(app.transport.paused_offset_seconds(), 1.5);
        app.seek_beats(-10);
        assert_eq!(app.transport.paused_offset_seconds(), 0.0);
        app.seek_beats(100);
        assert_eq!(app.transport.paused_offset_seconds(), 4.0);
    }

    #[test]
    fn test_adjust_bars_updates_transport() {
        let mut app = test_app();
        app.cursor.beat = 7;
        app.adjust_bars(-1);
        assert_eq!(app.score().bars, 1);
        assert_eq!(app.transport.total_duration_seconds(), 2.0);
        assert_eq!(app.cursor.beat, 3);

        app.adjust_bpm(1000);
        assert_eq!(app.score().bpm, 240);
        assert_eq!(app.transport.total_duration_seconds(), 1.0);
    }

    #[test]
    fn test_quit_stops_and_releases_output() {
        let mut app = test_app();
        app.cursor.beat = 3;
        app.edit_at_cursor();
        app.toggle_playback();
        app.transport.synth_mut().set_clock(0.5);
        app.quit();

        assert!(app.should_quit);
        assert_eq!(app.transport.playback_state(), PlaybackState::Stopped);
        assert_eq!(app.transport.synth().cancelled().len(), 1);
        assert_eq!(app.transport.synth().release_count(), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let mut app = test_app();
        app.cursor.beat = 1;
        app.edit_at_cursor();
        assert!(app.save());
        assert!(!app.modified);

        let loaded = Score::load_from_file(&app.score_path).unwrap();
        assert_eq!(loaded, *app.score());
        std::fs::remove_file(&app.score_path).ok();
    }
}
