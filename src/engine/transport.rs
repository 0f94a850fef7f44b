//! Transport: play/pause/stop/seek over a score.
//!
//! The transport owns the synthesis handle for the session, the anchor
//! between logical time and the device clock, and the position loop.
//! Every exit from `Playing` drops the loop before returning, so no frame
//! can run against a stopped or torn-down transport.

use super::position::{Anchor, FrameOutcome, PositionLoop};
use super::scheduler::{schedule_from, ScheduleReport, ScheduledTrigger};
use crate::audio::Synthesis;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::score::Score;
use tracing::debug;

/// Represents the current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not playing, position reset to start.
    Stopped,
    /// Currently playing.
    Playing,
    /// Paused at current position.
    Paused,
}

/// Playback controller for one editing session.
pub struct Transport<S: Synthesis> {
    synth: S,
    config: EngineConfig,
    state: PlaybackState,
    /// Logical time the next start resumes from.
    paused_offset: f64,
    /// Last published playback position.
    current_time: f64,
    /// Length of the score as of the last load/start.
    total_duration: f64,
    /// Present exactly while playing.
    position_loop: Option<PositionLoop>,
    /// Triggers of the latest scheduling pass that may still be revoked.
    pending: Vec<ScheduledTrigger>,
    last_report: Option<ScheduleReport>,
}

impl<S: Synthesis> Transport<S> {
    /// Creates a stopped transport around a synthesis handle.
    pub fn new(synth: S, config: EngineConfig) -> Self {
        Self {
            synth,
            config,
            state: PlaybackState::Stopped,
            paused_offset: 0.0,
            current_time: 0.0,
            total_duration: 0.0,
            position_loop: None,
            pending: Vec::new(),
            last_report: None,
        }
    }

    /// Creates a stopped transport with `score` loaded.
    pub fn with_score(synth: S, config: EngineConfig, score: &Score) -> Self {
        let mut transport = Self::new(synth, config);
        transport.load_score(score);
        transport
    }

    // ==================== Accessors ====================

    pub fn playback_state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Current playback position in logical seconds, for highlighting.
    pub fn current_logical_time_seconds(&self) -> f64 {
        self.current_time
    }

    /// Logical time the next `start()` resumes from.
    pub fn paused_offset_seconds(&self) -> f64 {
        self.paused_offset
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration
    }

    /// Anchor of the running playback, if playing.
    pub fn anchor(&self) -> Option<Anchor> {
        self.position_loop.as_ref().map(PositionLoop::anchor)
    }

    /// Whether the host should keep delivering frames.
    pub fn frame_pending(&self) -> bool {
        self.position_loop.is_some()
    }

    /// Report of the most recent scheduling pass.
    pub fn last_schedule(&self) -> Option<&ScheduleReport> {
        self.last_report.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn synth(&self) -> &S {
        &self.synth
    }

    pub fn synth_mut(&mut self) -> &mut S {
        &mut self.synth
    }

    // ==================== Score lifecycle ====================

    /// Resets to stopped at the top of a newly loaded score.
    pub fn load_score(&mut self, score: &Score) {
        self.halt();
        self.state = PlaybackState::Stopped;
        self.paused_offset = 0.0;
        self.current_time = 0.0;
        self.total_duration = score.total_duration_seconds();
        self.last_report = None;
        debug!(total = self.total_duration, "score loaded");
    }

    /// Picks up edits to the current score's length.
    ///
    /// A running playback keeps its schedule until the next start.
    pub fn score_changed(&mut self, score: &Score) {
        self.total_duration = score.total_duration_seconds();
        if !self.is_playing() {
            self.paused_offset = self.clamp_to_score(self.paused_offset);
            self.current_time = self.paused_offset;
        }
    }

    // ==================== Transport commands ====================

    /// Starts or resumes playback from the paused offset.
    ///
    /// Does nothing if already playing.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DeviceUnavailable` if the audio output cannot
    /// be resumed; the transport is left unchanged.
    pub fn start(&mut self, score: &Score) -> Result<(), EngineError> {
        if self.is_playing() {
            debug!("start ignored: already playing");
            return Ok(());
        }

        self.synth.resume_device_if_suspended()?;

        self.total_duration = score.total_duration_seconds();
        self.paused_offset = self.clamp_to_score(self.paused_offset);
        let offset = self.paused_offset;
        let device_now = self.synth.device_clock_now();
        let anchor = Anchor::new(offset, device_now);

        let report = schedule_from(score, offset, device_now, &mut self.synth, &self.config);
        self.pending = report.triggers.clone();
        self.last_report = Some(report);

        self.position_loop = Some(PositionLoop::new(anchor, self.total_duration));
        self.current_time = offset;
        self.state = PlaybackState::Playing;
        debug!(offset, device_now, "playback started");
        Ok(())
    }

    /// Pauses at the last published position. Does nothing unless playing.
    ///
    /// Before the first frame has run, the position is read from the
    /// device clock through the anchor instead.
    pub fn pause(&mut self) {
        if !self.is_playing() {
            debug!("pause ignored: not playing");
            return;
        }

        let position = match self.position_loop.as_ref() {
            Some(l) if l.frames() > 0 => l.last_position(),
            Some(l) => l.anchor().logical_at(self.synth.device_clock_now()),
            None => self.current_time,
        };
        let position = self.clamp_to_score(position);

        self.halt();
        self.paused_offset = position;
        self.current_time = position;
        self.state = PlaybackState::Paused;
        debug!(position, "playback paused");
    }

    /// Stops and rewinds to the top. Safe to call in any state.
    pub fn stop(&mut self) {
        self.halt();
        if self.state != PlaybackState::Stopped {
            debug!("playback stopped");
        }
        self.paused_offset = 0.0;
        self.current_time = 0.0;
        self.state = PlaybackState::Stopped;
    }

    /// Toggles between playing and paused.
    pub fn toggle(&mut self, score: &Score) -> Result<(), EngineError> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.start(score)
        }
    }

    /// Moves the resume point, clamped to the score.
    ///
    /// Does not reschedule a running playback; use [`Transport::reposition`]
    /// for that.
    pub fn seek(&mut self, seconds: f64) {
        let target = if seconds.is_nan() {
            0.0
        } else {
            self.clamp_to_score(seconds)
        };
        self.paused_offset = target;
        if self.is_playing() {
            debug!(target, "seek while playing takes effect on next start");
        } else {
            self.current_time = target;
        }
    }

    /// Seeks and, if playing, restarts playback from the new position.
    pub fn reposition(&mut self, seconds: f64, score: &Score) -> Result<(), EngineError> {
        self.total_duration = score.total_duration_seconds();
        if !self.is_playing() {
            self.seek(seconds);
            return Ok(());
        }

        self.halt();
        self.state = PlaybackState::Paused;
        self.seek(seconds);
        self.current_time = self.paused_offset;
        self.start(score)
    }

    // ==================== Position loop ====================

    /// Runs one display frame of the position loop.
    ///
    /// Publishes the current position, or stops the transport when the end
    /// of the score has been reached.
    pub fn on_frame(&mut self) -> FrameOutcome {
        let device_now = self.synth.device_clock_now();
        let Some(frame_loop) = self.position_loop.as_mut() else {
            return FrameOutcome::Idle;
        };

        match frame_loop.tick(device_now) {
            Some(position) => {
                self.current_time = position;
                FrameOutcome::Position(position)
            }
            None => {
                debug!("reached end of score");
                self.stop();
                FrameOutcome::Finished
            }
        }
    }

    // ==================== Teardown ====================

    /// Stops everything for session teardown and releases the output.
    pub fn shutdown(&mut self) {
        self.stop();
        self.synth.release_output();
    }

    /// Limits a logical time to `[0, total]`.
    fn clamp_to_score(&self, seconds: f64) -> f64 {
        seconds.max(0.0).min(self.total_duration)
    }

    /// Cancels the position loop and revokes triggers that have not sounded.
    fn halt(&mut self) {
        self.position_loop = None;

        if !self.config.cancel_pending_on_halt {
            self.pending.clear();
            return;
        }

        let device_now = self.synth.device_clock_now();
        let mut revoked = 0usize;
        for trigger in self.pending.drain(..) {
            if trigger.at_device_time > device_now && self.synth.cancel(trigger.id) {
                revoked += 1;
            }
        }
        if revoked > 0 {
            debug!(revoked, "revoked pending triggers");
        }
    }
}

impl<S: Synthesis> Drop for Transport<S> {
    fn drop(&mut self) {
        self.halt();
    }
}
