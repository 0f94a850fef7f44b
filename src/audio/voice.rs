//! Scheduled voices and the mixer that renders them.
//!
//! A voice is one trigger: a start frame on the mixer clock, a length, and
//! a sound recipe. The mixer owns the device clock (frames rendered so far),
//! so a voice scheduled for time `t` starts exactly at frame `t * rate`.

use super::synthesis::{Timbre, TriggerId};
use crate::score::DrumKind;
use std::f64::consts::TAU;

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Attack ramp of pitched tones.
const TONE_ATTACK_SECONDS: f64 = 0.01;

/// Level exponential envelopes decay towards.
const ENVELOPE_FLOOR: f64 = 0.001;

const KICK_SECONDS: f64 = 0.25;
const KICK_SWEEP_SECONDS: f64 = 0.15;
const KICK_DECAY_SECONDS: f64 = 0.2;
const KICK_START_HZ: f64 = 150.0;
const KICK_END_HZ: f64 = 40.0;
const KICK_GAIN: f64 = 0.4;

const SNARE_SECONDS: f64 = 0.2;
const SNARE_DECAY_SECONDS: f64 = 0.15;
const SNARE_GAIN: f64 = 0.3;
const SNARE_BODY_HZ: f64 = 200.0;
const SNARE_BODY_SECONDS: f64 = 0.05;
const SNARE_BODY_GAIN: f64 = 0.1;

/// Steps an oscillator phase, returning the value before the step.
fn advance_phase(phase: &mut f64, frequency: f64, sample_rate: f64) -> f64 {
    let current = *phase;
    *phase = (*phase + frequency / sample_rate).fract();
    current
}

/// Exponential ramp from `from` to `to` over `length`, held after.
fn exp_ramp(from: f64, to: f64, t: f64, length: f64) -> f64 {
    let x = (t / length).clamp(0.0, 1.0);
    from * (to / from).powf(x)
}

/// Attack/decay envelope of a pitched tone.
///
/// Linear rise to `gain` over 10 ms, then exponential decay so the level
/// reaches the floor at `duration`.
fn tone_envelope(t: f64, duration: f64, gain: f64) -> f64 {
    if gain <= ENVELOPE_FLOOR {
        return gain.max(0.0);
    }
    if t < TONE_ATTACK_SECONDS || duration <= TONE_ATTACK_SECONDS {
        return gain * (t / TONE_ATTACK_SECONDS).min(1.0);
    }
    exp_ramp(
        gain,
        ENVELOPE_FLOOR,
        t - TONE_ATTACK_SECONDS,
        duration - TONE_ATTACK_SECONDS,
    )
}

fn oscillator(timbre: Timbre, phase: f64) -> f64 {
    match timbre {
        Timbre::Sine => (TAU * phase).sin(),
        Timbre::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
        Timbre::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Timbre::Sawtooth => 2.0 * phase - 1.0,
    }
}

enum VoiceKind {
    Tone {
        frequency: f64,
        duration: f64,
        timbre: Timbre,
        gain: f64,
    },
    Kick,
    Snare {
        rng: oorandom::Rand32,
    },
}

struct Voice {
    id: TriggerId,
    start_frame: u64,
    length_frames: u64,
    kind: VoiceKind,
    /// Oscillator phase in cycles, kept in [0, 1).
    phase: f64,
}

impl Voice {
    fn end_frame(&self) -> u64 {
        self.start_frame.saturating_add(self.length_frames)
    }

    /// Renders the sample `elapsed` frames after the voice started.
    fn next_sample(&mut self, elapsed: u64, sample_rate: f64) -> f64 {
        let t = elapsed as f64 / sample_rate;
        match self.kind {
            VoiceKind::Tone {
                frequency,
                duration,
                timbre,
                gain,
            } => {
                let phase = advance_phase(&mut self.phase, frequency, sample_rate);
                oscillator(timbre, phase) * tone_envelope(t, duration, gain)
            }
            VoiceKind::Kick => {
                let frequency = exp_ramp(KICK_START_HZ, KICK_END_HZ, t, KICK_SWEEP_SECONDS);
                let phase = advance_phase(&mut self.phase, frequency, sample_rate);
                (TAU * phase).sin() * exp_ramp(KICK_GAIN, ENVELOPE_FLOOR, t, KICK_DECAY_SECONDS)
            }
            VoiceKind::Snare { ref mut rng } => {
                let fade = (1.0 - t / SNARE_SECONDS).max(0.0);
                let noise = (rng.rand_float() as f64 * 2.0 - 1.0) * fade * fade;
                let rattle =
                    noise * exp_ramp(SNARE_GAIN, ENVELOPE_FLOOR, t, SNARE_DECAY_SECONDS);
                let phase = advance_phase(&mut self.phase, SNARE_BODY_HZ, sample_rate);
                let body = if t < SNARE_BODY_SECONDS {
                    (TAU * phase).sin() * tone_envelope(t, SNARE_BODY_SECONDS, SNARE_BODY_GAIN)
                } else {
                    0.0
                };
                rattle + body
            }
        }
    }
}

/// Renders scheduled voices and keeps the device clock.
pub struct Mixer {
    sample_rate: u32,
    /// Frames rendered so far; this *is* the device clock.
    clock_frames: u64,
    voices: Vec<Voice>,
    next_id: u64,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            clock_frames: 0,
            voices: Vec::new(),
            next_id: 1,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far.
    pub fn clock_frames(&self) -> u64 {
        self.clock_frames
    }

    /// Device clock in seconds.
    pub fn clock_seconds(&self) -> f64 {
        self.clock_frames as f64 / self.sample_rate as f64
    }

    /// Number of voices waiting or sounding.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn seconds_to_frames(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate as f64).round() as u64
    }

    fn push(&mut self, at_seconds: f64, length_seconds: f64, kind: VoiceKind) -> TriggerId {
        let id = TriggerId::new(self.next_id);
        self.next_id += 1;

        // Late triggers start now rather than mid-sound
        let start_frame = self.seconds_to_frames(at_seconds).max(self.clock_frames);
        let length_frames = self.seconds_to_frames(length_seconds).max(1);
        self.voices.push(Voice {
            id,
            start_frame,
            length_frames,
            kind,
            phase: 0.0,
        });
        id
    }

    /// Schedules a pitched tone.
    pub fn add_tone(
        &mut self,
        frequency: f64,
        at_seconds: f64,
        duration: f64,
        timbre: Timbre,
        gain: f32,
    ) -> TriggerId {
        let duration = duration.max(0.0);
        self.push(
            at_seconds,
            duration,
            VoiceKind::Tone {
                frequency,
                duration,
                timbre,
                gain: gain as f64,
            },
        )
    }

    /// Schedules a drum hit.
    pub fn add_percussion(&mut self, kind: DrumKind, at_seconds: f64) -> TriggerId {
        match kind {
            DrumKind::Kick => self.push(at_seconds, KICK_SECONDS, VoiceKind::Kick),
            DrumKind::Snare => {
                let seed = self.next_id;
                self.push(
                    at_seconds,
                    SNARE_SECONDS,
                    VoiceKind::Snare {
                        rng: oorandom::Rand32::new(seed),
                    },
                )
            }
        }
    }

    /// Removes a voice that has not started yet.
    pub fn cancel(&mut self, id: TriggerId) -> bool {
        let clock = self.clock_frames;
        let before = self.voices.len();
        self.voices
            .retain(|v| !(v.id == id && v.start_frame > clock));
        self.voices.len() != before
    }

    /// Removes every voice, sounding or not.
    pub fn clear(&mut self) {
        self.voices.clear();
    }

    /// Renders the next `out.len()` mono frames and advances the clock.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let block_start = self.clock_frames;
        let block_end = block_start + out.len() as u64;
        let sample_rate = self.sample_rate as f64;

        for voice in &mut self.voices {
            let voice_end = voice.end_frame();
            if voice.start_frame >= block_end || voice_end <= block_start {
                continue;
            }
            let from = voice.start_frame.max(block_start);
            let to = voice_end.min(block_end);
            for frame in from..to {
                let sample = voice.next_sample(frame - voice.start_frame, sample_rate);
                out[(frame - block_start) as usize] += sample as f32;
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        self.clock_frames = block_end;
        self.voices.retain(|v| v.end_frame() > block_end);
    }
}
