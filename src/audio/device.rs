//! Real-time output device.
//!
//! Renders the shared mixer through rodio. The device clock is the number
//! of frames the output stream has pulled, so trigger times line up with
//! what is actually heard. The stream is opened lazily on the first
//! `resume_device_if_suspended()` call.

use super::synthesis::{Synthesis, Timbre, TriggerId};
use super::voice::{Mixer, SAMPLE_RATE};
use crate::error::EngineError;
use crate::score::DrumKind;
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Audio buffer size for low-latency playback.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// Audio source that pulls samples from the mixer.
/// Implements rodio's Source trait for playback.
struct MixerSource {
    mixer: Arc<Mutex<Mixer>>,
    /// Mirror of the mixer clock for lock-free reads.
    clock_frames: Arc<AtomicU64>,
    buf: Vec<f32>,
    buf_pos: usize,
    /// Current channel (0 = left, 1 = right).
    channel: usize,
}

impl MixerSource {
    fn new(mixer: Arc<Mutex<Mixer>>, clock_frames: Arc<AtomicU64>) -> Self {
        Self {
            mixer,
            clock_frames,
            buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
            channel: 0,
        }
    }
}

impl Iterator for MixerSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= BUFFER_SIZE {
            match self.mixer.lock() {
                Ok(mut mixer) => {
                    mixer.render(&mut self.buf);
                    self.clock_frames
                        .store(mixer.clock_frames(), Ordering::Release);
                }
                Err(_) => self.buf.fill(0.0),
            }
            self.buf_pos = 0;
        }

        // Mono mix duplicated to both channels: L, R, L, R, ...
        let sample = self.buf[self.buf_pos];
        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl Source for MixerSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// The default system audio output, driven by a shared mixer.
///
/// Create one per editing session and hand it to the transport.
pub struct OutputDevice {
    mixer: Arc<Mutex<Mixer>>,
    clock_frames: Arc<AtomicU64>,
    /// Audio output stream and handle (must be kept alive while open).
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl OutputDevice {
    /// Creates a device without opening the audio output yet.
    pub fn new() -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new(SAMPLE_RATE))),
            clock_frames: Arc::new(AtomicU64::new(0)),
            output: None,
        }
    }

    /// Whether the output stream is currently open.
    pub fn is_open(&self) -> bool {
        self.output.is_some()
    }

    /// Closes the output stream. The clock stops until the next resume.
    pub fn suspend(&mut self) {
        if self.output.take().is_some() {
            tracing::debug!("audio output suspended");
        }
    }

    /// Drops every scheduled and sounding voice.
    pub fn silence(&self) {
        self.lock_mixer().clear();
    }

    fn lock_mixer(&self) -> MutexGuard<'_, Mixer> {
        // A panic while rendering leaves the voice list usable
        self.mixer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open(&mut self) -> Result<(), EngineError> {
        let (stream, handle) = OutputStream::try_default().map_err(|e| {
            tracing::error!("Failed to open audio output: {}", e);
            EngineError::DeviceUnavailable(e.to_string())
        })?;

        let source = MixerSource::new(Arc::clone(&self.mixer), Arc::clone(&self.clock_frames));
        handle
            .play_raw(source)
            .map_err(|e| EngineError::DeviceUnavailable(e.to_string()))?;

        tracing::info!("audio output opened at {} Hz", SAMPLE_RATE);
        self.output = Some((stream, handle));
        Ok(())
    }
}

impl Default for OutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesis for OutputDevice {
    fn trigger_tone(
        &mut self,
        frequency_hz: f64,
        at_device_time: f64,
        duration_seconds: f64,
        timbre: Timbre,
        gain: f32,
    ) -> TriggerId {
        self.lock_mixer()
            .add_tone(frequency_hz, at_device_time, duration_seconds, timbre, gain)
    }

    fn trigger_percussion(&mut self, kind: DrumKind, at_device_time: f64) -> TriggerId {
        self.lock_mixer().add_percussion(kind, at_device_time)
    }

    fn device_clock_now(&self) -> f64 {
        self.clock_frames.load(Ordering::Acquire) as f64 / SAMPLE_RATE as f64
    }

    fn resume_device_if_suspended(&mut self) -> Result<(), EngineError> {
        if !self.is_open() {
            self.open()?;
        }
        Ok(())
    }

    fn cancel(&mut self, id: TriggerId) -> bool {
        self.lock_mixer().cancel(id)
    }

    fn release_output(&mut self) {
        self.silence();
        self.suspend();
    }
}
