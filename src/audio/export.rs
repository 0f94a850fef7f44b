//! Audio export functionality.
//!
//! Bounces a score to a WAV file by running the same scheduling pass the
//! transport uses against an offline mixer whose clock starts at zero.

use super::synthesis::{Synthesis, Timbre, TriggerId};
use super::voice::{Mixer, SAMPLE_RATE};
use crate::config::EngineConfig;
use crate::engine::schedule_from;
use crate::error::EngineError;
use crate::score::{DrumKind, Score};
use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Buffer size for rendering chunks.
/// Larger buffers are more efficient but use more memory.
const RENDER_BUFFER_SIZE: usize = 4096;

/// A synthesis capability that renders faster than real time.
///
/// The device clock is the number of frames rendered so far.
pub struct OfflineRenderer {
    mixer: Mixer,
}

impl OfflineRenderer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            mixer: Mixer::new(sample_rate),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    /// Renders the next block of mono samples.
    pub fn render(&mut self, out: &mut [f32]) {
        self.mixer.render(out);
    }
}

impl Synthesis for OfflineRenderer {
    fn trigger_tone(
        &mut self,
        frequency_hz: f64,
        at_device_time: f64,
        duration_seconds: f64,
        timbre: Timbre,
        gain: f32,
    ) -> TriggerId {
        self.mixer
            .add_tone(frequency_hz, at_device_time, duration_seconds, timbre, gain)
    }

    fn trigger_percussion(&mut self, kind: DrumKind, at_device_time: f64) -> TriggerId {
        self.mixer.add_percussion(kind, at_device_time)
    }

    fn device_clock_now(&self) -> f64 {
        self.mixer.clock_seconds()
    }

    fn resume_device_if_suspended(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn cancel(&mut self, id: TriggerId) -> bool {
        self.mixer.cancel(id)
    }
}

/// Renders a whole score to mono samples at `SAMPLE_RATE`.
///
/// The result covers the score plus the configured silence tail.
pub fn render_score(score: &Score, config: &EngineConfig) -> Vec<f32> {
    let mut renderer = OfflineRenderer::new(SAMPLE_RATE);
    schedule_from(score, 0.0, 0.0, &mut renderer, config);

    let seconds = score.total_duration_seconds() + config.export_tail_seconds.max(0.0);
    let total_samples = (seconds * SAMPLE_RATE as f64).round() as usize;
    let mut samples = vec![0.0f32; total_samples];
    for chunk in samples.chunks_mut(RENDER_BUFFER_SIZE) {
        renderer.render(chunk);
    }
    samples
}

/// Exports a score to a 16-bit stereo WAV file.
///
/// # Arguments
///
/// * `score` - The score to export
/// * `config` - Engine settings (gains, timbres, tail length)
/// * `output_path` - Path for the output WAV file
/// * `progress_callback` - Optional callback for progress updates (0.0 to 1.0)
///
/// # Errors
///
/// Returns error if the output file cannot be created or written.
pub fn export_to_wav<P, F>(
    score: &Score,
    config: &EngineConfig,
    output_path: P,
    mut progress_callback: Option<F>,
) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(f32),
{
    let samples = render_score(score, config);

    let spec = WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(output_path.as_ref(), spec).with_context(|| {
        format!(
            "Failed to create output WAV file: {}",
            output_path.as_ref().display()
        )
    })?;

    let total = samples.len().max(1);
    for (written, chunk) in samples.chunks(RENDER_BUFFER_SIZE).enumerate() {
        for &sample in chunk {
            // Convert f32 (-1.0 to 1.0) to i16, same value on both channels
            let value = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(value)?;
            writer.write_sample(value)?;
        }

        if let Some(ref mut callback) = progress_callback {
            let done = ((written + 1) * RENDER_BUFFER_SIZE).min(total);
            callback(done as f32 / total as f32);
        }
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    tracing::info!(
        "exported {:.2}s of audio to {}",
        samples.len() as f64 / SAMPLE_RATE as f64,
        output_path.as_ref().display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(buf: &[f32]) -> f32 {
        buf.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_render_length_and_placement() {
        let mut score = Score::default();
        score.bars = 1;
        score.set_rhythm(2, Some(DrumKind::Kick));
        let config = EngineConfig::default();

        let samples = render_score(&score, &config);
        assert_eq!(samples.len(), 3 * SAMPLE_RATE as usize);

        // Beat 2 at 120 BPM is one second in
        let one_second = SAMPLE_RATE as usize;
        assert_eq!(peak(&samples[..one_second]), 0.0);
        assert!(peak(&samples[one_second..one_second + 4410]) > 0.05);
    }

    #[test]
    fn test_export_writes_wav() {
        let mut score = Score::default();
        score.bars = 1;
        score.set_chord(0, Some("Am"));
        let path = std::env::temp_dir().join("scoreplay_export_test.wav");

        let mut last_progress = 0.0;
        export_to_wav(
            &score,
            &EngineConfig::default(),
            &path,
            Some(|p: f32| last_progress = p),
        )
        .unwrap();
        assert!((last_progress - 1.0).abs() < 1e-6);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.duration(), 3 * SAMPLE_RATE);
        std::fs::remove_file(&path).ok();
    }
}
