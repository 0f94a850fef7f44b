//! Sound output for the playback engine.
//!
//! This module provides the synthesis capability the transport drives:
//! - The `Synthesis` trait (what the engine needs from a sound device)
//! - A voice mixer rendering tones, kicks, and snares
//! - Real-time output via rodio
//! - Offline WAV export via hound
//! - A recording implementation for tests and dry runs

pub mod device;
pub mod export;
pub mod recording;
pub mod synthesis;
pub mod voice;

pub use device::OutputDevice;
pub use export::{export_to_wav, render_score, OfflineRenderer};
pub use recording::{RecordedTrigger, RecordingSynth, TriggerSound};
pub use synthesis::{Synthesis, Timbre, TriggerId};
pub use voice::{Mixer, SAMPLE_RATE};
