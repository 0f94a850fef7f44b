//! scoreplay - A terminal score editor and player.
//!
//! This library provides the score model, the playback engine (transport,
//! scheduler, position loop), and the synthesis backends.

pub mod app;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod score;
pub mod timing;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use audio::{export_to_wav, OutputDevice, RecordingSynth, Synthesis};
pub use config::EngineConfig;
pub use engine::{FrameOutcome, PlaybackState, Transport};
pub use error::{EngineError, ScoreError};
pub use score::Score;
pub use timing::Timeline;
