//! Error types for score loading, validation, and playback.
//!
//! Invalid events inside an otherwise valid score are never errors: the
//! scheduler skips them. Errors are reserved for things the caller has to
//! report to the user (a file that will not parse, or no audio output).

use thiserror::Error;

/// Errors produced while parsing or validating a score.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// The score file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The score JSON could not be parsed.
    #[error("score parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("bpm must be between 40 and 240, got {0}")]
    BpmOutOfRange(u32),

    #[error("invalid time signature {0}/{1}")]
    InvalidTimeSignature(u32, u32),

    #[error("bars must be between 1 and 32, got {0}")]
    BarsOutOfRange(u32),

    #[error("rhythm beat {beat} is outside the score ({total_beats} beats)")]
    RhythmBeatOutOfRange { beat: u32, total_beats: u32 },

    #[error("rhythm beat {0} has more than one event")]
    DuplicateRhythmBeat(u32),

    #[error("chord bar {bar} is outside the score ({bars} bars)")]
    ChordBarOutOfRange { bar: u32, bars: u32 },

    #[error("bar {0} has more than one chord")]
    DuplicateChordBar(u32),

    #[error("melody bar {bar} is outside the score ({bars} bars)")]
    MelodyBarOutOfRange { bar: u32, bars: u32 },

    #[error("melody beat {beat} is outside the bar ({beats_per_bar} beats per bar)")]
    MelodyBeatOutOfRange { beat: u32, beats_per_bar: u32 },

    #[error("melody duration must be greater than 0, got {0}")]
    NonPositiveDuration(f64),
}

/// Errors surfaced by the playback engine and its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No audio output could be opened. Reported once at `start()`.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("invalid engine config: {0}")]
    Config(#[source] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
