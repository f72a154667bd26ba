// Error taxonomy for the composer.
//
// Every fallible library operation returns `Result<_, ComposeError>`. All
// variants are fatal to a run: the pipeline aborts before anything is handed
// to the MIDI writer, so a failed run never leaves a partial output file.
//
// An unseen context during sampling has no variant: the sampler's fallback
// policy (see sampler.rs) handles it and it never surfaces to callers.

use crate::score::Instrument;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    /// Fewer than three single pitches survived extraction, so not even one
    /// (context, next) triple can be formed.
    #[error("training data has {found} usable pitches; at least 3 are required")]
    EmptyTrainingData { found: usize },

    #[error("transition model has no contexts to sample from")]
    NoObservedContext,

    /// The rhythm assigner ran out of pitches and its supply could not
    /// produce more.
    #[error("pitch supply exhausted in measure {measure} after {consumed} pitches")]
    PitchSupplyExhausted { measure: usize, consumed: usize },

    #[error("{instrument} track lasts {actual} ticks, expected {expected}")]
    TrackLengthMismatch {
        instrument: Instrument,
        expected: u64,
        actual: u64,
    },

    #[error("invalid pitch {0:?}")]
    InvalidPitch(String),

    #[error("duration {0} is not a positive multiple of 1/480 quarter note")]
    InvalidDuration(f64),

    /// A rhythm pattern is empty or does not fill exactly one measure.
    #[error("rhythm pattern {index} lasts {total} ticks instead of one measure")]
    InvalidRhythmPattern { index: usize, total: u64 },

    #[error("rhythm library has no patterns")]
    EmptyRhythmLibrary,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("part {index} requested but the file has {available} tracks with notes")]
    MissingTrack { index: usize, available: usize },

    #[error("MIDI error: {0}")]
    Midi(#[from] midly::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
