// Data-driven composer configuration.
//
// Every tunable of a run lives in `ComposerConfig`, loadable from JSON and
// overridable from the command line (see main.rs). Missing fields take the
// defaults below: train on the second note-bearing part of a MIDI file
// (index 1, see midi.rs), accompany in C minor from C3, twenty measures at
// 80 BPM, and the four built-in rhythm patterns.
//
// `tempo_bpm` is metadata for the MIDI writer only; it has no effect on
// generation. `seed` is optional in the file so that the CLI can pick a
// fresh one per run, but the library always takes an explicit seed.

use crate::error::ComposeError;
use crate::pitch::{Letter, PitchToken};
use crate::rhythm::{RhythmLibrary, default_patterns_quarters};
use crate::sampler::FallbackPolicy;
use crate::scale::{Mode, Scale};
use crate::score::check_tempo;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposerConfig {
    /// Part mined for training pitches. Counts only MIDI tracks that hold
    /// notes, so a tempo-only conductor track is never part 0.
    pub input_track: usize,
    /// Tonic of the accompaniment scale, with octave.
    pub key: PitchToken,
    pub mode: Mode,
    /// Length of the piece in 4/4 measures.
    pub measures: usize,
    /// Rhythm library in quarter-note lengths; each must sum to 4.
    pub rhythm_patterns: Vec<Vec<f64>>,
    pub seed: Option<u64>,
    pub tempo_bpm: u16,
    pub fallback: FallbackPolicy,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        ComposerConfig {
            input_track: 1,
            key: PitchToken::natural(Letter::C, 3),
            mode: Mode::Aeolian,
            measures: 20,
            rhythm_patterns: default_patterns_quarters(),
            seed: None,
            tempo_bpm: 80,
            fallback: FallbackPolicy::Continuation,
        }
    }
}

impl ComposerConfig {
    pub fn from_json(json: &str) -> Result<Self, ComposeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ComposeError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn scale(&self) -> Result<Scale, ComposeError> {
        Scale::new(self.key, self.mode)
    }

    pub fn rhythm_library(&self) -> Result<RhythmLibrary, ComposeError> {
        RhythmLibrary::from_quarters(&self.rhythm_patterns)
    }

    /// Check everything a run needs before any generation starts.
    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.measures == 0 {
            return Err(ComposeError::InvalidConfig("measures must be at least 1".into()));
        }
        check_tempo(self.tempo_bpm)?;
        self.scale()?;
        self.rhythm_library()?;
        Ok(())
    }
}
