// Rhythm assignment: turning a pitch stream into a timed melody.
//
// Each measure draws one `RhythmPattern` uniformly from the library and
// consumes one pitch per duration in it. Patterns hold different numbers of
// notes (the defaults have 4, 5 and 6), so how many pitches M measures will
// eat is only known after the draws. The assigner therefore reads pitches
// through the `PitchSupply` trait instead of indexing a fixed list.
//
// `SampledSupply` is the production supply: it serves a pre-generated
// sequence (sized by the pipeline to `RhythmLibrary::required_supply`, the
// worst case) and, should the cursor ever reach the end, pulls further
// tokens from the same sampler so the chain simply continues. A supply
// that returns `None` makes the run fail with `PitchSupplyExhausted`.
//
// Every pattern is checked at library construction to fill exactly one
// measure, so the melody's length is `measures × MEASURE` by construction.

use crate::error::ComposeError;
use crate::pitch::PitchToken;
use crate::sampler::{GeneratedSequence, SequenceSampler};
use crate::score::{Duration, Instrument, TICKS_PER_QUARTER, Track};
use markov_composer_prng::ComposerRng;
use tracing::debug;

/// The built-in patterns, in ticks.
const DEFAULT_PATTERNS: [&[u32]; 4] = [
    &[480, 480, 480, 480],
    &[240, 480, 240, 240, 240, 480],
    &[240, 240, 480, 480, 240, 240],
    &[480, 480, 240, 240, 480],
];

/// The built-in patterns in quarter-note units, as they appear in config.
pub fn default_patterns_quarters() -> Vec<Vec<f64>> {
    DEFAULT_PATTERNS
        .iter()
        .map(|pattern| {
            pattern
                .iter()
                .map(|&t| t as f64 / TICKS_PER_QUARTER as f64)
                .collect()
        })
        .collect()
}

/// Note durations that together fill exactly one measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhythmPattern {
    durations: Vec<Duration>,
}

impl RhythmPattern {
    pub fn durations(&self) -> &[Duration] {
        &self.durations
    }

    /// Number of notes, i.e. pitches consumed per use.
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }
}

/// A non-empty set of valid patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhythmLibrary {
    patterns: Vec<RhythmPattern>,
}

impl RhythmLibrary {
    /// Validate and wrap patterns. Every pattern must be non-empty and sum to
    /// one measure; the library itself must not be empty.
    pub fn new(patterns: Vec<Vec<Duration>>) -> Result<Self, ComposeError> {
        if patterns.is_empty() {
            return Err(ComposeError::EmptyRhythmLibrary);
        }
        let measure = Duration::MEASURE.ticks() as u64;
        let mut validated = Vec::with_capacity(patterns.len());
        for (index, durations) in patterns.into_iter().enumerate() {
            let total: u64 = durations.iter().map(|d| d.ticks() as u64).sum();
            if durations.is_empty() || total != measure {
                return Err(ComposeError::InvalidRhythmPattern { index, total });
            }
            validated.push(RhythmPattern { durations });
        }
        Ok(RhythmLibrary {
            patterns: validated,
        })
    }

    /// Build from quarter-note lengths, e.g. `[[1.0, 1.0, 2.0]]`.
    pub fn from_quarters(patterns: &[Vec<f64>]) -> Result<Self, ComposeError> {
        let converted = patterns
            .iter()
            .map(|pattern| {
                pattern
                    .iter()
                    .map(|&q| Duration::from_quarters(q))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(converted)
    }

    pub fn patterns(&self) -> &[RhythmPattern] {
        &self.patterns
    }

    /// Most notes any single pattern holds.
    pub fn max_pattern_len(&self) -> usize {
        self.patterns.iter().map(RhythmPattern::len).max().unwrap_or(0)
    }

    /// Pitches that are always enough for `measures` measures, whatever
    /// patterns get drawn.
    pub fn required_supply(&self, measures: usize) -> usize {
        measures * self.max_pattern_len()
    }
}

impl Default for RhythmLibrary {
    fn default() -> Self {
        RhythmLibrary {
            patterns: DEFAULT_PATTERNS
                .iter()
                .map(|pattern| RhythmPattern {
                    durations: pattern.iter().map(|&t| Duration::from_ticks(t)).collect(),
                })
                .collect(),
        }
    }
}

/// A source of pitches for the rhythm assigner.
pub trait PitchSupply {
    /// The next pitch, or `None` if the supply is exhausted for good.
    fn next_pitch(&mut self, rng: &mut ComposerRng) -> Option<PitchToken>;
}

/// Serves a generated sequence and extends it from its sampler on demand.
#[derive(Debug)]
pub struct SampledSupply<'m> {
    sequence: GeneratedSequence,
    cursor: usize,
    sampler: SequenceSampler<'m>,
    extended: usize,
}

impl<'m> SampledSupply<'m> {
    /// `sequence` should have been produced by `sampler`, so that extending
    /// it continues the same chain.
    pub fn new(sequence: GeneratedSequence, sampler: SequenceSampler<'m>) -> Self {
        SampledSupply {
            sequence,
            cursor: 0,
            sampler,
            extended: 0,
        }
    }

    /// Pitches handed out so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Tokens that had to be sampled beyond the pre-generated sequence.
    pub fn extended(&self) -> usize {
        self.extended
    }

    pub fn sampler(&self) -> &SequenceSampler<'m> {
        &self.sampler
    }

    /// The full sequence, including any lazily added tokens.
    pub fn into_sequence(self) -> GeneratedSequence {
        self.sequence
    }
}

impl PitchSupply for SampledSupply<'_> {
    fn next_pitch(&mut self, rng: &mut ComposerRng) -> Option<PitchToken> {
        if self.cursor >= self.sequence.len() {
            self.sampler.extend(&mut self.sequence, 1, rng);
            self.extended += 1;
            debug!(cursor = self.cursor, "pitch supply extended from sampler");
        }
        let token = self.sequence.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }
}

/// Build a melody track of exactly `measures` measures.
pub fn assign_rhythm(
    supply: &mut impl PitchSupply,
    library: &RhythmLibrary,
    measures: usize,
    rng: &mut ComposerRng,
) -> Result<Track, ComposeError> {
    let mut track = Track::new(Instrument::Flute);
    let mut consumed = 0;
    for measure in 0..measures {
        let pattern = rng
            .choose(library.patterns())
            .ok_or(ComposeError::EmptyRhythmLibrary)?;
        for &duration in pattern.durations() {
            let pitch = supply
                .next_pitch(rng)
                .ok_or(ComposeError::PitchSupplyExhausted { measure, consumed })?;
            track.push_note(pitch, duration);
            consumed += 1;
        }
    }
    Ok(track)
}
