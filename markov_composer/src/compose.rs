// End-to-end composition from a trained model.
//
// `compose_score` runs the generation half of the pipeline:
//
//   model -> SequenceSampler -> GeneratedSequence (worst-case supply)
//         -> assign_rhythm (melody, extends lazily if ever needed)
//   scale -> chord_progression (harmony)
//         -> percussion_pattern
//   all three -> assemble_score
//
// One `ComposerRng` drives everything, in that order: context and
// continuation draws first, then one rhythm pattern draw per measure
// interleaved with any extension draws. The same model, config and seed
// therefore always give the same `Composition`.

use crate::config::ComposerConfig;
use crate::error::ComposeError;
use crate::harmony::chord_progression;
use crate::markov::TransitionModel;
use crate::percussion::percussion_pattern;
use crate::rhythm::{SampledSupply, assign_rhythm};
use crate::sampler::{GeneratedSequence, SequenceSampler};
use crate::score::{Score, assemble_score};
use markov_composer_prng::ComposerRng;
use tracing::info;

/// Counters from one run, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub contexts: usize,
    /// Tokens sampled up front.
    pub tokens_generated: usize,
    /// Tokens sampled on demand because the rhythm needed more.
    pub tokens_extended: usize,
    /// Melody notes actually placed.
    pub tokens_consumed: usize,
    pub fallbacks: usize,
}

#[derive(Debug, Clone)]
pub struct Composition {
    pub score: Score,
    /// Every token the sampler produced, consumed or not.
    pub sequence: GeneratedSequence,
    pub stats: GenerationStats,
}

pub fn compose_score(
    model: &TransitionModel,
    config: &ComposerConfig,
    rng: &mut ComposerRng,
) -> Result<Composition, ComposeError> {
    config.validate()?;
    let scale = config.scale()?;
    let library = config.rhythm_library()?;

    let mut sampler = SequenceSampler::new(model, config.fallback)?;
    let supply_len = library.required_supply(config.measures);
    let sequence = sampler.generate(supply_len, rng);

    let mut supply = SampledSupply::new(sequence, sampler);
    let melody = assign_rhythm(&mut supply, &library, config.measures, rng)?;
    let harmony = chord_progression(&scale, config.measures);
    let percussion = percussion_pattern(config.measures);

    let stats = GenerationStats {
        contexts: model.len(),
        tokens_generated: supply_len,
        tokens_extended: supply.extended(),
        tokens_consumed: supply.consumed(),
        fallbacks: supply.sampler().fallback_count(),
    };
    let score = assemble_score(melody, harmony, percussion, config.tempo_bpm)?;

    info!(
        measures = config.measures,
        key = %config.key,
        mode = %config.mode,
        notes = stats.tokens_consumed,
        fallbacks = stats.fallbacks,
        "composed score"
    );
    Ok(Composition {
        score,
        sequence: supply.into_sequence(),
        stats,
    })
}
