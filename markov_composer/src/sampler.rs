// Sequence sampling from a trained transition model.
//
// The sampler walks the chain one token at a time. It opens by picking a
// context uniformly from the model's keys and emitting both of its tokens,
// then repeatedly looks up the last two emitted tokens and draws the next
// one from that context's distribution.
//
// A generated pair need not have been seen during training: the next token
// is drawn from the continuations of the *current* pair, and the pair it
// forms with its predecessor may never have appeared in the source. Such a
// lookup miss is handled by `FallbackPolicy` and never surfaces as an error,
// so a sampler always produces exactly as many tokens as requested.
//
// Tokens are produced lazily (`next_token`), which lets the rhythm assigner
// pull more pitches mid-measure without restarting the chain. All choices
// draw from the caller's `ComposerRng`; contexts and distributions iterate
// in `BTreeMap` order, so a seed fixes the whole output.

use crate::error::ComposeError;
use crate::markov::{Context, TransitionModel};
use crate::pitch::PitchToken;
use markov_composer_prng::ComposerRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// What to do when the current pair was never seen during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Emit a token chosen uniformly from every token the model ever saw as
    /// a continuation, then carry on from the new pair.
    #[default]
    Continuation,
    /// Start a new chain segment: pick a known context uniformly and emit
    /// both of its tokens.
    Reseed,
}

impl FromStr for FallbackPolicy {
    type Err = ComposeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "continuation" => Ok(FallbackPolicy::Continuation),
            "reseed" => Ok(FallbackPolicy::Reseed),
            other => Err(ComposeError::InvalidConfig(format!(
                "unknown fallback policy {other:?}"
            ))),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Continuation => f.write_str("continuation"),
            FallbackPolicy::Reseed => f.write_str("reseed"),
        }
    }
}

/// An append-only run of generated tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedSequence {
    tokens: Vec<PitchToken>,
}

impl GeneratedSequence {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<PitchToken> {
        self.tokens.get(index).copied()
    }

    pub fn as_slice(&self) -> &[PitchToken] {
        &self.tokens
    }

    fn push(&mut self, token: PitchToken) {
        self.tokens.push(token);
    }
}

/// Lazily walks a `TransitionModel`.
#[derive(Debug, Clone)]
pub struct SequenceSampler<'m> {
    model: &'m TransitionModel,
    /// Model keys in order, for uniform context choice.
    contexts: Vec<Context>,
    vocabulary: Vec<PitchToken>,
    policy: FallbackPolicy,
    history: Option<Context>,
    /// Tokens of a freshly chosen context that have not been emitted yet.
    pending: VecDeque<PitchToken>,
    fallbacks: usize,
}

impl<'m> SequenceSampler<'m> {
    pub fn new(model: &'m TransitionModel, policy: FallbackPolicy) -> Result<Self, ComposeError> {
        let contexts: Vec<Context> = model.contexts().copied().collect();
        let vocabulary = model.continuation_vocabulary();
        if contexts.is_empty() || vocabulary.is_empty() {
            return Err(ComposeError::NoObservedContext);
        }
        Ok(SequenceSampler {
            model,
            contexts,
            vocabulary,
            policy,
            history: None,
            pending: VecDeque::with_capacity(2),
            fallbacks: 0,
        })
    }

    /// How many times an unseen context forced the fallback policy.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks
    }

    /// Produce the next token of the chain. Never fails.
    pub fn next_token(&mut self, rng: &mut ComposerRng) -> PitchToken {
        if let Some(token) = self.pending.pop_front() {
            return token;
        }
        let Some(history) = self.history else {
            return self.start_segment(rng);
        };

        let model = self.model;
        let drawn = model.distribution(&history).and_then(|dist| {
            let weights: Vec<f64> = dist.values().copied().collect();
            rng.weighted_index(&weights)
                .and_then(|i| dist.keys().nth(i).copied())
        });

        match drawn {
            Some(token) => {
                self.history = Some((history.1, token));
                token
            }
            None => self.fall_back(history, rng),
        }
    }

    /// Generate exactly `len` tokens, continuing this sampler's chain.
    pub fn generate(&mut self, len: usize, rng: &mut ComposerRng) -> GeneratedSequence {
        let mut sequence = GeneratedSequence::default();
        self.extend(&mut sequence, len, rng);
        sequence
    }

    /// Append exactly `count` more tokens to `sequence`.
    pub fn extend(
        &mut self,
        sequence: &mut GeneratedSequence,
        count: usize,
        rng: &mut ComposerRng,
    ) {
        for _ in 0..count {
            let token = self.next_token(rng);
            sequence.push(token);
        }
    }

    /// Pick a context uniformly, emit its first token and queue the second.
    fn start_segment(&mut self, rng: &mut ComposerRng) -> PitchToken {
        let context = self.contexts[rng.range_usize(0, self.contexts.len())];
        self.history = Some(context);
        self.pending.push_back(context.1);
        context.0
    }

    fn fall_back(&mut self, history: Context, rng: &mut ComposerRng) -> PitchToken {
        self.fallbacks += 1;
        debug!(
            first = %history.0,
            second = %history.1,
            policy = %self.policy,
            "unseen context, applying fallback"
        );
        match self.policy {
            FallbackPolicy::Continuation => {
                let token = self.vocabulary[rng.range_usize(0, self.vocabulary.len())];
                self.history = Some((history.1, token));
                token
            }
            FallbackPolicy::Reseed => self.start_segment(rng),
        }
    }
}

/// One-shot helper: build a sampler and generate `len` tokens.
pub fn generate_sequence(
    model: &TransitionModel,
    len: usize,
    policy: FallbackPolicy,
    rng: &mut ComposerRng,
) -> Result<GeneratedSequence, ComposeError> {
    let mut sampler = SequenceSampler::new(model, policy)?;
    Ok(sampler.generate(len, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::p;

    fn train(text: &str) -> TransitionModel {
        let tokens: Vec<PitchToken> = text.split_whitespace().map(p).collect();
        TransitionModel::train(&tokens)
    }

    fn names(sequence: &GeneratedSequence) -> Vec<String> {
        sequence.as_slice().iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn arpeggio_cycles_for_every_seed() {
        let model = train("C4 E4 G4 C4 E4 G4 C4");
        let cycle = ["C4", "E4", "G4"];
        for seed in 0..50 {
            let mut rng = ComposerRng::new(seed);
            let seq = generate_sequence(&model, 5, FallbackPolicy::Continuation, &mut rng).unwrap();
            assert_eq!(seq.len(), 5);
            // The start point depends on the seed; after that the cycle is fixed.
            let start = cycle.iter().position(|c| *c == names(&seq)[0]).unwrap();
            for (i, name) in names(&seq).iter().enumerate() {
                assert_eq!(name, cycle[(start + i) % 3], "seed {seed}");
            }
        }
    }

    #[test]
    fn exact_length_through_unseen_contexts() {
        // (E4,F4) is never a training context, so every walk hits the fallback.
        let model = train("C4 D4 E4 F4");
        for policy in [FallbackPolicy::Continuation, FallbackPolicy::Reseed] {
            for seed in 0..100 {
                let mut rng = ComposerRng::new(seed);
                let mut sampler = SequenceSampler::new(&model, policy).unwrap();
                let seq = sampler.generate(64, &mut rng);
                assert_eq!(seq.len(), 64);
                assert!(sampler.fallback_count() > 0, "{policy} seed {seed}");
            }
        }
    }

    #[test]
    fn zero_and_one_length_requests() {
        let model = train("C4 D4 E4 C4 D4");
        let mut rng = ComposerRng::new(3);
        let empty = generate_sequence(&model, 0, FallbackPolicy::Continuation, &mut rng).unwrap();
        assert!(empty.is_empty());
        let single = generate_sequence(&model, 1, FallbackPolicy::Continuation, &mut rng).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn three_token_model_is_seed_independent() {
        let model = train("A3 B3 C4");
        for policy in [FallbackPolicy::Continuation, FallbackPolicy::Reseed] {
            let runs: Vec<GeneratedSequence> = (0..30)
                .map(|seed| {
                    let mut rng = ComposerRng::new(seed);
                    generate_sequence(&model, 12, policy, &mut rng).unwrap()
                })
                .collect();
            assert_eq!(runs[0].len(), 12);
            assert!(runs.iter().all(|r| r == &runs[0]), "{policy} varies by seed");
        }
    }

    #[test]
    fn three_token_model_outputs() {
        let model = train("A3 B3 C4");
        let mut rng = ComposerRng::new(11);
        let cont = generate_sequence(&model, 6, FallbackPolicy::Continuation, &mut rng).unwrap();
        assert_eq!(names(&cont), ["A3", "B3", "C4", "C4", "C4", "C4"]);
        let reseed = generate_sequence(&model, 7, FallbackPolicy::Reseed, &mut rng).unwrap();
        assert_eq!(names(&reseed), ["A3", "B3", "C4", "A3", "B3", "C4", "A3"]);
    }

    #[test]
    fn same_seed_same_sequence() {
        let model = train("C4 D4 E4 D4 C4 D4 G4 E4 D4 C4 E4 G4 C5 G4 E4 D4 C4");
        let run = |seed| {
            let mut rng = ComposerRng::new(seed);
            generate_sequence(&model, 200, FallbackPolicy::Continuation, &mut rng).unwrap()
        };
        assert_eq!(run(77), run(77));
    }

    #[test]
    fn extend_continues_the_chain() {
        let model = train("C4 E4 G4 C4 E4 G4 C4");
        let mut rng = ComposerRng::new(9);
        let mut sampler = SequenceSampler::new(&model, FallbackPolicy::Continuation).unwrap();
        let mut seq = sampler.generate(4, &mut rng);
        sampler.extend(&mut seq, 5, &mut rng);
        assert_eq!(seq.len(), 9);
        let cycle = ["C4", "E4", "G4"];
        let start = cycle.iter().position(|c| *c == names(&seq)[0]).unwrap();
        for (i, name) in names(&seq).iter().enumerate() {
            assert_eq!(name, cycle[(start + i) % 3]);
        }
    }

    #[test]
    fn generated_tokens_come_from_the_model() {
        let model = train("C4 D4 E4 F4 G4 F4 E4 D4 C4 D4 F4 A4");
        let mut allowed: Vec<PitchToken> = model.continuation_vocabulary();
        for (a, b) in model.contexts() {
            allowed.push(*a);
            allowed.push(*b);
        }
        let mut rng = ComposerRng::new(5);
        let seq = generate_sequence(&model, 300, FallbackPolicy::Continuation, &mut rng).unwrap();
        assert!(seq.as_slice().iter().all(|t| allowed.contains(t)));
    }

    #[test]
    fn empty_model_is_rejected() {
        let model = TransitionModel::default();
        assert!(matches!(
            SequenceSampler::new(&model, FallbackPolicy::Continuation),
            Err(ComposeError::NoObservedContext)
        ));
    }

    #[test]
    fn policy_names() {
        assert_eq!("reseed".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::Reseed);
        assert!("restart".parse::<FallbackPolicy>().is_err());
        assert_eq!(FallbackPolicy::default(), FallbackPolicy::Continuation);
    }
}
