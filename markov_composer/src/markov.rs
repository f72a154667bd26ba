// Second-order Markov transition model over spelled pitch tokens.
//
// Training scans every window of three consecutive tokens, counts how often
// each third token follows each ordered pair, then normalises per pair so
// every distribution sums to 1.0. Counting is integer, and normalisation
// divides each count by its own context's total once, so the result is a
// pure aggregation of the input and does not depend on scan order.
//
// Both levels are `BTreeMap`s so iteration over contexts and over a
// distribution's tokens is ordered. The sampler's weighted walk relies on
// that order to stay reproducible for a given seed.
//
// Models can be saved to and loaded from JSON. Contexts are written as
// `"C4,E4"` string keys because JSON object keys must be strings.

use crate::error::ComposeError;
use crate::event::NoteEvent;
use crate::extract::extract_pitches;
use crate::pitch::PitchToken;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

/// Two consecutive tokens, used as the chain state.
pub type Context = (PitchToken, PitchToken);

/// Next-token probabilities for one context.
pub type Distribution = BTreeMap<PitchToken, f64>;

/// Tolerance used when validating loaded distributions.
const LOAD_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionModel {
    transitions: BTreeMap<Context, Distribution>,
}

/// On-disk JSON shape.
#[derive(Serialize, Deserialize)]
struct SerializedModel {
    contexts: BTreeMap<String, Distribution>,
}

impl TransitionModel {
    /// Count and normalise all (context, next) triples in `tokens`.
    ///
    /// Fewer than three tokens give an empty model.
    pub fn train(tokens: &[PitchToken]) -> Self {
        let mut counts: BTreeMap<Context, BTreeMap<PitchToken, u64>> = BTreeMap::new();
        for window in tokens.windows(3) {
            *counts
                .entry((window[0], window[1]))
                .or_default()
                .entry(window[2])
                .or_insert(0) += 1;
        }

        let transitions = counts
            .into_iter()
            .map(|(context, nexts)| {
                let total: u64 = nexts.values().sum();
                let distribution = nexts
                    .into_iter()
                    .map(|(token, count)| (token, count as f64 / total as f64))
                    .collect();
                (context, distribution)
            })
            .collect();

        TransitionModel { transitions }
    }

    /// Number of distinct contexts.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// All contexts, in order.
    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.transitions.keys()
    }

    pub fn distribution(&self, context: &Context) -> Option<&Distribution> {
        self.transitions.get(context)
    }

    /// Every token that was ever observed as a continuation, sorted and
    /// without duplicates.
    pub fn continuation_vocabulary(&self) -> Vec<PitchToken> {
        let set: BTreeSet<PitchToken> = self
            .transitions
            .values()
            .flat_map(|d| d.keys().copied())
            .collect();
        set.into_iter().collect()
    }

    pub fn to_json(&self) -> Result<String, ComposeError> {
        let serialized = SerializedModel {
            contexts: self
                .transitions
                .iter()
                .map(|((a, b), d)| (format!("{a},{b}"), d.clone()))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&serialized)?)
    }

    /// Parse a model written by `to_json`, checking that every distribution
    /// is non-empty and sums to one.
    pub fn from_json(json: &str) -> Result<Self, ComposeError> {
        let serialized: SerializedModel = serde_json::from_str(json)?;
        let mut transitions = BTreeMap::new();
        for (key, distribution) in serialized.contexts {
            let (first, second) = key
                .split_once(',')
                .ok_or_else(|| ComposeError::InvalidConfig(format!("bad context key {key:?}")))?;
            let total: f64 = distribution.values().sum();
            let in_range = distribution.values().all(|&p| p > 0.0 && p <= 1.0);
            if distribution.is_empty() || !in_range || (total - 1.0).abs() > LOAD_TOLERANCE {
                return Err(ComposeError::InvalidConfig(format!(
                    "distribution for {key:?} is not a probability distribution"
                )));
            }
            transitions.insert((first.parse()?, second.parse()?), distribution);
        }
        Ok(TransitionModel { transitions })
    }

    pub fn save(&self, path: &Path) -> Result<(), ComposeError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ComposeError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}

/// Extract single pitches from a track and train a model on them.
pub fn train_from_events(events: &[NoteEvent]) -> Result<TransitionModel, ComposeError> {
    let tokens = extract_pitches(events)?;
    let model = TransitionModel::train(&tokens);
    info!(
        tokens = tokens.len(),
        contexts = model.len(),
        "trained transition model"
    );
    Ok(model)
}
