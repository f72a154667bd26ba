// Pitch extraction: from a track's note events to the training token stream.
//
// Keeps every single-pitch note in order and drops chords and rests. The
// Markov model needs at least one (context, next) triple, so fewer than
// three surviving pitches is an error.

use crate::error::ComposeError;
use crate::event::NoteEvent;
use crate::pitch::PitchToken;

/// Minimum number of tokens that yields one training triple.
pub const MIN_TRAINING_TOKENS: usize = 3;

pub fn extract_pitches(events: &[NoteEvent]) -> Result<Vec<PitchToken>, ComposeError> {
    let tokens: Vec<PitchToken> = events.iter().filter_map(NoteEvent::single_pitch).collect();
    if tokens.len() < MIN_TRAINING_TOKENS {
        return Err(ComposeError::EmptyTrainingData {
            found: tokens.len(),
        });
    }
    Ok(tokens)
}
