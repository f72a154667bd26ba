// Fixed percussion loop.
//
// Every measure is the same eight eighth notes: kick+hat, hat, snare+hat,
// hat, twice over. The pitches are the notated drum positions (G2 kick,
// D3 snare, G3 hat) and are written on the GM drum channel by midi.rs.

use crate::pitch::{Letter, PitchToken};
use crate::score::{Duration, Instrument, Track};

const KICK: PitchToken = PitchToken::natural(Letter::G, 2);
const SNARE: PitchToken = PitchToken::natural(Letter::D, 3);
const HAT: PitchToken = PitchToken::natural(Letter::G, 3);

/// Number of eighth-note hits per measure.
pub const HITS_PER_MEASURE: usize = 8;

pub fn percussion_pattern(measures: usize) -> Track {
    let mut track = Track::new(Instrument::BassDrum);
    for _ in 0..measures {
        for _ in 0..2 {
            track.push_chord(vec![KICK, HAT], Duration::EIGHTH);
            track.push_note(HAT, Duration::EIGHTH);
            track.push_chord(vec![SNARE, HAT], Duration::EIGHTH);
            track.push_note(HAT, Duration::EIGHTH);
        }
    }
    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::p;
    use crate::score::ScoreEvent;

    #[test]
    fn one_measure_shape() {
        let track = percussion_pattern(1);
        assert_eq!(track.len(), HITS_PER_MEASURE);
        let shape: Vec<Vec<PitchToken>> = track
            .events()
            .iter()
            .map(|e| e.pitches().to_vec())
            .collect();
        let kick_hat = vec![p("G2"), p("G3")];
        let snare_hat = vec![p("D3"), p("G3")];
        let hat = vec![p("G3")];
        assert_eq!(
            shape,
            [
                kick_hat.clone(),
                hat.clone(),
                snare_hat.clone(),
                hat.clone(),
                kick_hat,
                hat.clone(),
                snare_hat,
                hat
            ]
        );
        assert!(matches!(track.events()[0], ScoreEvent::Chord(_)));
        assert!(matches!(track.events()[1], ScoreEvent::Note(_)));
    }

    #[test]
    fn every_measure_is_identical() {
        let track = percussion_pattern(5);
        assert_eq!(track.len(), 5 * HITS_PER_MEASURE);
        let first = &track.events()[..HITS_PER_MEASURE];
        for measure in track.events().chunks(HITS_PER_MEASURE) {
            assert_eq!(measure, first);
        }
        assert_eq!(track.total_ticks(), 5 * Duration::MEASURE.ticks() as u64);
    }
}
