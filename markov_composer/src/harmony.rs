// Chord accompaniment by scale-degree skipping.
//
// A triad on degree `rank` stacks every other scale note:
// {scale[rank], scale[rank+2], scale[rank+4]}, all indices mod the scale
// length, so any rank is valid and upper notes wrap back to the bottom of
// the scale rather than climbing into the next octave. Scales carry no
// octave repeat of the tonic, so in C minor from C3 the iv chord is
// F3 Ab3 C3 and the v chord G3 Bb3 D3.
//
// The progression alternates i-iv and i-v: even measures play chord(0) then
// chord(3), odd measures chord(0) then chord(4), each for half a measure.
// Nothing here is random.

use crate::pitch::PitchToken;
use crate::scale::Scale;
use crate::score::{Duration, Instrument, Track};

/// Second chord of even and odd measures.
const EVEN_MEASURE_RANK: usize = 3;
const ODD_MEASURE_RANK: usize = 4;

/// The triad built on `rank`.
pub fn chord_at(scale: &Scale, rank: usize) -> Vec<PitchToken> {
    let pitches = scale.pitches();
    let len = pitches.len();
    vec![
        pitches[rank % len],
        pitches[(rank + 2) % len],
        pitches[(rank + 4) % len],
    ]
}

/// The two (rank) chords for a measure index.
pub fn measure_ranks(measure: usize) -> [usize; 2] {
    if measure % 2 == 0 {
        [0, EVEN_MEASURE_RANK]
    } else {
        [0, ODD_MEASURE_RANK]
    }
}

pub fn chord_progression(scale: &Scale, measures: usize) -> Track {
    let mut track = Track::new(Instrument::Piano);
    for measure in 0..measures {
        for rank in measure_ranks(measure) {
            track.push_chord(chord_at(scale, rank), Duration::HALF_MEASURE);
        }
    }
    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::p;
    use crate::scale::Mode;
    use crate::score::ScoreEvent;

    fn c_minor() -> Scale {
        Scale::new(p("C3"), Mode::Aeolian).unwrap()
    }

    fn degrees(scale: &Scale, chord: &[PitchToken]) -> Vec<usize> {
        chord
            .iter()
            .map(|t| scale.pitches().iter().position(|s| s == t).unwrap())
            .collect()
    }

    #[test]
    fn triads_wrap_around_the_scale() {
        let scale = c_minor();
        assert_eq!(degrees(&scale, &chord_at(&scale, 0)), [0, 2, 4]);
        assert_eq!(degrees(&scale, &chord_at(&scale, 3)), [3, 5, 0]);
        assert_eq!(degrees(&scale, &chord_at(&scale, 4)), [4, 6, 1]);
        assert_eq!(degrees(&scale, &chord_at(&scale, 6)), [6, 1, 3]);
        assert_eq!(chord_at(&scale, 7), chord_at(&scale, 0));
    }

    #[test]
    fn c_minor_chords_are_spelled() {
        let scale = c_minor();
        assert_eq!(chord_at(&scale, 0), [p("C3"), p("Eb3"), p("G3")]);
        assert_eq!(chord_at(&scale, 3), [p("F3"), p("Ab3"), p("C3")]);
        assert_eq!(chord_at(&scale, 4), [p("G3"), p("Bb3"), p("D3")]);
    }

    #[test]
    fn progression_alternates_iv_and_v() {
        let scale = c_minor();
        let track = chord_progression(&scale, 4);
        assert_eq!(track.len(), 8);
        let expected_ranks = [0, 3, 0, 4, 0, 3, 0, 4];
        for (event, &rank) in track.events().iter().zip(&expected_ranks) {
            let ScoreEvent::Chord(chord) = event else {
                panic!("harmony should only contain chords");
            };
            assert_eq!(chord.pitches, chord_at(&scale, rank));
            assert_eq!(chord.duration, Duration::HALF_MEASURE);
        }
        assert_eq!(track.total_ticks(), 4 * Duration::MEASURE.ticks() as u64);
    }

    #[test]
    fn measure_ranks_by_parity() {
        assert_eq!(measure_ranks(0), [0, 3]);
        assert_eq!(measure_ranks(1), [0, 4]);
        assert_eq!(measure_ranks(10), [0, 3]);
        assert_eq!(measure_ranks(11), [0, 4]);
    }

    #[test]
    fn zero_measures_is_empty() {
        assert!(chord_progression(&c_minor(), 0).is_empty());
    }
}
