// Diatonic modes and spelled scales for the harmonic accompaniment.
//
// A `Scale` is a tonic pitch plus a `Mode`, expanded into seven spelled
// pitches ascending from the tonic. Spelling walks the letters in order
// (one letter per degree) and picks whichever accidental lands each letter
// on the mode's semitone offset, so C minor from C3 is
// C3 D3 Eb3 F3 G3 Ab3 Bb3 and never uses D#.
//
// Consumed by harmony.rs, which builds triads by scale-degree skipping.

use crate::error::ComposeError;
use crate::pitch::{Accidental, Letter, PitchToken};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven diatonic modes. `major` and `minor` are accepted as names for
/// Ionian and Aeolian (natural minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[serde(alias = "major")]
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    #[serde(alias = "minor")]
    Aeolian,
    Locrian,
}

impl Mode {
    /// Semitone offsets from the tonic for degrees 1-7.
    pub fn intervals(self) -> [i16; 7] {
        match self {
            Mode::Ionian => [0, 2, 4, 5, 7, 9, 11],
            Mode::Dorian => [0, 2, 3, 5, 7, 9, 10],
            Mode::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            Mode::Lydian => [0, 2, 4, 6, 7, 9, 11],
            Mode::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            Mode::Aeolian => [0, 2, 3, 5, 7, 8, 10],
            Mode::Locrian => [0, 1, 3, 5, 6, 8, 10],
        }
    }
}

impl FromStr for Mode {
    type Err = ComposeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "ionian" | "major" => Ok(Mode::Ionian),
            "dorian" => Ok(Mode::Dorian),
            "phrygian" => Ok(Mode::Phrygian),
            "lydian" => Ok(Mode::Lydian),
            "mixolydian" => Ok(Mode::Mixolydian),
            "aeolian" | "minor" => Ok(Mode::Aeolian),
            "locrian" => Ok(Mode::Locrian),
            other => Err(ComposeError::InvalidConfig(format!("unknown mode {other:?}"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Ionian => "ionian",
            Mode::Dorian => "dorian",
            Mode::Phrygian => "phrygian",
            Mode::Lydian => "lydian",
            Mode::Mixolydian => "mixolydian",
            Mode::Aeolian => "aeolian",
            Mode::Locrian => "locrian",
        };
        f.write_str(name)
    }
}

/// A mode rooted on a specific tonic, with its seven spelled pitches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    pub tonic: PitchToken,
    pub mode: Mode,
    pitches: Vec<PitchToken>,
}

impl Scale {
    /// Spell the scale. Fails only when a degree would need more than a
    /// double accidental (e.g. a Locrian scale on Fbb).
    pub fn new(tonic: PitchToken, mode: Mode) -> Result<Self, ComposeError> {
        let base = tonic.letter.index();
        let mut pitches = Vec::with_capacity(7);
        for (degree, &interval) in mode.intervals().iter().enumerate() {
            let step = base + degree;
            let letter = Letter::ALL[step % 7];
            let octave = tonic.octave + (step / 7) as i8;
            let natural = PitchToken::natural(letter, octave);
            let target = tonic.midi_key() + interval;
            let accidental = Accidental::from_offset(target - natural.midi_key())
                .ok_or_else(|| {
                    ComposeError::InvalidConfig(format!(
                        "cannot spell degree {} of {tonic} {mode}",
                        degree + 1
                    ))
                })?;
            pitches.push(PitchToken::new(letter, accidental, octave));
        }
        Ok(Scale {
            tonic,
            mode,
            pitches,
        })
    }

    /// Pitches in ascending order from the tonic.
    pub fn pitches(&self) -> &[PitchToken] {
        &self.pitches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::p;

    fn names(scale: &Scale) -> Vec<String> {
        scale.pitches().iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn c_minor_from_c3() {
        let scale = Scale::new(p("C3"), Mode::Aeolian).unwrap();
        assert_eq!(names(&scale), ["C3", "D3", "Eb3", "F3", "G3", "Ab3", "Bb3"]);
    }

    #[test]
    fn octave_rolls_over_at_c() {
        let scale = Scale::new(p("A3"), Mode::Aeolian).unwrap();
        assert_eq!(names(&scale), ["A3", "B3", "C4", "D4", "E4", "F4", "G4"]);
    }

    #[test]
    fn sharp_keys_spell_with_sharps() {
        let scale = Scale::new(p("F#4"), Mode::Ionian).unwrap();
        assert_eq!(names(&scale), ["F#4", "G#4", "A#4", "B4", "C#5", "D#5", "E#5"]);
    }

    #[test]
    fn dorian_and_phrygian_colours() {
        let dorian = Scale::new(p("D4"), Mode::Dorian).unwrap();
        assert!(dorian.pitches().iter().all(|t| t.accidental == Accidental::Natural));
        let phrygian = Scale::new(p("E4"), Mode::Phrygian).unwrap();
        assert_eq!(phrygian.pitches()[1], p("F4"));
    }

    #[test]
    fn unspellable_scale_is_rejected() {
        assert!(Scale::new(p("Fbb4"), Mode::Locrian).is_err());
    }

    #[test]
    fn mode_names() {
        assert_eq!("minor".parse::<Mode>().unwrap(), Mode::Aeolian);
        assert_eq!("Major".parse::<Mode>().unwrap(), Mode::Ionian);
        assert!("blues".parse::<Mode>().is_err());
        let from_json: Mode = serde_json::from_str("\"minor\"").unwrap();
        assert_eq!(from_json, Mode::Aeolian);
        assert_eq!(serde_json::to_string(&Mode::Dorian).unwrap(), "\"dorian\"");
    }
}
