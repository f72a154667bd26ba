// Spelled pitch tokens: the symbols the Markov chain is trained on.
//
// A `PitchToken` is a letter, an accidental, and an octave. Identity is the
// exact spelling: G#4 and Ab4 sound the same but are different tokens, and
// that distinction carries straight through into the transition model's
// keys. Ordering is derived (octave, then letter, then accidental) so tokens
// and contexts can key `BTreeMap`s and iterate deterministically.
//
// MIDI input has no spelling, so `from_midi_key` applies one fixed table
// (sharps for C#/F#, flats for Eb/Ab/Bb). Text input and config values use
// scientific pitch notation: `C4`, `F#3`, `Bb2`, `C##5`, `Ebb4`, with octaves
// -1 through 9 so that every MIDI key has a printable, parseable name.

use crate::error::ComposeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Diatonic letter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Position within the octave, C = 0 through B = 6.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Semitones above C of the natural letter.
    pub fn semitone(self) -> i16 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Accidental {
    DoubleFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    /// Semitone alteration applied to the natural letter.
    pub fn offset(self) -> i16 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    pub fn from_offset(offset: i16) -> Option<Accidental> {
        match offset {
            -2 => Some(Accidental::DoubleFlat),
            -1 => Some(Accidental::Flat),
            0 => Some(Accidental::Natural),
            1 => Some(Accidental::Sharp),
            2 => Some(Accidental::DoubleSharp),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "bb",
            Accidental::Flat => "b",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
        }
    }
}

/// One spelled pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PitchToken {
    // Field order drives the derived `Ord`: octave first, then letter.
    pub octave: i8,
    pub letter: Letter,
    pub accidental: Accidental,
}

/// Spelling used for MIDI keys, indexed by pitch class.
const MIDI_SPELLING: [(Letter, Accidental); 12] = [
    (Letter::C, Accidental::Natural),
    (Letter::C, Accidental::Sharp),
    (Letter::D, Accidental::Natural),
    (Letter::E, Accidental::Flat),
    (Letter::E, Accidental::Natural),
    (Letter::F, Accidental::Natural),
    (Letter::F, Accidental::Sharp),
    (Letter::G, Accidental::Natural),
    (Letter::A, Accidental::Flat),
    (Letter::A, Accidental::Natural),
    (Letter::B, Accidental::Flat),
    (Letter::B, Accidental::Natural),
];

impl PitchToken {
    pub const fn new(letter: Letter, accidental: Accidental, octave: i8) -> Self {
        PitchToken {
            octave,
            letter,
            accidental,
        }
    }

    pub const fn natural(letter: Letter, octave: i8) -> Self {
        PitchToken::new(letter, Accidental::Natural, octave)
    }

    /// MIDI key number (C4 = 60). May fall outside 0..=127 for extreme
    /// spellings; see `midi_key_u8`.
    pub fn midi_key(self) -> i16 {
        (self.octave as i16 + 1) * 12 + self.letter.semitone() + self.accidental.offset()
    }

    /// MIDI key number if it is representable in a MIDI message.
    pub fn midi_key_u8(self) -> Option<u8> {
        u8::try_from(self.midi_key()).ok().filter(|&k| k <= 127)
    }

    /// Spell a MIDI key number using the fixed MIDI spelling table.
    pub fn from_midi_key(key: u8) -> Self {
        let (letter, accidental) = MIDI_SPELLING[(key % 12) as usize];
        PitchToken::new(letter, accidental, (key / 12) as i8 - 1)
    }
}

impl fmt::Display for PitchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.letter.as_char(),
            self.accidental.symbol(),
            self.octave
        )
    }
}

impl FromStr for PitchToken {
    type Err = ComposeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || ComposeError::InvalidPitch(input.to_string());
        let s = input.trim();
        let mut chars = s.chars().peekable();

        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;

        let mut offset: i16 = 0;
        let mut saw_sharp = false;
        let mut saw_flat = false;
        while let Some(&c) = chars.peek() {
            match c {
                '#' | '♯' => saw_sharp = true,
                'b' | '♭' => saw_flat = true,
                _ => break,
            }
            offset += if c == '#' || c == '♯' { 1 } else { -1 };
            chars.next();
        }
        if saw_sharp && saw_flat {
            return Err(invalid());
        }
        let accidental = Accidental::from_offset(offset).ok_or_else(invalid)?;

        let octave_text: String = chars.collect();
        let octave: i8 = octave_text.parse().map_err(|_| invalid())?;
        if !(-1..=9).contains(&octave) {
            return Err(invalid());
        }

        Ok(PitchToken::new(letter, accidental, octave))
    }
}

impl Serialize for PitchToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PitchToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a pitch, panicking on bad input. Test and fixture helper.
#[cfg(test)]
pub(crate) fn p(text: &str) -> PitchToken {
    text.parse().unwrap()
}
