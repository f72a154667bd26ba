// Note events: the input boundary between file readers and the core.
//
// Readers (midi.rs for Standard MIDI Files, `parse_token_text` here for the
// plain-text training format) produce an ordered `Vec<NoteEvent>` for one
// track. The core only cares whether an event is a single sounded pitch;
// chords and rests are carried so that extraction can skip them while
// keeping the order of everything else.
//
// Token text format: whitespace- or comma-separated tokens, one per event.
//   C4         single note
//   C4+E4+G4   chord (two or more pitches joined by `+`)
//   r          rest (`R` also accepted)
// Anything after `//` on a line is a comment.

use crate::error::ComposeError;
use crate::pitch::PitchToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteEvent {
    /// A single sounded pitch.
    Note(PitchToken),
    /// Several pitches starting together.
    Chord(Vec<PitchToken>),
    Rest,
}

impl NoteEvent {
    /// The pitch if this event is a single note.
    pub fn single_pitch(&self) -> Option<PitchToken> {
        match self {
            NoteEvent::Note(pitch) => Some(*pitch),
            NoteEvent::Chord(_) | NoteEvent::Rest => None,
        }
    }
}

/// Parse the token text format into events.
pub fn parse_token_text(text: &str) -> Result<Vec<NoteEvent>, ComposeError> {
    let mut events = Vec::new();
    for line in text.lines() {
        let line = match line.find("//") {
            Some(pos) => &line[..pos],
            None => line,
        };
        for token in line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            events.push(parse_event(token)?);
        }
    }
    Ok(events)
}

fn parse_event(token: &str) -> Result<NoteEvent, ComposeError> {
    if token.eq_ignore_ascii_case("r") {
        return Ok(NoteEvent::Rest);
    }
    if token.contains('+') {
        let pitches = token
            .split('+')
            .map(str::parse)
            .collect::<Result<Vec<PitchToken>, _>>()?;
        if pitches.len() < 2 {
            return Err(ComposeError::InvalidPitch(token.to_string()));
        }
        return Ok(NoteEvent::Chord(pitches));
    }
    Ok(NoteEvent::Note(token.parse()?))
}
