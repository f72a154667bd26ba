// The assembled composition: tracks of notes and chords plus a tempo.
//
// Durations are integer ticks at 480 per quarter note, the same resolution
// the MIDI writer uses, so "this pattern fills exactly one measure" and
// "these tracks are the same length" are exact integer comparisons. A
// measure is four quarter notes.
//
// Each generator (rhythm.rs, harmony.rs, percussion.rs) builds and owns its
// own `Track`, then hands it to `assemble_score`, which checks that all
// tracks last equally long before producing the immutable `Score`. The MIDI
// writer (midi.rs) reads the score; nothing mutates it afterwards.

use crate::error::ComposeError;
use crate::pitch::PitchToken;
use std::fmt::{self, Write};

/// Ticks per quarter note.
pub const TICKS_PER_QUARTER: u32 = 480;

/// Quarter notes per measure (4/4).
pub const QUARTERS_PER_MEASURE: u32 = 4;

/// Slowest tempo whose microseconds-per-quarter fits MIDI's 24-bit field.
pub const MIN_TEMPO_BPM: u16 = 4;

/// A note or chord length in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Duration(u32);

impl Duration {
    pub const EIGHTH: Duration = Duration(TICKS_PER_QUARTER / 2);
    pub const QUARTER: Duration = Duration(TICKS_PER_QUARTER);
    pub const HALF_MEASURE: Duration = Duration(TICKS_PER_QUARTER * QUARTERS_PER_MEASURE / 2);
    pub const MEASURE: Duration = Duration(TICKS_PER_QUARTER * QUARTERS_PER_MEASURE);

    pub const fn from_ticks(ticks: u32) -> Self {
        Duration(ticks)
    }

    pub fn ticks(self) -> u32 {
        self.0
    }

    /// Convert a length in quarter notes (`0.5` = eighth) to ticks. The value
    /// must be positive and land exactly on a tick.
    pub fn from_quarters(quarters: f64) -> Result<Self, ComposeError> {
        let ticks = quarters * TICKS_PER_QUARTER as f64;
        let rounded = ticks.round();
        if !ticks.is_finite()
            || rounded < 1.0
            || rounded > u32::MAX as f64
            || (ticks - rounded).abs() > 1e-9
        {
            return Err(ComposeError::InvalidDuration(quarters));
        }
        Ok(Duration(rounded as u32))
    }

    pub fn quarters(self) -> f64 {
        self.0 as f64 / TICKS_PER_QUARTER as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub pitch: PitchToken,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    pub pitches: Vec<PitchToken>,
    pub duration: Duration,
}

/// One timed event in a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreEvent {
    Note(Note),
    Chord(Chord),
}

impl ScoreEvent {
    pub fn duration(&self) -> Duration {
        match self {
            ScoreEvent::Note(note) => note.duration,
            ScoreEvent::Chord(chord) => chord.duration,
        }
    }

    /// Every pitch that sounds for this event.
    pub fn pitches(&self) -> &[PitchToken] {
        match self {
            ScoreEvent::Note(note) => std::slice::from_ref(&note.pitch),
            ScoreEvent::Chord(chord) => &chord.pitches,
        }
    }
}

/// The three parts of a composition and how they are voiced in MIDI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    /// Generated melody.
    Flute,
    /// Chord accompaniment.
    Piano,
    /// Percussion loop, played on the General MIDI drum channel.
    BassDrum,
}

impl Instrument {
    pub fn name(self) -> &'static str {
        match self {
            Instrument::Flute => "Flute",
            Instrument::Piano => "Piano",
            Instrument::BassDrum => "Bass Drum",
        }
    }

    /// General MIDI program number.
    pub fn program(self) -> u8 {
        match self {
            Instrument::Flute => 73,
            Instrument::Piano => 0,
            Instrument::BassDrum => 0,
        }
    }

    /// MIDI channel (0-based; 9 is the GM percussion channel).
    pub fn channel(self) -> u8 {
        match self {
            Instrument::Flute => 0,
            Instrument::Piano => 1,
            Instrument::BassDrum => 9,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An instrument's ordered events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub instrument: Instrument,
    events: Vec<ScoreEvent>,
}

impl Track {
    pub fn new(instrument: Instrument) -> Self {
        Track {
            instrument,
            events: Vec::new(),
        }
    }

    pub fn push_note(&mut self, pitch: PitchToken, duration: Duration) {
        self.events.push(ScoreEvent::Note(Note { pitch, duration }));
    }

    pub fn push_chord(&mut self, pitches: Vec<PitchToken>, duration: Duration) {
        self.events.push(ScoreEvent::Chord(Chord { pitches, duration }));
    }

    pub fn events(&self) -> &[ScoreEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sum of all event durations, in ticks.
    pub fn total_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.duration().ticks() as u64).sum()
    }
}

/// A finished composition. Built only through `assemble_score`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    tempo_bpm: u16,
    tracks: Vec<Track>,
}

impl Score {
    pub fn tempo_bpm(&self) -> u16 {
        self.tempo_bpm
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, instrument: Instrument) -> Option<&Track> {
        self.tracks.iter().find(|t| t.instrument == instrument)
    }

    /// Length of the piece in ticks.
    pub fn total_ticks(&self) -> u64 {
        self.tracks.first().map_or(0, Track::total_ticks)
    }

    /// Compact text rendering, one line per track, `|` between measures.
    /// Each event is written as `pitch/quarters`, chords in brackets.
    pub fn summary(&self) -> String {
        let measure = Duration::MEASURE.ticks() as u64;
        let mut out = String::new();
        for track in &self.tracks {
            let _ = write!(out, "{:>9}:", track.instrument.name());
            let mut elapsed: u64 = 0;
            for event in track.events() {
                if elapsed > 0 && elapsed % measure == 0 {
                    out.push_str(" |");
                }
                let names: Vec<String> = event.pitches().iter().map(|p| p.to_string()).collect();
                let quarters = event.duration().quarters();
                match event {
                    ScoreEvent::Note(_) => {
                        let _ = write!(out, " {}/{}", names[0], quarters);
                    }
                    ScoreEvent::Chord(_) => {
                        let _ = write!(out, " [{}]/{}", names.join(" "), quarters);
                    }
                }
                elapsed += event.duration().ticks() as u64;
            }
            out.push('\n');
        }
        out
    }
}

/// Reject tempos the MIDI tempo meta event cannot represent.
pub fn check_tempo(tempo_bpm: u16) -> Result<(), ComposeError> {
    if tempo_bpm < MIN_TEMPO_BPM {
        return Err(ComposeError::InvalidConfig(format!(
            "tempo {tempo_bpm} BPM is below the minimum of {MIN_TEMPO_BPM}"
        )));
    }
    Ok(())
}

/// Join the three parts into a score.
///
/// All tracks must last exactly as long as the melody; otherwise the run
/// fails with `TrackLengthMismatch` and no score is produced.
pub fn assemble_score(
    melody: Track,
    harmony: Track,
    percussion: Track,
    tempo_bpm: u16,
) -> Result<Score, ComposeError> {
    check_tempo(tempo_bpm)?;
    let expected = melody.total_ticks();
    for track in [&harmony, &percussion] {
        let actual = track.total_ticks();
        if actual != expected {
            return Err(ComposeError::TrackLengthMismatch {
                instrument: track.instrument,
                expected,
                actual,
            });
        }
    }
    Ok(Score {
        tempo_bpm,
        tracks: vec![melody, harmony, percussion],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::p;

    fn one_measure(instrument: Instrument) -> Track {
        let mut track = Track::new(instrument);
        track.push_note(p("C4"), Duration::HALF_MEASURE);
        track.push_chord(vec![p("C3"), p("Eb3"), p("G3")], Duration::HALF_MEASURE);
        track
    }

    #[test]
    fn duration_conversions() {
        assert_eq!(Duration::from_quarters(1.0).unwrap(), Duration::QUARTER);
        assert_eq!(Duration::from_quarters(0.5).unwrap(), Duration::EIGHTH);
        assert_eq!(Duration::from_quarters(4.0).unwrap(), Duration::MEASURE);
        assert_eq!(Duration::from_quarters(0.25).unwrap().ticks(), 120);
        assert_eq!(Duration::MEASURE.quarters(), 4.0);
        for bad in [0.0, -1.0, 1.0 / 3.0, f64::NAN, f64::INFINITY] {
            assert!(Duration::from_quarters(bad).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn event_accessors() {
        let track = one_measure(Instrument::Piano);
        assert_eq!(track.events()[0].pitches(), &[p("C4")]);
        assert_eq!(track.events()[1].pitches().len(), 3);
        assert_eq!(track.total_ticks(), Duration::MEASURE.ticks() as u64);
    }

    #[test]
    fn assembles_equal_length_tracks() {
        let score = assemble_score(
            one_measure(Instrument::Flute),
            one_measure(Instrument::Piano),
            one_measure(Instrument::BassDrum),
            80,
        )
        .unwrap();
        assert_eq!(score.tempo_bpm(), 80);
        assert_eq!(score.tracks().len(), 3);
        assert_eq!(score.total_ticks(), 1920);
        assert!(score.track(Instrument::Piano).is_some());
    }

    #[test]
    fn rejects_mismatched_tracks() {
        let mut long_drums = one_measure(Instrument::BassDrum);
        long_drums.push_note(p("G3"), Duration::EIGHTH);
        let result = assemble_score(
            one_measure(Instrument::Flute),
            one_measure(Instrument::Piano),
            long_drums,
            80,
        );
        assert!(matches!(
            result,
            Err(ComposeError::TrackLengthMismatch {
                instrument: Instrument::BassDrum,
                expected: 1920,
                actual: 2160,
            })
        ));
    }

    #[test]
    fn rejects_tempos_below_midi_range() {
        for bpm in 0..MIN_TEMPO_BPM {
            let result = assemble_score(
                one_measure(Instrument::Flute),
                one_measure(Instrument::Piano),
                one_measure(Instrument::BassDrum),
                bpm,
            );
            assert!(matches!(result, Err(ComposeError::InvalidConfig(_))), "{bpm} BPM");
        }
        let slowest = assemble_score(
            one_measure(Instrument::Flute),
            one_measure(Instrument::Piano),
            one_measure(Instrument::BassDrum),
            MIN_TEMPO_BPM,
        );
        assert!(slowest.is_ok());
    }

    #[test]
    fn summary_marks_measures() {
        let mut melody = Track::new(Instrument::Flute);
        for name in ["C4", "D4", "Eb4", "F4", "G4", "F4", "Eb4", "D4"] {
            melody.push_note(p(name), Duration::QUARTER);
        }
        let mut harmony = one_measure(Instrument::Piano);
        harmony.push_note(p("C3"), Duration::MEASURE);
        let mut drums = one_measure(Instrument::BassDrum);
        drums.push_note(p("G3"), Duration::MEASURE);
        let score = assemble_score(melody, harmony, drums, 90).unwrap();
        let summary = score.summary();
        let first = summary.lines().next().unwrap();
        assert_eq!(first, "    Flute: C4/1 D4/1 Eb4/1 F4/1 | G4/1 F4/1 Eb4/1 D4/1");
        assert!(summary.contains("[C3 Eb3 G3]/2"));
    }
}
