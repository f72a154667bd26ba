// Standard MIDI File input and output.
//
// Output: a `Score` becomes an SMF format 1 file at 480 ticks per quarter.
// Track 0 carries tempo and a 4/4 time signature; each score track follows
// in order (melody, harmony, percussion) with its name, a program change
// (omitted on the GM drum channel) and note on/off pairs at velocity 80.
// Chord notes all start and stop together.
//
// Input: `read_midi_track` turns one part of any SMF into `NoteEvent`s.
// Parts are the tracks that sound at least one note, counted from 0, so a
// conductor track holding only tempo and meter is skipped: in a file this
// module writes, part 0 is the melody and part 1 the harmony. Note-ons
// starting on the same tick form a chord, a lone note-on is a note, and a
// gap after every sounding note has been released becomes a rest. Note-offs
// pair with note-ons by channel and key. Keys are spelled with the fixed
// table in pitch.rs, so training from MIDI never yields enharmonic
// duplicates.
//
// Uses the `midly` crate for parsing and writing.

use crate::error::ComposeError;
use crate::event::NoteEvent;
use crate::pitch::PitchToken;
use crate::score::{Score, TICKS_PER_QUARTER, Track as ScoreTrack, check_tempo};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

const VELOCITY: u8 = 80;

/// Channel that General MIDI reserves for percussion.
const DRUM_CHANNEL: u8 = 9;

/// Convert a score to MIDI and write it to a file.
pub fn write_midi(score: &Score, path: &Path) -> Result<(), ComposeError> {
    let bytes = score_to_bytes(score)?;
    std::fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote MIDI file");
    Ok(())
}

/// Encode a score as SMF bytes.
pub fn score_to_bytes(score: &Score) -> Result<Vec<u8>, ComposeError> {
    let smf = score_to_smf(score)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Convert a score to an in-memory SMF.
pub fn score_to_smf(score: &Score) -> Result<Smf<'static>, ComposeError> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER as u16)),
    ));

    check_tempo(score.tempo_bpm())?;
    let tempo_microseconds = 60_000_000 / u32::from(score.tempo_bpm());
    smf.tracks.push(vec![
        meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
        meta(MetaMessage::EndOfTrack),
    ]);

    for track in score.tracks() {
        smf.tracks.push(encode_track(track)?);
    }
    Ok(smf)
}

fn meta(message: MetaMessage<'static>) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(message),
    }
}

fn encode_track(track: &ScoreTrack) -> Result<Track<'static>, ComposeError> {
    let instrument = track.instrument;
    let channel = u4::new(instrument.channel());
    let name = MetaMessage::TrackName(instrument.name().as_bytes());
    let mut events: Track<'static> = vec![meta(name)];

    if instrument.channel() != DRUM_CHANNEL {
        events.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(instrument.program()),
                },
            },
        });
    }

    for event in track.events() {
        let keys = event
            .pitches()
            .iter()
            .map(|&pitch| {
                pitch
                    .midi_key_u8()
                    .map(u7::new)
                    .ok_or_else(|| ComposeError::InvalidPitch(pitch.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for &key in &keys {
            events.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn {
                        key,
                        vel: u7::new(VELOCITY),
                    },
                },
            });
        }
        for (i, &key) in keys.iter().enumerate() {
            let delta = if i == 0 { event.duration().ticks() } else { 0 };
            events.push(TrackEvent {
                delta: u28::new(delta),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff {
                        key,
                        vel: u7::new(0),
                    },
                },
            });
        }
    }

    events.push(meta(MetaMessage::EndOfTrack));
    Ok(events)
}

/// Notes that started on one tick, and when the last of them was released.
struct Onset {
    keys: Vec<u8>,
    end: u64,
}

fn has_notes(track: &Track<'_>) -> bool {
    track.iter().any(|event| {
        matches!(
            event.kind,
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { vel, .. },
                ..
            } if vel.as_int() > 0
        )
    })
}

/// Read one part of an SMF as note events. `part_index` counts only tracks
/// that contain notes.
pub fn read_midi_track(bytes: &[u8], part_index: usize) -> Result<Vec<NoteEvent>, ComposeError> {
    let smf = Smf::parse(bytes)?;
    let parts: Vec<&Track<'_>> = smf.tracks.iter().filter(|t| has_notes(t)).collect();
    let track = parts.get(part_index).ok_or(ComposeError::MissingTrack {
        index: part_index,
        available: parts.len(),
    })?;

    let mut onsets: BTreeMap<u64, Onset> = BTreeMap::new();
    // Sounding (channel, key) -> tick it started on.
    let mut sounding: HashMap<(u8, u8), u64> = HashMap::new();
    let mut tick: u64 = 0;

    for event in track.iter() {
        tick += u64::from(event.delta.as_int());
        let TrackEventKind::Midi { channel, message } = &event.kind else {
            continue;
        };
        let channel = channel.as_int();
        match *message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                let key = key.as_int();
                if let Some(start) = sounding.insert((channel, key), tick) {
                    release(&mut onsets, start, tick);
                }
                onsets
                    .entry(tick)
                    .or_insert_with(|| Onset {
                        keys: Vec::new(),
                        end: tick,
                    })
                    .keys
                    .push(key);
            }
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                if let Some(start) = sounding.remove(&(channel, key.as_int())) {
                    release(&mut onsets, start, tick);
                }
            }
            _ => {}
        }
    }
    for start in sounding.into_values() {
        release(&mut onsets, start, tick);
    }

    let mut events = Vec::with_capacity(onsets.len());
    let mut released: Option<u64> = None;
    for (start, onset) in onsets {
        if released.is_some_and(|end| start > end) {
            events.push(NoteEvent::Rest);
        }
        let mut keys = onset.keys;
        keys.sort_unstable();
        keys.dedup();
        events.push(if keys.len() == 1 {
            NoteEvent::Note(PitchToken::from_midi_key(keys[0]))
        } else {
            NoteEvent::Chord(keys.into_iter().map(PitchToken::from_midi_key).collect())
        });
        released = Some(released.map_or(onset.end, |end| end.max(onset.end)));
    }

    debug!(part = part_index, events = events.len(), "read MIDI part");
    Ok(events)
}

fn release(onsets: &mut BTreeMap<u64, Onset>, start: u64, tick: u64) {
    if let Some(onset) = onsets.get_mut(&start) {
        onset.end = onset.end.max(tick);
    }
}

/// Read one part of a MIDI file on disk.
pub fn read_midi_file(path: &Path, part_index: usize) -> Result<Vec<NoteEvent>, ComposeError> {
    let bytes = std::fs::read(path)?;
    read_midi_track(&bytes, part_index)
}
