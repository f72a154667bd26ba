// Markov Composer
//
// Learns a second-order Markov chain over spelled pitches from one track of
// a source piece, samples a new pitch sequence from it, and arranges that
// sequence into a three-part score: a rhythmic melody, an i-iv / i-v chord
// accompaniment, and a fixed percussion loop.
//
// Architecture:
// - pitch.rs: Spelled pitch tokens (letter, accidental, octave), parsing, MIDI keys
// - scale.rs: Diatonic modes and correctly spelled seven-note scales
// - event.rs: Note/chord/rest input events and the plain-text token format
// - extract.rs: Training-pitch extraction (single notes only)
// - markov.rs: Transition model training, lookup, and JSON export
// - sampler.rs: Lazy chain sampling with an unseen-context fallback policy
// - rhythm.rs: Rhythm pattern library and melody assembly from a pitch supply
// - harmony.rs: Scale-degree triads and the alternating chord progression
// - percussion.rs: The fixed eighth-note drum loop
// - score.rs: Durations, notes, chords, tracks, and score assembly
// - compose.rs: The generation pipeline from trained model to finished score
// - config.rs: Data-driven run configuration (JSON, with defaults)
// - midi.rs: Standard MIDI File reading (training input) and writing (output)
// - error.rs: The `ComposeError` taxonomy
//
// Given the same training data, configuration and seed, every stage is
// deterministic.

pub mod compose;
pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod harmony;
pub mod markov;
pub mod midi;
pub mod percussion;
pub mod pitch;
pub mod rhythm;
pub mod sampler;
pub mod scale;
pub mod score;
