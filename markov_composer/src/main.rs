// Markov Composer CLI entry point.
//
// Trains a transition model on one part of the input, composes a
// three-part score from it and writes a MIDI file. The pipeline:
// load input -> extract + train -> sample -> rhythm/harmony/percussion ->
// assemble -> MIDI output.
//
// Usage:
//   cargo run -p markov_composer -- INPUT [-o output.mid] [--config FILE]
//     [--track N] [--key K] [--mode M] [--measures N] [--seed N]
//     [--tempo BPM] [--fallback continuation|reseed] [--dump-model FILE]
//
// INPUT is a MIDI file (.mid/.midi), a dumped model (.json), or token text.
// Command-line flags override values from --config. Logging goes through
// `tracing`; set RUST_LOG=debug to see fallbacks and supply extensions.

use anyhow::{Context, Result};
use clap::Parser;
use markov_composer::compose::compose_score;
use markov_composer::config::ComposerConfig;
use markov_composer::event::parse_token_text;
use markov_composer::markov::{TransitionModel, train_from_events};
use markov_composer::midi::{read_midi_file, write_midi};
use markov_composer::pitch::PitchToken;
use markov_composer::sampler::FallbackPolicy;
use markov_composer::scale::Mode;
use markov_composer_prng::ComposerRng;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "compose")]
#[command(about = "Compose a three-part piece from a second-order Markov model", long_about = None)]
struct Args {
    /// Training input: .mid/.midi, a dumped model (.json), or token text
    input: PathBuf,

    /// Output MIDI file
    #[arg(short, long, default_value = "output.mid")]
    output: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// MIDI part to train on, counting only tracks that hold notes
    #[arg(long)]
    track: Option<usize>,

    /// Tonic of the accompaniment, e.g. C3 or F#4
    #[arg(long)]
    key: Option<PitchToken>,

    /// Scale mode: major, minor, or a church mode name
    #[arg(long)]
    mode: Option<Mode>,

    /// Number of 4/4 measures to generate
    #[arg(long)]
    measures: Option<usize>,

    /// Random seed (default: derived from the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Tempo in quarter notes per minute
    #[arg(long)]
    tempo: Option<u16>,

    /// What to do on an unseen context: continuation or reseed
    #[arg(long)]
    fallback: Option<FallbackPolicy>,

    /// Write the trained transition model as JSON
    #[arg(long)]
    dump_model: Option<PathBuf>,
}

impl Args {
    fn apply_overrides(&self, config: &mut ComposerConfig) {
        if let Some(track) = self.track {
            config.input_track = track;
        }
        if let Some(key) = self.key {
            config.key = key;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(measures) = self.measures {
            config.measures = measures;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(tempo) = self.tempo {
            config.tempo_bpm = tempo;
        }
        if let Some(fallback) = self.fallback {
            config.fallback = fallback;
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ComposerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ComposerConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    let seed = config.seed.unwrap_or_else(clock_seed);
    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        key = %config.key,
        mode = %config.mode,
        measures = config.measures,
        tempo = config.tempo_bpm,
        seed,
        "starting composition"
    );

    let model = load_model(&args.input, config.input_track)?;

    if let Some(path) = &args.dump_model {
        model
            .save(path)
            .with_context(|| format!("failed to write model {}", path.display()))?;
        info!(path = %path.display(), contexts = model.len(), "dumped transition model");
    }

    let mut rng = ComposerRng::new(seed);
    let composition = compose_score(&model, &config, &mut rng).context("composition failed")?;

    println!("{}", composition.score.summary());

    write_midi(&composition.score, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        generated = composition.stats.tokens_generated,
        extended = composition.stats.tokens_extended,
        fallbacks = composition.stats.fallbacks,
        "wrote MIDI"
    );
    Ok(())
}

/// Build the transition model from whatever kind of input was given.
fn load_model(path: &Path, part: usize) -> Result<TransitionModel> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let events = match extension.as_deref() {
        Some("json") => {
            let model = TransitionModel::load(path)
                .with_context(|| format!("failed to load model {}", path.display()))?;
            info!(contexts = model.len(), "loaded transition model");
            return Ok(model);
        }
        Some("mid") | Some("midi") => read_midi_file(path, part)
            .with_context(|| format!("failed to read part {part} of {}", path.display()))?,
        _ => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_token_text(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
    };

    train_from_events(&events).context("training failed")
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}
