// Cantus firmus generator: CLI entry point.
//
// Two subcommands:
// - generate: run the exhaustive search and optionally print, engrave
//   (LilyPond), export (MIDI), and store (SQLite) the accepted melodies.
// - check: evaluate one melody, given as note names, intervals, a MusicXML
//   score, or a MIDI file, against every rule and print a per-rule report.
//
// Usage:
//   cargo run -p cantus_music -- generate [--length N] [--min-steps N]
//     [--alphabet=-7,-4,-3,-2,-1,1,2,3,4,5,7] [--config FILE.json]
//     [--workers N] [--sequential] [--key C] [--start-degree 1]
//     [--lilypond OUT.ly] [--midi OUT.mid] [--db [FILE]] [--print]
//   cargo run -p cantus_music -- check (--notes "C4 D4 ..." | --intervals 1,2,-1
//     | --musicxml FILE | --midi FILE) [--key C] [--json]
//
// Flags override the values loaded from --config. Progress and results go to
// stdout; diagnostics go through tracing to stderr (RUST_LOG, default info).

use anyhow::{Context, Result, bail};
use cantus_core::melody::{Melody, format_intervals, parse_intervals};
use cantus_core::rules::{RuleConfig, evaluate};
use cantus_core::{Search, SearchConfig};
use cantus_music::lilypond::write_lilypond;
use cantus_music::midi::write_midi;
use cantus_music::mode::Key;
use cantus_music::notation::realize;
use cantus_music::parse::{parse_note_names, read_midi, read_musicxml};
use cantus_music::store::{MelodyStore, default_db_path};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cantus", author, version, about = "Generate and check cantus firmus melodies")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for every melody that satisfies the rules
    Generate(GenerateArgs),
    /// Evaluate one melody against every rule
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// JSON search configuration; flags below override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Notes per melody
    #[arg(long, value_name = "N")]
    length: Option<usize>,

    /// Minimum number of stepwise intervals
    #[arg(long, value_name = "N")]
    min_steps: Option<usize>,

    /// Comma-separated generic intervals, e.g. --alphabet=-2,-1,1,2
    #[arg(long, value_name = "LIST", allow_hyphen_values = true)]
    alphabet: Option<String>,

    /// Worker threads (0 = one per core)
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Run on the calling thread only
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Key for rendering, e.g. C, a, e-, "d dorian"
    #[arg(long, default_value = "C")]
    key: String,

    /// Scale degree (1-7) each rendered melody starts on
    #[arg(long, default_value_t = 1)]
    start_degree: u8,

    /// Write LilyPond sheet music to this path
    #[arg(long, value_name = "PATH")]
    lilypond: Option<PathBuf>,

    /// Write a MIDI file to this path
    #[arg(long, value_name = "PATH")]
    midi: Option<PathBuf>,

    /// Save melodies to SQLite (default file melodies_{length}_{min_steps}.db)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    db: Option<Option<PathBuf>>,

    /// Print every accepted melody with its notes
    #[arg(long, default_value_t = false)]
    print: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false, id = "melody")]
struct CheckSource {
    /// Whitespace-separated note names, e.g. "C4 D4 F4 E4"
    #[arg(long, value_name = "NOTES")]
    notes: Option<String>,

    /// Comma-separated generic intervals, e.g. --intervals=1,2,-1
    #[arg(long, value_name = "LIST", allow_hyphen_values = true)]
    intervals: Option<String>,

    /// MusicXML score whose first part holds the melody
    #[arg(long, value_name = "PATH")]
    musicxml: Option<PathBuf>,

    /// MIDI file whose first track holds the melody
    #[arg(long, value_name = "PATH")]
    midi: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    source: CheckSource,

    /// Key used to read MIDI input
    #[arg(long, default_value = "C")]
    key: String,

    /// JSON search configuration whose rule thresholds to apply
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the report as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => generate(args),
        Command::Check(args) => check(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<SearchConfig> {
    match path {
        Some(path) => SearchConfig::load(path)
            .with_context(|| format!("loading search config from {}", path.display())),
        None => Ok(SearchConfig::default()),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(length) = args.length {
        config.length = length;
    }
    if let Some(min_steps) = args.min_steps {
        config.min_steps = min_steps;
    }
    if let Some(alphabet) = &args.alphabet {
        config.alphabet = parse_intervals(alphabet).context("parsing --alphabet")?;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.sequential {
        config.parallel = false;
    }
    let key = Key::parse(&args.key)?;
    let total_steps = 2
        + usize::from(args.lilypond.is_some())
        + usize::from(args.midi.is_some())
        + usize::from(args.db.is_some());

    println!("=== Cantus Firmus Generator ===");
    println!("Length: {} notes", config.length);
    println!("Minimum steps: {}", config.min_steps);
    println!("Alphabet: {}", format_intervals(&config.alphabet));
    if config.parallel {
        let workers = if config.workers == 0 {
            "all cores".to_string()
        } else {
            config.workers.to_string()
        };
        println!("Workers: {}", workers);
    } else {
        println!("Workers: sequential");
    }
    println!("Key: {} (starting on degree {})", key, args.start_degree);
    println!();

    let mut step = 1;
    println!("[{}/{}] Searching...", step, total_steps);
    let outcome = Search::new(config.clone()).run()?;
    let stats = &outcome.stats;
    println!("  Combinations with sum 0: {}", stats.combinations);
    println!("  With at least {} steps: {}", config.min_steps, stats.eligible);
    println!("  Candidates ending stepwise: {}", stats.candidates);
    println!("  Valid melodies: {}", stats.accepted);
    println!("  Elapsed: {:.2}s", stats.elapsed.as_secs_f64());

    let melodies: Vec<Vec<i32>> = outcome.melodies.into_iter().collect();

    step += 1;
    println!("[{}/{}] Results", step, total_steps);
    if args.print {
        for intervals in &melodies {
            let notes = realize(intervals, &key, args.start_degree)?;
            let names: Vec<String> = notes.iter().map(|n| n.name_with_octave()).collect();
            println!("  {:<24} {}", format_intervals(intervals), names.join(" "));
        }
    } else {
        println!("  (use --print to list them)");
    }

    if let Some(path) = &args.lilypond {
        step += 1;
        println!("[{}/{}] Writing LilyPond to {}...", step, total_steps, path.display());
        write_lilypond(path, &melodies, &key, args.start_degree)?;
    }

    if let Some(path) = &args.midi {
        step += 1;
        println!("[{}/{}] Writing MIDI to {}...", step, total_steps, path.display());
        write_midi(path, &melodies, &key, args.start_degree)?;
    }

    if let Some(db) = &args.db {
        step += 1;
        let path = db
            .clone()
            .unwrap_or_else(|| default_db_path(config.length, config.min_steps));
        println!("[{}/{}] Saving to {}...", step, total_steps, path.display());
        let mut store = MelodyStore::open(&path)?;
        let written = store.save_all(&melodies)?;
        println!("  {} melodies saved ({} rows total).", written, store.count()?);
    }

    println!();
    println!("Done.");
    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let rules: RuleConfig = load_config(args.config.as_deref())?.rules;
    let key = Key::parse(&args.key)?;
    let source = args.source;

    let intervals = if let Some(notes) = &source.notes {
        parse_note_names(notes)?
    } else if let Some(list) = &source.intervals {
        parse_intervals(list)?
    } else if let Some(path) = &source.musicxml {
        read_musicxml(path)?
    } else if let Some(path) = &source.midi {
        read_midi(path, &key)?
    } else {
        bail!("one of --notes, --intervals, --musicxml or --midi is required");
    };

    let melody = Melody::try_new(intervals)?;
    let report = evaluate(&melody, &rules);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !report.is_valid() {
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("Intervals: {}", melody);
    println!("Pitches:   {}", format_intervals(melody.pitches()));
    println!("Extremes:  {}", format_intervals(melody.extremes()));
    println!("Range:     {}", melody.range());
    println!();

    for outcome in &report.outcomes {
        let mark = if outcome.passed { "pass" } else { "FAIL" };
        println!("  [{}] {}", mark, outcome.rule);
    }
    println!();
    if report.is_valid() {
        println!("Valid cantus firmus.");
    } else {
        println!("Not valid: {} rule(s) failed.", report.violations().len());
        std::process::exit(1);
    }
    Ok(())
}
