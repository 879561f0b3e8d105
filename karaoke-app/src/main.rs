//! Terminal frontend for the karaoke engine.
//!
//! Wires one [`PerformanceSession`] to the microphone and to a wall-clock
//! playback transport, then runs the engine loop: tick, enforce the no-seek
//! contract, print lyric lines as they become current, and keep a live
//! status line with position, detected note, and running score. Song
//! search, page navigation, and actual track playback live elsewhere; this
//! binary only exercises the engine's contracts.

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use karaoke_core::clock::PlaybackState;
use karaoke_core::lyrics::LyricTimeline;
use karaoke_core::melody::ReferenceMelody;
use karaoke_core::render;
use karaoke_core::session::{PerformanceSession, TickUpdate};

/// Engine loop cadence, roughly display-refresh rate.
const TICK_PERIOD: Duration = Duration::from_millis(16);

/// Width of the textual progress bar in characters.
const PROGRESS_WIDTH: f32 = 30.0;

/// Status line refresh: every Nth engine tick.
const STATUS_EVERY: u32 = 10;

#[derive(Parser, Debug)]
#[command(
    name = "karaoke-app",
    about = "Live karaoke pitch tracking and scoring against a reference melody"
)]
struct Cli {
    /// Reference melody JSON file: {"segments": [{"start", "end", "freq"}]}
    #[arg(long)]
    melody: Option<PathBuf>,

    /// Time-synced lyrics JSON file: {"lyrics": [{"time", "text"}]}
    #[arg(long)]
    lyrics: Option<PathBuf>,

    /// Track duration in seconds; defaults to the end of the melody.
    #[arg(long)]
    duration: Option<f32>,

    /// Global melody delay in seconds (positive shifts the melody later).
    #[arg(long, default_value_t = 0.0)]
    offset: f32,

    /// Run without acquiring the microphone.
    #[arg(long)]
    no_mic: bool,
}

/// Minimal playback transport: a position that advances in real time, the
/// way a media clock would. Accepts the forced-position writes issued by
/// the engine's seek rejection.
struct WallClockTransport {
    origin: Instant,
    base: f32,
}

impl WallClockTransport {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            base: 0.0,
        }
    }

    fn position(&self) -> f32 {
        self.base + self.origin.elapsed().as_secs_f32()
    }

    fn force_position(&mut self, position: f32) {
        self.origin = Instant::now();
        self.base = position;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Melody and lyrics load independently; either may be missing and the
    // session simply runs with that surface inactive.
    let melody = match &cli.melody {
        Some(path) => ReferenceMelody::load(path).unwrap_or_else(|err| {
            log::warn!("failed to load melody from {}: {:#}", path.display(), err);
            ReferenceMelody::empty()
        }),
        None => ReferenceMelody::empty(),
    };
    let lyrics = match &cli.lyrics {
        Some(path) => LyricTimeline::load(path).unwrap_or_else(|err| {
            log::warn!("failed to load lyrics from {}: {:#}", path.display(), err);
            LyricTimeline::empty()
        }),
        None => LyricTimeline::empty(),
    };

    log::info!(
        "loaded {} melody segments, {} lyric lines",
        melody.len(),
        lyrics.len()
    );

    let mut session = PerformanceSession::new(melody, lyrics, cli.duration);
    if cli.offset != 0.0 {
        session.set_melody_offset(cli.offset);
    }

    if session.duration().is_none() {
        anyhow::bail!("track duration unknown: pass --duration or a melody file");
    }
    let total = render::resolve_duration(session.duration(), session.melody());

    if !cli.no_mic {
        session.start_capture();
    }
    session.play();

    let mut transport = WallClockTransport::new();
    let mut shown_line: Option<usize> = None;
    let mut note_display = String::from("—");
    let mut freq_display = String::from("— Hz");
    let mut ticks: u32 = 0;

    loop {
        std::thread::sleep(TICK_PERIOD);
        ticks += 1;

        let reported = transport.position();
        let update = session.tick(reported);
        if update.position != reported {
            transport.force_position(update.position);
        }

        if let Some(reading) = &update.reading {
            match (reading.frequency, reading.note_name.as_deref()) {
                (Some(freq), Some(note)) => {
                    freq_display = format!("{:.1} Hz", freq);
                    note_display = note.to_string();
                }
                _ => {
                    freq_display = String::from("— Hz");
                    note_display = String::from("—");
                }
            }
        }

        if update.current_line != shown_line {
            if let Some(idx) = update.current_line {
                println!("\n♪ {}", session.lyrics().lines()[idx].text);
            }
            shown_line = update.current_line;
        }

        if ticks % STATUS_EVERY == 0 {
            print_status(&update, total, &note_display, &freq_display);
        }

        if update.state == PlaybackState::Ended {
            break;
        }
    }

    println!();
    println!(
        "performance complete: {} points over {} samples",
        session.score().display_score(),
        session.score().sample_count()
    );
    Ok(())
}

fn print_status(update: &TickUpdate, total: f32, note: &str, freq: &str) {
    let width = PROGRESS_WIDTH as usize;
    let filled = render::time_to_x(update.position, total, PROGRESS_WIDTH).round() as usize;
    let filled = filled.min(width);
    let bar: String = "=".repeat(filled) + &"-".repeat(width - filled);

    print!(
        "\r[{}] {}  {:>4} {:>9}  score {:>3}",
        bar,
        format_time(update.position),
        note,
        freq,
        update.average_score.round() as u32
    );
    let _ = std::io::stdout().flush();
}

fn format_time(seconds: f32) -> String {
    let whole = seconds.max(0.0) as u32;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}
