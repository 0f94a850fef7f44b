//! scoreplay - A terminal score editor and player.
//!
//! Edits a short score (drum pattern, one chord per bar, melody grid) and
//! plays it through the default audio output.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --score song.json               # Edit and play a score
//! cargo run -- --score song.json --export a.wav # Bounce to WAV and exit
//! cargo run -- --score song.json --dry-run      # Print the schedule and exit
//! ```

use scoreplay::app::{App, DEFAULT_SCORE_PATH};
use scoreplay::audio::{export_to_wav, OutputDevice, RecordingSynth, TriggerSound};
use scoreplay::config::EngineConfig;
use scoreplay::engine::schedule_from;
use scoreplay::score::Score;
use scoreplay::ui;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line options for the application.
struct CliOptions {
    /// Score file to open (and save to).
    score: Option<PathBuf>,
    /// Engine config JSON.
    config: Option<PathBuf>,
    /// Render to this WAV file instead of opening the editor.
    export: Option<PathBuf>,
    /// Print the schedule instead of opening the editor.
    dry_run: bool,
    /// Start from an empty score even if the file exists.
    new_score: bool,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--score <path>` or `-s <path>`: Score file to open
    /// - `--config <path>` or `-c <path>`: Engine config file
    /// - `--export <path>` or `-e <path>`: Export to WAV and exit
    /// - `--dry-run`: Print scheduled triggers and exit
    /// - `--new` or `-n`: Start with a fresh score
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = Self {
            score: None,
            config: None,
            export: None,
            dry_run: false,
            new_score: false,
        };
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--new" | "-n" => options.new_score = true,
                "--dry-run" => options.dry_run = true,
                flag @ ("--score" | "-s" | "--config" | "-c" | "--export" | "-e") => {
                    i += 1;
                    let Some(value) = args.get(i) else {
                        anyhow::bail!("{} requires a path argument", flag);
                    };
                    let path = Some(PathBuf::from(value));
                    match flag {
                        "--score" | "-s" => options.score = path,
                        "--config" | "-c" => options.config = path,
                        _ => options.export = path,
                    }
                }
                "--help" | "-h" => {
                    eprintln!("scoreplay - Terminal score editor and player");
                    eprintln!();
                    eprintln!(
                        "Usage: {} [OPTIONS] [SCORE.json]",
                        args.first().map(String::as_str).unwrap_or("scoreplay")
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -s, --score PATH   Score file to open (default: {})", DEFAULT_SCORE_PATH);
                    eprintln!("  -c, --config PATH  Engine config file (JSON)");
                    eprintln!("  -e, --export PATH  Render the score to a WAV file and exit");
                    eprintln!("      --dry-run      Print the playback schedule and exit");
                    eprintln!("  -n, --new          Start with a new score");
                    eprintln!("  -h, --help         Print this help message");
                    eprintln!();
                    eprintln!("Set RUST_LOG=debug for transport logging on stderr.");
                    std::process::exit(0);
                }
                other if other.ends_with(".json") && options.score.is_none() => {
                    options.score = Some(PathBuf::from(other));
                }
                other => {
                    anyhow::bail!("Unknown option: {} (use --help for usage)", other);
                }
            }
            i += 1;
        }

        Ok(options)
    }
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let score_path = cli
        .score
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCORE_PATH));
    let score = if cli.new_score || !score_path.exists() {
        Score::default()
    } else {
        Score::load_from_file(&score_path)
            .with_context(|| format!("Failed to load score: {}", score_path.display()))?
    };

    if let Some(output) = &cli.export {
        return export(&score, &config, output);
    }
    if cli.dry_run {
        return dry_run(&score, &config);
    }

    let mut app = App::new(score, OutputDevice::new(), config, score_path);

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    result
}

/// Renders the score to WAV, printing progress to stderr.
fn export(score: &Score, config: &EngineConfig, output: &Path) -> Result<()> {
    let mut last_percent = 0;
    export_to_wav(
        score,
        config,
        output,
        Some(|progress: f32| {
            let percent = (progress * 100.0) as u32;
            if percent >= last_percent + 10 {
                last_percent = percent;
                eprint!("\rExporting... {}%", percent);
                io::stderr().flush().ok();
            }
        }),
    )?;
    eprintln!("\rExported {}", output.display());
    Ok(())
}

/// Prints every trigger a start from the top would submit.
fn dry_run(score: &Score, config: &EngineConfig) -> Result<()> {
    let mut synth = RecordingSynth::new();
    let report = schedule_from(score, 0.0, 0.0, &mut synth, config);

    let mut out = io::stdout().lock();
    for trigger in synth.triggers() {
        match &trigger.sound {
            TriggerSound::Percussion(kind) => {
                writeln!(out, "{:>8.3}s  {}", trigger.at_device_time, kind.label())?
            }
            TriggerSound::Tone {
                frequency_hz,
                duration_seconds,
                ..
            } => writeln!(
                out,
                "{:>8.3}s  tone {:.2} Hz for {:.3}s",
                trigger.at_device_time, frequency_hz, duration_seconds
            )?,
        }
    }
    writeln!(
        out,
        "{} triggers, {} skipped, {:.3}s total",
        report.submitted(),
        report.skipped,
        score.total_duration_seconds()
    )?;
    Ok(())
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
///
/// Each iteration is one display frame: advance the position loop, draw,
/// then wait up to one frame interval for input.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let frame_interval: Duration = app.transport.config().frame_interval();

    while !app.should_quit {
        app.update();
        app.clear_expired_status();

        terminal.draw(|frame| ui::render(frame, app))?;

        if !event::poll(frame_interval)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.save();
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
            KeyCode::Char('q') | KeyCode::Esc => app.quit(),
            KeyCode::Char(' ') => app.toggle_playback(),
            KeyCode::Char('s') => app.stop_playback(),
            KeyCode::Left | KeyCode::Char('h') => app.move_cursor_left(),
            KeyCode::Right | KeyCode::Char('l') => app.move_cursor_right(),
            KeyCode::Up | KeyCode::Char('k') => app.move_cursor_up(),
            KeyCode::Down | KeyCode::Char('j') => app.move_cursor_down(),
            KeyCode::Tab => app.next_lane(),
            KeyCode::Enter | KeyCode::Char('x') => app.edit_at_cursor(),
            KeyCode::Char('[') => app.seek_beats(-1),
            KeyCode::Char(']') => app.seek_beats(1),
            KeyCode::Char('g') => app.seek_to_cursor(),
            KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_bpm(5),
            KeyCode::Char('-') => app.adjust_bpm(-5),
            KeyCode::Char('B') => app.adjust_bars(1),
            KeyCode::Char('b') => app.adjust_bars(-1),
            KeyCode::Char('N') => app.new_score(),
            _ => {}
        }
    }

    Ok(())
}
