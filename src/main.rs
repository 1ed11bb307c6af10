//! macrotape - Main Entry Point
//!
//! Command-line front end for recording, replaying, inspecting and
//! exporting input macros.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use macrotape::{
    backend::{native_backend, InputBackend},
    config::{default_config_path, AppConfig, AppState},
    DisplayServerInfo, MacroSession, PlaybackOutcome, SessionMessage,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Record and replay keyboard and mouse macros
#[derive(Parser, Debug)]
#[command(name = "macrotape")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a macro until the stop key is pressed
    Record {
        /// Output file
        out: PathBuf,

        /// Do not record pointer moves
        #[arg(long)]
        no_moves: bool,

        /// Minimum pointer travel in pixels between recorded moves
        #[arg(long)]
        threshold: Option<u32>,
    },

    /// Replay a recorded macro
    Play {
        /// Macro file
        file: PathBuf,

        /// Speed multiplier
        #[arg(short, long)]
        speed: Option<f64>,

        /// Number of loops
        #[arg(short, long)]
        loops: Option<u32>,
    },

    /// Export a macro as a standalone Python replay script
    Compile {
        /// Macro file
        file: PathBuf,

        /// Script to write
        out: PathBuf,
    },

    /// Print statistics for a macro file
    Stats {
        /// Macro file
        file: PathBuf,
    },

    /// Show display server and input backend information
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file.as_deref())?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Record {
            out,
            no_moves,
            threshold,
        } => {
            let mut config = config;
            if no_moves {
                config.capture.record_moves = false;
            }
            if let Some(threshold) = threshold {
                config.capture.movement_threshold = threshold;
            }
            record(config, &out)
        }
        Commands::Play { file, speed, loops } => {
            let mut config = config;
            if let Some(speed) = speed {
                config.playback.speed = speed;
            }
            if let Some(loops) = loops {
                config.playback.loops = loops;
            }
            play(config, &file)
        }
        Commands::Compile { file, out } => {
            let log = macrotape::persistence::load(&file)?;
            macrotape::persistence::compile_to_script(&log, &out)?;
            println!("Wrote {} ({} events)", out.display(), log.len());
            Ok(())
        }
        Commands::Stats { file } => {
            let log = macrotape::persistence::load(&file)?;
            let stats = log.stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Commands::Info => {
            let info = match native_backend() {
                Ok(backend) => DisplayServerInfo::detect_with(backend.as_ref()),
                Err(e) => {
                    tracing::warn!("{}", e);
                    DisplayServerInfo::detect()
                }
            };
            println!("{info}");
            if info.is_wayland() {
                println!("Note: global input hooks are limited under Wayland; an X11 session is recommended.");
            }
            Ok(())
        }
    }
}

fn init_logging(
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,macrotape=debug"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .context("log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        // An explicit config must load cleanly
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => {
            if let Some(path) = default_config_path() {
                tracing::debug!("Using config {}", path.display());
            }
            Ok(AppConfig::load_or_default(None))
        }
    }
}

fn open_backend() -> Result<Arc<dyn InputBackend>> {
    let backend = native_backend()?;
    tracing::debug!(
        "Display server: {}",
        DisplayServerInfo::detect_with(backend.as_ref()).summary()
    );
    Ok(backend)
}

fn remember(path: &Path, event_count: usize) {
    let mut state = AppState::load_or_default();
    state.cleanup_missing_macros();
    state.add_recent_macro(path, event_count);
    if let Err(e) = state.save() {
        tracing::warn!("Failed to save app state: {}", e);
    }
}

fn record(config: AppConfig, out: &Path) -> Result<()> {
    let stop_key = config.capture.stop_key.clone();
    let mut session = MacroSession::new(open_backend()?, config);

    session.start_capture()?;
    println!("Recording... press {} to stop.", stop_key);

    let mut stdout = std::io::stdout();
    while session.is_capturing() {
        print!("\r{} events", session.live_event_count());
        let _ = stdout.flush();
        std::thread::sleep(Duration::from_millis(200));
    }
    println!();

    let stats = session.wait_for_capture()?;
    println!("Recorded {}", stats);

    if stats.total_events == 0 {
        bail!("nothing was recorded");
    }
    session.save(out)?;
    remember(out, stats.total_events);
    println!("Saved to {}", out.display());
    Ok(())
}

fn play(config: AppConfig, file: &Path) -> Result<()> {
    let (speed, loops) = (config.playback.speed, config.playback.loops);
    let mut session = MacroSession::new(open_backend()?, config);
    let stats = session.load(file)?;
    remember(file, stats.total_events);

    println!(
        "Playing {} events at {}x, {} loop(s)",
        stats.total_events, speed, loops
    );
    session.start_playback_with_defaults()?;

    let mut stdout = std::io::stdout();
    loop {
        for message in session.poll() {
            match message {
                SessionMessage::PlaybackProgress(progress) => {
                    print!(
                        "\rLoop {}/{}: {:5.1}%",
                        progress.current_loop,
                        progress.total_loops,
                        progress.fraction * 100.0
                    );
                    let _ = stdout.flush();
                }
                SessionMessage::PlaybackFinished(report) => {
                    println!();
                    match report.outcome {
                        PlaybackOutcome::Completed => println!(
                            "Playback complete: {} events in {:.2}s",
                            report.events_dispatched,
                            report.elapsed.as_secs_f64()
                        ),
                        PlaybackOutcome::Stopped => println!("Playback stopped"),
                    }
                    if report.events_skipped() > 0 {
                        println!("Skipped {} events", report.events_skipped());
                    }
                    return Ok(());
                }
                SessionMessage::PlaybackFailed(reason) => bail!("playback failed: {reason}"),
                _ => {}
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
