use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use walkdir::WalkDir;

use soundpad::error::AppResult;
use soundpad::{AudioFile, Config, Engine, EngineOptions, Event, Key, KeyEvent, RodioBackend};

const LOG_TARGET_STARTUP: &str = "soundpad::startup";

/// Initialize tracing with file rotation
///
/// Logs are written to `<config dir>/Soundpad/logs/soundpad.YYYY-MM-DD.log`.
///
/// Log output:
/// - Debug builds: Console + File
/// - Release builds: File only
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = Config::app_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "soundpad.log");

    // Configure filter (info level by default)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    // In debug builds, also log to console
    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

/// Files directly inside the board directory, in name order
fn board_files(dir: &Path) -> AppResult<Vec<AudioFile>> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create board directory {}", dir.display()))?;
        tracing::info!("Created empty board directory {}", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        match AudioFile::from_path(entry.path()) {
            Ok(file) => files.push(file),
            Err(e) => tracing::warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }
    Ok(files)
}

fn load_board(engine: &Engine, dir: &Path) -> AppResult<()> {
    let files = board_files(dir)?;
    tracing::info!("Loading {} files from {}", files.len(), dir.display());

    let mut loaded = 0;
    for ticket in engine.add_files(files) {
        let name = ticket.name().to_string();
        match ticket.wait() {
            Ok(_) => loaded += 1,
            Err(e) => tracing::warn!("✗ {}: {}", name, e),
        }
    }

    for sound in engine.snapshot().sounds {
        let hotkey = sound
            .hotkey
            .map(|key| key.to_string())
            .unwrap_or_else(|| "-".to_string());
        tracing::info!("  [{}] {} ({:.1}s)", hotkey, sound.display_name, sound.duration);
    }
    tracing::info!("✓ {} sounds on the board", loaded);
    Ok(())
}

fn spawn_event_logger(engine: &Engine) -> AppResult<()> {
    let (events, _subscriber) = engine.subscribe();
    thread::Builder::new()
        .name("soundpad-events".to_string())
        .spawn(move || {
            for event in events {
                match &event {
                    Event::PositionsChanged { .. } => tracing::trace!("{}", event.description()),
                    Event::ErrorOccurred { .. } => tracing::warn!("{}", event.description()),
                    Event::Shutdown => break,
                    _ => tracing::debug!("{}", event.description()),
                }
            }
        })
        .context("Failed to start event logger")?;
    Ok(())
}

fn map_key(event: &rdev::Event) -> Option<Key> {
    let rdev::EventType::KeyPress(key) = event.event_type else {
        return None;
    };
    if key == rdev::Key::Escape {
        return Some(Key::Escape);
    }

    let name = event.name.as_deref()?;
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Some(Key::Char(c)),
        _ => Some(Key::Other),
    }
}

fn main() -> AppResult<()> {
    initialize_tracing();
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting Soundpad v{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!(target: LOG_TARGET_STARTUP, "Config: {}", Config::config_path_display());

    // The stream must outlive the engine
    let (_stream, backend) = RodioBackend::open_default().context("Failed to open audio output")?;

    let engine = Engine::new(Arc::new(backend), EngineOptions::from(&config))
        .context("Failed to start audio engine")?;
    spawn_event_logger(&engine)?;
    load_board(&engine, &config.board_dir)?;

    let keys = engine
        .key_sender()
        .ok_or_else(|| anyhow!("Keyboard listener is not running"))?;
    tracing::info!("Press a hotkey to toggle a sound, {} to stop all", config.stop_all_key());

    // Blocks for the lifetime of the process
    rdev::listen(move |event| {
        if let Some(key) = map_key(&event) {
            let _ = keys.send(KeyEvent::pressed(key));
        }
    })
    .map_err(|e| anyhow!("Error setting up keyboard listener: {:?}", e))?;

    engine.shutdown();
    Ok(())
}
