//! Audio engine
//!
//! Coordinates the sound registry (playback resources), the playback state
//! store (what gets rendered) and the source store (the loaded bytes), and owns
//! the two background tasks: the position refresh loop and the keyboard
//! listener.
//!
//! Every operation takes the board lock for its whole duration, so mutations
//! never interleave. Operations on unknown ids are no-ops; failures are logged
//! and published on the event bus, never returned, except through the ticket
//! of `add_sound`.

pub mod intake;
pub mod keyboard;
mod refresh;
pub mod registry;
pub mod ticket;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::audio_system::{effective_gain, AudioBackend, EndedCallback, SourceBytes, SourceRef, SourceStore};
use crate::error::{AddSoundError, ProbeError};
use crate::messaging::{Command, Event, EventBus, SubscriberId};
use crate::state::{BoardSnapshot, Hotkey, PlaybackStore, Settings, SettingsPatch, Sound, SoundId};

use intake::AudioFile;
use keyboard::{Key, KeyEvent, KeyboardListener};
use refresh::RefreshLoop;
use registry::SoundRegistry;
use ticket::{AddSoundResult, AddSoundTicket};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(16);
pub const DEFAULT_POSITION_EPSILON: f64 = 0.1;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Period of the position refresh loop
    pub refresh_interval: Duration,

    /// Minimum drift (seconds) before a position is republished
    pub position_epsilon: f64,

    /// How long a metadata probe may take before the sound is given up
    pub probe_timeout: Duration,

    /// Give new sounds the lowest free digit hotkey
    pub auto_assign_hotkeys: bool,

    /// Reserved key that stops every sound
    pub stop_all_key: Key,

    /// Initial settings
    pub settings: Settings,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            position_epsilon: DEFAULT_POSITION_EPSILON,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            auto_assign_hotkeys: false,
            stop_all_key: Key::Escape,
            settings: Settings::default(),
        }
    }
}

/// A sound whose metadata probe has not settled yet
struct PendingSound {
    source: SourceRef,
    file_name: String,
    /// Digit reserved at intake so hotkeys follow add order
    hotkey: Option<Hotkey>,
    cancelled: bool,
}

enum ProbeOutcome {
    Finished(Result<f64, ProbeError>),
    TimedOut,
}

#[derive(Default)]
struct BoardState {
    sounds: PlaybackStore,
    settings: Settings,
    registry: SoundRegistry,
    sources: SourceStore,
    pending: HashMap<SoundId, PendingSound>,
    shut_down: bool,
}

pub(crate) struct EngineCore {
    backend: Arc<dyn AudioBackend>,
    options: EngineOptions,
    board: Mutex<BoardState>,
    bus: EventBus,
    ended_tx: Sender<SoundId>,
    ended_rx: Receiver<SoundId>,
    next_id: AtomicU64,
    refresh_runs: AtomicU64,
}

impl EngineCore {
    fn new(backend: Arc<dyn AudioBackend>, options: EngineOptions) -> Self {
        let (ended_tx, ended_rx) = unbounded();
        let board = BoardState {
            settings: options.settings.clone(),
            ..BoardState::default()
        };
        Self {
            backend,
            options,
            board: Mutex::new(board),
            bus: EventBus::new(),
            ended_tx,
            ended_rx,
            next_id: AtomicU64::new(1),
            refresh_runs: AtomicU64::new(0),
        }
    }

    /// Lock the board, applying end-of-playback notifications first
    fn board(&self) -> MutexGuard<'_, BoardState> {
        let mut board = self.board.lock();
        self.apply_ended(&mut board);
        board
    }

    fn apply_ended(&self, board: &mut BoardState) {
        while let Ok(id) = self.ended_rx.try_recv() {
            if let Some(sound) = board.sounds.get_mut(id) {
                if sound.is_playing {
                    sound.reset_transport();
                    debug!("{} finished", id);
                    self.bus.publish(Event::PlaybackFinished { id });
                }
            }
        }
    }

    fn ended_callback(&self, id: SoundId) -> EndedCallback {
        let ended = self.ended_tx.clone();
        Arc::new(move || {
            let _ = ended.send(id);
        })
    }

    fn report(&self, context: &str, message: String) {
        warn!("{}: {}", context, message);
        self.bus.publish(Event::ErrorOccurred {
            message,
            context: context.to_string(),
        });
    }

    // ----- intake -----

    fn add_sound(self: &Arc<Self>, file: AudioFile) -> AddSoundTicket {
        let id = SoundId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (result_tx, result_rx) = bounded(1);
        let ticket = AddSoundTicket::new(id, file.name.clone(), result_rx);

        if !file.is_supported() {
            debug!("Rejected unsupported file {}", file.name);
            self.bus.publish(Event::FileRejected {
                name: file.name.clone(),
            });
            let _ = result_tx.send(Err(AddSoundError::Rejected { name: file.name }));
            return ticket;
        }

        let extension = file.extension();
        let name = file.name;
        let bytes = SourceBytes::new(file.bytes);
        {
            let mut board = self.board.lock();
            if board.shut_down {
                let _ = result_tx.send(Err(AddSoundError::EngineShutDown));
                return ticket;
            }
            let hotkey = if self.options.auto_assign_hotkeys {
                let reserved: Vec<Hotkey> = board.pending.values().filter_map(|p| p.hotkey).collect();
                board.sounds.next_free_digit(&reserved)
            } else {
                None
            };
            let source = board.sources.create(bytes.clone());
            board.pending.insert(
                id,
                PendingSound {
                    source,
                    file_name: name.clone(),
                    hotkey,
                    cancelled: false,
                },
            );
        }
        debug!("Probing {} ({} bytes) as {}", name, bytes.len(), id);

        let core = Arc::downgrade(self);
        let backend = Arc::clone(&self.backend);
        let timeout = self.options.probe_timeout;
        let spawned = thread::Builder::new()
            .name(format!("soundpad-probe-{}", id))
            .spawn(move || {
                let outcome = run_probe(backend, bytes, extension, timeout);
                let result = match core.upgrade() {
                    Some(core) => core.settle(id, &name, outcome),
                    None => Err(AddSoundError::EngineShutDown),
                };
                let _ = result_tx.send(result);
            });

        if let Err(err) = spawned {
            // The closure (and the result sender) was dropped with the error
            self.report("add_sound", format!("Failed to start probe thread: {}", err));
            let mut board = self.board.lock();
            if let Some(pending) = board.pending.remove(&id) {
                board.sources.revoke(pending.source);
            }
        }

        ticket
    }

    fn settle(&self, id: SoundId, name: &str, outcome: ProbeOutcome) -> AddSoundResult {
        let mut board = self.board();

        let Some(pending) = board.pending.remove(&id) else {
            // Cleared or torn down while probing; sources are already revoked
            return Err(if board.shut_down {
                AddSoundError::EngineShutDown
            } else {
                AddSoundError::Cancelled {
                    name: name.to_string(),
                }
            });
        };

        if pending.cancelled {
            board.sources.revoke(pending.source);
            debug!("Discarded probe result for removed {}", id);
            return Err(AddSoundError::Cancelled {
                name: name.to_string(),
            });
        }

        let duration = match outcome {
            ProbeOutcome::Finished(Ok(duration)) => duration,
            ProbeOutcome::Finished(Err(source)) => {
                board.sources.revoke(pending.source);
                self.report("add_sound", format!("Failed to read metadata for {}: {}", name, source));
                return Err(AddSoundError::Probe {
                    name: name.to_string(),
                    source,
                });
            }
            ProbeOutcome::TimedOut => {
                board.sources.revoke(pending.source);
                let timeout_ms = self.options.probe_timeout.as_millis() as u64;
                self.report("add_sound", format!("Metadata probe for {} timed out", name));
                return Err(AddSoundError::TimedOut {
                    name: name.to_string(),
                    timeout_ms,
                });
            }
        };

        let mut sound = Sound::new(
            id,
            pending.source,
            pending.file_name.as_str(),
            intake::display_name(&pending.file_name),
            duration,
        );
        // The reserved digit may have been bound by hand in the meantime
        sound.hotkey = pending
            .hotkey
            .filter(|key| board.sounds.find_by_hotkey(key.as_char()).is_none());

        info!(
            "✓ Loaded {} as {} ({:.2}s, hotkey {})",
            sound.display_name,
            id,
            sound.duration,
            sound.hotkey.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string())
        );
        board.sounds.insert(sound.clone());
        self.bus.publish(Event::SoundAdded {
            id,
            name: sound.display_name.clone(),
        });
        Ok(sound)
    }

    fn remove_sound(&self, id: SoundId) {
        let mut board = self.board();

        if let Some(pending) = board.pending.get_mut(&id) {
            pending.cancelled = true;
            debug!("Cancelled loading of {}", id);
            return;
        }

        board.registry.release(id);
        if let Some(sound) = board.sounds.remove(id) {
            board.sources.revoke(sound.source);
            info!("Removed {} ({})", sound.display_name, id);
            self.bus.publish(Event::SoundRemoved { id });
        }
    }

    fn clear(&self) {
        let mut board = self.board();
        let BoardState {
            sounds,
            registry,
            sources,
            pending,
            ..
        } = &mut *board;

        registry.release_all();
        sources.revoke_all();
        pending.clear();
        let count = sounds.len();
        sounds.clear();

        info!("Cleared board ({} sounds)", count);
        self.bus.publish(Event::BoardCleared);
    }

    // ----- transport -----

    fn play_locked(&self, board: &mut BoardState, id: SoundId) {
        if board.settings.is_muted {
            debug!("Ignoring play of {} while muted", id);
            return;
        }

        let BoardState {
            sounds,
            settings,
            registry,
            sources,
            ..
        } = board;
        let Some(sound) = sounds.get_mut(id) else {
            return;
        };
        let Some(bytes) = sources.resolve(sound.source) else {
            self.report("play", format!("Source of {} was already released", id));
            return;
        };

        let resource = match registry.ensure(id, &bytes, self.backend.as_ref(), || {
            self.ended_callback(id)
        }) {
            Ok(resource) => resource,
            Err(err) => {
                self.report("play", format!("Failed to load {}: {}", sound.display_name, err));
                return;
            }
        };

        if let Err(err) = resource.seek(0.0) {
            warn!("Failed to rewind {}: {}", id, err);
        }
        resource.set_volume(effective_gain(sound.volume, settings.master_volume));
        resource.set_loop(sound.is_looping);
        resource.set_muted(settings.is_muted);
        let started = resource.play();

        // Marked playing even when the start failed: attempted, not confirmed
        sound.is_playing = true;
        sound.current_time = 0.0;

        if let Err(err) = started {
            self.report("play", format!("Failed to start {}: {}", sound.display_name, err));
        } else {
            debug!("Playing {}", id);
        }
        self.bus.publish(Event::PlaybackStarted { id });
    }

    fn stop_locked(&self, board: &mut BoardState, id: SoundId) {
        let Some(sound) = board.sounds.get_mut(id) else {
            return;
        };
        if let Some(resource) = board.registry.get_mut(id) {
            resource.pause();
            if let Err(err) = resource.seek(0.0) {
                warn!("Failed to rewind {}: {}", id, err);
            }
        }

        let was_playing = sound.is_playing;
        sound.reset_transport();
        if was_playing {
            debug!("Stopped {}", id);
            self.bus.publish(Event::PlaybackStopped { id });
        }
    }

    fn toggle_locked(&self, board: &mut BoardState, id: SoundId) {
        let Some(playing) = board.sounds.get(id).map(|s| s.is_playing) else {
            return;
        };
        if playing {
            self.stop_locked(board, id);
        } else {
            self.play_locked(board, id);
        }
    }

    fn stop_all_locked(&self, board: &mut BoardState) {
        for id in board.sounds.ids() {
            self.stop_locked(board, id);
        }
    }

    fn play(&self, id: SoundId) {
        let mut board = self.board();
        self.play_locked(&mut board, id);
    }

    fn stop(&self, id: SoundId) {
        let mut board = self.board();
        self.stop_locked(&mut board, id);
    }

    fn toggle(&self, id: SoundId) {
        let mut board = self.board();
        self.toggle_locked(&mut board, id);
    }

    fn stop_all(&self) {
        let mut board = self.board();
        self.stop_all_locked(&mut board);
        debug!("Stopped all sounds");
    }

    fn seek(&self, id: SoundId, position: f64) {
        let mut board = self.board();
        let BoardState {
            sounds, registry, ..
        } = &mut *board;
        let Some(sound) = sounds.get_mut(id) else {
            return;
        };

        let position = sound.clamp_position(position);
        if let Some(resource) = registry.get_mut(id) {
            if let Err(err) = resource.seek(position) {
                self.report("seek", err.to_string());
            }
        }
        sound.current_time = position;
        self.bus.publish(Event::SoundUpdated { id });
    }

    // ----- per-sound settings -----

    fn set_volume(&self, id: SoundId, volume: u8) {
        let mut board = self.board();
        let BoardState {
            sounds,
            settings,
            registry,
            ..
        } = &mut *board;
        let Some(sound) = sounds.get_mut(id) else {
            return;
        };

        sound.volume = crate::audio_system::volume::clamp_percent(volume);
        if let Some(resource) = registry.get_mut(id) {
            resource.set_volume(effective_gain(sound.volume, settings.master_volume));
        }
        self.bus.publish(Event::SoundUpdated { id });
    }

    fn toggle_loop(&self, id: SoundId) {
        let mut board = self.board();
        let BoardState {
            sounds, registry, ..
        } = &mut *board;
        let Some(sound) = sounds.get_mut(id) else {
            return;
        };

        sound.is_looping = !sound.is_looping;
        if let Some(resource) = registry.get_mut(id) {
            resource.set_loop(sound.is_looping);
        }
        debug!("{} looping: {}", id, sound.is_looping);
        self.bus.publish(Event::SoundUpdated { id });
    }

    fn set_hotkey(&self, id: SoundId, hotkey: Option<Hotkey>) {
        let mut board = self.board();
        if !board.sounds.contains(id) {
            return;
        }

        if let Some(displaced) = board.sounds.bind_hotkey(id, hotkey) {
            debug!("Hotkey moved from {} to {}", displaced, id);
            self.bus.publish(Event::SoundUpdated { id: displaced });
        }
        self.bus.publish(Event::SoundUpdated { id });
    }

    fn update_settings(&self, patch: SettingsPatch) {
        let mut board = self.board();
        let BoardState {
            sounds,
            settings,
            registry,
            ..
        } = &mut *board;

        let change = settings.apply(patch);
        if change.master_volume {
            for sound in sounds.iter() {
                if let Some(resource) = registry.get_mut(sound.id) {
                    resource.set_volume(effective_gain(sound.volume, settings.master_volume));
                }
            }
        }
        if change.is_muted {
            for id in registry.ids() {
                if let Some(resource) = registry.get_mut(id) {
                    resource.set_muted(settings.is_muted);
                }
            }
        }

        if change.any() {
            debug!(
                "Settings: master {}%, muted {}, device {}",
                settings.master_volume, settings.is_muted, settings.selected_output_device
            );
            self.bus.publish(Event::SettingsChanged);
        }
    }

    // ----- background callbacks -----

    /// One run of the position refresh loop
    fn refresh(&self) {
        self.refresh_runs.fetch_add(1, Ordering::Relaxed);
        let mut board = self.board();
        let BoardState {
            sounds, registry, ..
        } = &mut *board;

        let mut moved = Vec::new();
        for sound in sounds.iter_mut().filter(|s| s.is_playing) {
            let Some(resource) = registry.get_mut(sound.id) else {
                continue;
            };
            let position = sound.clamp_position(resource.position());
            if (position - sound.current_time).abs() > self.options.position_epsilon {
                sound.current_time = position;
                moved.push(sound.id);
            }
        }

        if !moved.is_empty() {
            self.bus.publish(Event::PositionsChanged { ids: moved });
        }
    }

    /// Dispatch one key-down event; returns whether it was consumed
    fn handle_key(&self, event: KeyEvent) -> bool {
        if event.text_input_focused {
            return false;
        }

        let mut board = self.board();
        if event.key.same_key(&self.options.stop_all_key) {
            self.stop_all_locked(&mut board);
            debug!("Stop-all key pressed");
            return true;
        }

        let Key::Char(c) = event.key else {
            return false;
        };
        let Some(id) = board.sounds.find_by_hotkey(c).map(|s| s.id) else {
            return false;
        };
        self.toggle_locked(&mut board, id);
        true
    }

    fn teardown(&self) {
        let mut board = self.board.lock();
        if board.shut_down {
            return;
        }
        board.shut_down = true;

        let BoardState {
            sounds,
            registry,
            sources,
            pending,
            ..
        } = &mut *board;
        registry.release_all();
        sources.revoke_all();
        pending.clear();
        sounds.clear();

        info!("Audio engine shut down");
        self.bus.publish(Event::Shutdown);
    }
}

fn run_probe(
    backend: Arc<dyn AudioBackend>,
    bytes: SourceBytes,
    extension: Option<String>,
    timeout: Duration,
) -> ProbeOutcome {
    let (tx, rx) = bounded(1);
    let spawned = thread::Builder::new()
        .name("soundpad-probe-worker".to_string())
        .spawn(move || {
            let _ = tx.send(backend.probe_duration(&bytes, extension.as_deref()));
        });
    if spawned.is_err() {
        return ProbeOutcome::Finished(Err(ProbeError::SourceReleased));
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => ProbeOutcome::Finished(result),
        Err(RecvTimeoutError::Timeout) => ProbeOutcome::TimedOut,
        // Worker panicked
        Err(RecvTimeoutError::Disconnected) => ProbeOutcome::Finished(Err(ProbeError::NoTrack)),
    }
}

/// Background tasks owned by one engine
struct BackgroundTasks {
    // Field order is drop order: stop refreshing before dropping key input
    _refresh: RefreshLoop,
    keyboard: KeyboardListener,
}

/// The soundboard audio engine
///
/// Construct once, share by reference (or `Arc<Engine>`), and drop or call
/// `shutdown` to tear everything down.
pub struct Engine {
    core: Arc<EngineCore>,
    tasks: Mutex<Option<BackgroundTasks>>,
}

impl Engine {
    /// Create the engine and start its refresh loop and keyboard listener
    pub fn new(backend: Arc<dyn AudioBackend>, options: EngineOptions) -> std::io::Result<Self> {
        let interval = options.refresh_interval;
        let core = Arc::new(EngineCore::new(backend, options));

        let refresh = RefreshLoop::start(Arc::downgrade(&core), interval)?;
        let keyboard = KeyboardListener::install(Arc::downgrade(&core))?;

        info!("✓ Audio engine started");
        Ok(Self {
            core,
            tasks: Mutex::new(Some(BackgroundTasks {
                _refresh: refresh,
                keyboard,
            })),
        })
    }

    /// Accept one file. The returned ticket resolves once the sound is on the
    /// board (metadata known) or has failed to load.
    pub fn add_sound(&self, file: AudioFile) -> AddSoundTicket {
        self.core.add_sound(file)
    }

    /// Accept several files; unsupported ones are dropped
    pub fn add_files(&self, files: Vec<AudioFile>) -> Vec<AddSoundTicket> {
        let (accepted, rejected) = intake::partition(files);
        for file in rejected {
            debug!("Skipping unsupported file {}", file.name);
            self.core.bus.publish(Event::FileRejected { name: file.name });
        }
        accepted.into_iter().map(|file| self.add_sound(file)).collect()
    }

    pub fn remove_sound(&self, id: SoundId) {
        self.core.remove_sound(id);
    }

    /// Remove every sound
    pub fn clear(&self) {
        self.core.clear();
    }

    pub fn play(&self, id: SoundId) {
        self.core.play(id);
    }

    pub fn stop(&self, id: SoundId) {
        self.core.stop(id);
    }

    pub fn toggle(&self, id: SoundId) {
        self.core.toggle(id);
    }

    pub fn stop_all(&self) {
        self.core.stop_all();
    }

    pub fn set_volume(&self, id: SoundId, volume: u8) {
        self.core.set_volume(id, volume);
    }

    pub fn seek(&self, id: SoundId, position: f64) {
        self.core.seek(id, position);
    }

    pub fn toggle_loop(&self, id: SoundId) {
        self.core.toggle_loop(id);
    }

    pub fn set_hotkey(&self, id: SoundId, hotkey: Option<Hotkey>) {
        self.core.set_hotkey(id, hotkey);
    }

    pub fn update_settings(&self, patch: SettingsPatch) {
        self.core.update_settings(patch);
    }

    /// Run one intent of the presentation layer
    pub fn execute(&self, command: Command) {
        debug!("Executing command: {}", command.description());
        match command {
            Command::AddFiles { files } => {
                self.add_files(files);
            }
            Command::Remove { id } => self.remove_sound(id),
            Command::Clear => self.clear(),
            Command::Play { id } => self.play(id),
            Command::Stop { id } => self.stop(id),
            Command::Toggle { id } => self.toggle(id),
            Command::StopAll => self.stop_all(),
            Command::Seek { id, position } => self.seek(id, position),
            Command::SetVolume { id, volume } => self.set_volume(id, volume),
            Command::ToggleLoop { id } => self.toggle_loop(id),
            Command::AssignHotkey { id, hotkey } => self.set_hotkey(id, hotkey),
            Command::UpdateSettings { patch } => self.update_settings(patch),
        }
    }

    /// Dispatch a key-down event synchronously; returns whether it was consumed
    pub fn handle_key(&self, event: KeyEvent) -> bool {
        self.core.handle_key(event)
    }

    /// Channel into the keyboard listener; `None` after shutdown
    pub fn key_sender(&self) -> Option<Sender<KeyEvent>> {
        self.tasks.lock().as_ref().map(|tasks| tasks.keyboard.sender())
    }

    /// Run the position refresh callback once, outside the loop's schedule
    pub fn refresh(&self) {
        self.core.refresh();
    }

    /// How many times the refresh callback has run
    pub fn refresh_runs(&self) -> u64 {
        self.core.refresh_runs.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let board = self.core.board();
        board.sounds.snapshot(&board.settings)
    }

    pub fn sound(&self, id: SoundId) -> Option<Sound> {
        self.core.board().sounds.get(id).cloned()
    }

    pub fn settings(&self) -> Settings {
        self.core.board().settings.clone()
    }

    /// Number of live playback resources
    pub fn resource_count(&self) -> usize {
        self.core.board.lock().registry.len()
    }

    /// Number of source references not yet released
    pub fn live_sources(&self) -> usize {
        self.core.board.lock().sources.live_count()
    }

    pub fn subscribe(&self) -> (Receiver<Event>, SubscriberId) {
        self.core.bus.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.core.bus.unsubscribe(id);
    }

    pub fn is_running(&self) -> bool {
        self.tasks.lock().is_some()
    }

    /// Stop the background tasks and release every resource and source.
    /// Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        let Some(tasks) = self.tasks.lock().take() else {
            return;
        };
        // Joins both threads; the board lock is not held here
        drop(tasks);
        self.core.teardown();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
