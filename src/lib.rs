//! Soundpad: a soundboard audio engine
//!
//! Loads audio files into sounds, plays any number of them at once, and keeps a
//! renderable board state (positions, volumes, loop flags, hotkeys) in sync with
//! the playing audio.
//!
//! ```rust,ignore
//! let (_stream, backend) = RodioBackend::open_default()?;
//! let engine = Engine::new(Arc::new(backend), EngineOptions::default())?;
//!
//! let sound = engine.add_sound(AudioFile::from_path(path)?).wait()?;
//! engine.play(sound.id);
//! ```

pub mod audio_system;
pub mod config;
pub mod engine;
pub mod error;
pub mod messaging;
pub mod state;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use audio_system::{AudioBackend, RodioBackend, SoundResource};
pub use config::Config;
pub use engine::intake::AudioFile;
pub use engine::keyboard::{Key, KeyEvent};
pub use engine::ticket::AddSoundTicket;
pub use engine::{Engine, EngineOptions};
pub use error::{AddSoundError, AudioError, ConfigError};
pub use messaging::{Command, Event, EventBus, SubscriberId};
pub use state::{BoardSnapshot, Hotkey, Settings, SettingsPatch, Sound, SoundId};
