/// State management module
///
/// Application-visible state: the sounds on the board and the global settings.

pub mod settings;
pub mod sound;
pub mod store;

// Re-export commonly used types
pub use settings::{Settings, SettingsChange, SettingsPatch};
pub use sound::{Hotkey, Sound, SoundId};
pub use store::{BoardSnapshot, PlaybackStore};
