/// Command types for the board
///
/// Commands are the presentation layer's intents (imperative). Each one maps
/// onto exactly one engine operation, see `Engine::execute`.
use crate::engine::intake::AudioFile;
use crate::state::{Hotkey, SettingsPatch, SoundId};

/// Board commands
#[derive(Debug, Clone)]
pub enum Command {
    /// Load files onto the board
    AddFiles { files: Vec<AudioFile> },

    /// Remove one sound
    Remove { id: SoundId },

    /// Remove every sound
    Clear,

    /// Play a sound from the start
    Play { id: SoundId },

    /// Stop a sound and rewind it
    Stop { id: SoundId },

    /// Stop if playing, play otherwise
    Toggle { id: SoundId },

    /// Stop every sound
    StopAll,

    /// Move the playback position (seconds)
    Seek { id: SoundId, position: f64 },

    /// Per-sound volume, percent
    SetVolume { id: SoundId, volume: u8 },

    /// Flip the loop flag
    ToggleLoop { id: SoundId },

    /// Bind or clear a hotkey
    AssignHotkey { id: SoundId, hotkey: Option<Hotkey> },

    /// Merge a settings patch
    UpdateSettings { patch: SettingsPatch },
}

impl Command {
    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::AddFiles { files } => format!("Add {} files", files.len()),
            Command::Remove { id } => format!("Remove {}", id),
            Command::Clear => "Clear board".to_string(),
            Command::Play { id } => format!("Play {}", id),
            Command::Stop { id } => format!("Stop {}", id),
            Command::Toggle { id } => format!("Toggle {}", id),
            Command::StopAll => "Stop all".to_string(),
            Command::Seek { id, position } => format!("Seek {} to {:.2}s", id, position),
            Command::SetVolume { id, volume } => format!("Set volume of {} to {}%", id, volume),
            Command::ToggleLoop { id } => format!("Toggle loop of {}", id),
            Command::AssignHotkey { id, hotkey } => match hotkey {
                Some(key) => format!("Assign hotkey {} to {}", key, id),
                None => format!("Clear hotkey of {}", id),
            },
            Command::UpdateSettings { patch } => format!("Update settings: {:?}", patch),
        }
    }
}
