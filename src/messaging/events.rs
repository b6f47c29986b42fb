/// Event types for the board
///
/// Events represent things that have happened (past tense).
/// They are broadcast to all subscribers; the presentation layer re-reads the
/// snapshot when it sees one.
use crate::state::SoundId;

/// Board events
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A sound finished loading and is now on the board
    SoundAdded { id: SoundId, name: String },

    /// A sound was removed from the board
    SoundRemoved { id: SoundId },

    /// Volume, loop flag, position or hotkey of a sound changed
    SoundUpdated { id: SoundId },

    /// Playback was started
    PlaybackStarted { id: SoundId },

    /// Playback was stopped by a caller
    PlaybackStopped { id: SoundId },

    /// A non-looping sound reached its end
    PlaybackFinished { id: SoundId },

    /// The refresh loop moved the displayed position of these sounds
    PositionsChanged { ids: Vec<SoundId> },

    /// Global settings changed
    SettingsChanged,

    /// Every sound was removed
    BoardCleared,

    /// A file was not accepted by intake
    FileRejected { name: String },

    /// Absorbed failure, for diagnostics only
    ErrorOccurred { message: String, context: String },

    /// The engine was torn down
    Shutdown,
}

impl Event {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            Event::SoundAdded { name, .. } => format!("Sound added: {}", name),
            Event::SoundRemoved { id } => format!("Sound removed: {}", id),
            Event::SoundUpdated { id } => format!("Sound updated: {}", id),
            Event::PlaybackStarted { id } => format!("Playback started: {}", id),
            Event::PlaybackStopped { id } => format!("Playback stopped: {}", id),
            Event::PlaybackFinished { id } => format!("Playback finished: {}", id),
            Event::PositionsChanged { ids } => format!("Positions changed: {} sounds", ids.len()),
            Event::SettingsChanged => "Settings changed".to_string(),
            Event::BoardCleared => "Board cleared".to_string(),
            Event::FileRejected { name } => format!("File rejected: {}", name),
            Event::ErrorOccurred { message, context } => {
                format!("Error ({}): {}", context, message)
            }
            Event::Shutdown => "Shutting down".to_string(),
        }
    }

    /// The sound this event is about, if any
    pub fn sound_id(&self) -> Option<SoundId> {
        match self {
            Event::SoundAdded { id, .. }
            | Event::SoundRemoved { id }
            | Event::SoundUpdated { id }
            | Event::PlaybackStarted { id }
            | Event::PlaybackStopped { id }
            | Event::PlaybackFinished { id } => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_description() {
        let event = Event::SoundAdded {
            id: SoundId::new(4),
            name: "airhorn".to_string(),
        };
        assert_eq!(event.description(), "Sound added: airhorn");
        assert_eq!(event.sound_id(), Some(SoundId::new(4)));

        let event = Event::PositionsChanged {
            ids: vec![SoundId::new(1), SoundId::new(2)],
        };
        assert_eq!(event.description(), "Positions changed: 2 sounds");
        assert_eq!(event.sound_id(), None);

        assert_eq!(Event::Shutdown.description(), "Shutting down");
    }
}
