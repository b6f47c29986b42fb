/// Playback state store
///
/// Sounds in board order. Only the engine mutates it.
use serde::Serialize;

use super::settings::Settings;
use super::sound::{Hotkey, Sound, SoundId};

#[derive(Debug, Default)]
pub struct PlaybackStore {
    sounds: Vec<Sound>,
}

impl PlaybackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert in id order, which is the order sounds were added in
    pub fn insert(&mut self, sound: Sound) {
        debug_assert!(!self.contains(sound.id), "duplicate sound id {}", sound.id);
        let index = self.sounds.partition_point(|s| s.id < sound.id);
        self.sounds.insert(index, sound);
    }

    pub fn remove(&mut self, id: SoundId) -> Option<Sound> {
        let index = self.sounds.iter().position(|s| s.id == id)?;
        Some(self.sounds.remove(index))
    }

    pub fn get(&self, id: SoundId) -> Option<&Sound> {
        self.sounds.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SoundId) -> Option<&mut Sound> {
        self.sounds.iter_mut().find(|s| s.id == id)
    }

    pub fn contains(&self, id: SoundId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sound> {
        self.sounds.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Sound> {
        self.sounds.iter_mut()
    }

    pub fn ids(&self) -> Vec<SoundId> {
        self.sounds.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn clear(&mut self) {
        self.sounds.clear();
    }

    /// Sound bound to a pressed key, if any
    pub fn find_by_hotkey(&self, key: char) -> Option<&Sound> {
        self.sounds
            .iter()
            .find(|s| s.hotkey.map(|h| h.matches(key)).unwrap_or(false))
    }

    /// Bind `hotkey` to `id`, taking it away from any other sound. Returns the
    /// sound that lost the binding.
    pub fn bind_hotkey(&mut self, id: SoundId, hotkey: Option<Hotkey>) -> Option<SoundId> {
        if !self.contains(id) {
            return None;
        }

        let mut displaced = None;
        if let Some(key) = hotkey {
            for sound in self.sounds.iter_mut().filter(|s| s.id != id) {
                if sound.hotkey == Some(key) {
                    sound.hotkey = None;
                    displaced = Some(sound.id);
                }
            }
        }
        if let Some(sound) = self.get_mut(id) {
            sound.hotkey = hotkey;
        }
        displaced
    }

    /// Lowest digit hotkey neither bound to a sound nor in `reserved`
    pub fn next_free_digit(&self, reserved: &[Hotkey]) -> Option<Hotkey> {
        (1..=9)
            .filter_map(Hotkey::digit)
            .filter(|key| !reserved.contains(key))
            .find(|key| self.sounds.iter().all(|s| s.hotkey != Some(*key)))
    }

    pub fn snapshot(&self, settings: &Settings) -> BoardSnapshot {
        BoardSnapshot {
            sounds: self.sounds.clone(),
            settings: settings.clone(),
        }
    }
}

/// Everything the presentation layer needs to render the board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub sounds: Vec<Sound>,
    pub settings: Settings,
}

impl BoardSnapshot {
    pub fn sound(&self, id: SoundId) -> Option<&Sound> {
        self.sounds.iter().find(|s| s.id == id)
    }

    pub fn playing_count(&self) -> usize {
        self.sounds.iter().filter(|s| s.is_playing).count()
    }
}
