/// Per-sound application state
///
/// What the presentation layer renders for one pad.
use std::fmt;

use serde::Serialize;

use crate::audio_system::source::SourceRef;
use crate::audio_system::volume::MAX_VOLUME;

/// Opaque sound identifier, stable for the sound's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SoundId(u64);

impl SoundId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

/// Single-character trigger, case-insensitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Hotkey(char);

impl Hotkey {
    /// Normalize a key character. Whitespace and control characters are not
    /// usable as triggers.
    pub fn new(key: char) -> Option<Self> {
        if key.is_whitespace() || key.is_control() {
            return None;
        }
        key.to_uppercase().next().map(Self)
    }

    /// Parse a hotkey from a one-character string
    pub fn parse(key: &str) -> Option<Self> {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::new(c),
            _ => None,
        }
    }

    /// Hotkey for pad `1`-`9`
    pub fn digit(n: u32) -> Option<Self> {
        if (1..=9).contains(&n) {
            char::from_digit(n, 10).map(Self)
        } else {
            None
        }
    }

    pub fn as_char(&self) -> char {
        self.0
    }

    /// Case-insensitive match against a pressed character
    pub fn matches(&self, key: char) -> bool {
        Self::new(key).map(|k| k == *self).unwrap_or(false)
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One loaded sound
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sound {
    pub id: SoundId,
    pub source: SourceRef,
    pub file_name: String,
    pub display_name: String,
    /// Seconds
    pub duration: f64,
    /// Last broadcast position, seconds
    pub current_time: f64,
    /// Percent, 0-100
    pub volume: u8,
    pub is_looping: bool,
    pub is_playing: bool,
    pub hotkey: Option<Hotkey>,
}

impl Sound {
    pub fn new(
        id: SoundId,
        source: SourceRef,
        file_name: impl Into<String>,
        display_name: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            id,
            source,
            file_name: file_name.into(),
            display_name: display_name.into(),
            duration: sanitize_duration(duration),
            current_time: 0.0,
            volume: MAX_VOLUME,
            is_looping: false,
            is_playing: false,
            hotkey: None,
        }
    }

    /// Clamp a requested position into [0, duration]
    pub fn clamp_position(&self, position: f64) -> f64 {
        if position.is_nan() {
            return 0.0;
        }
        position.clamp(0.0, self.duration)
    }

    /// Playback stopped: not playing, back at the start
    pub fn reset_transport(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
    }
}

fn sanitize_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}
