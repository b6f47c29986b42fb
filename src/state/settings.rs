/// Engine-wide playback settings
use serde::{Deserialize, Serialize};

use crate::audio_system::volume::clamp_percent;

pub const DEFAULT_MASTER_VOLUME: u8 = 80;
pub const DEFAULT_OUTPUT_DEVICE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Percent, 0-100; multiplies every sound's gain
    pub master_volume: u8,

    /// Silences output without touching any stored volume
    pub is_muted: bool,

    /// Reserved for device routing; not wired to playback
    pub selected_output_device: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: DEFAULT_MASTER_VOLUME,
            is_muted: false,
            selected_output_device: DEFAULT_OUTPUT_DEVICE.to_string(),
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub master_volume: Option<u8>,
    #[serde(default)]
    pub is_muted: Option<bool>,
    #[serde(default)]
    pub selected_output_device: Option<String>,
}

impl SettingsPatch {
    pub fn master_volume(volume: u8) -> Self {
        Self {
            master_volume: Some(volume),
            ..Self::default()
        }
    }

    pub fn muted(muted: bool) -> Self {
        Self {
            is_muted: Some(muted),
            ..Self::default()
        }
    }

    pub fn with_output_device(mut self, device: impl Into<String>) -> Self {
        self.selected_output_device = Some(device.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.master_volume.is_none() && self.is_muted.is_none() && self.selected_output_device.is_none()
    }
}

/// Which fields a merge actually changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsChange {
    pub master_volume: bool,
    pub is_muted: bool,
    pub selected_output_device: bool,
}

impl SettingsChange {
    pub fn any(&self) -> bool {
        self.master_volume || self.is_muted || self.selected_output_device
    }
}

impl Settings {
    /// Merge a patch into the settings
    pub fn apply(&mut self, patch: SettingsPatch) -> SettingsChange {
        let mut change = SettingsChange::default();

        if let Some(volume) = patch.master_volume {
            let volume = clamp_percent(volume);
            change.master_volume = volume != self.master_volume;
            self.master_volume = volume;
        }
        if let Some(muted) = patch.is_muted {
            change.is_muted = muted != self.is_muted;
            self.is_muted = muted;
        }
        if let Some(device) = patch.selected_output_device {
            change.selected_output_device = device != self.selected_output_device;
            self.selected_output_device = device;
        }

        change
    }
}
