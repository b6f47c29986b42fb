use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::keyboard::Key;
use crate::engine::EngineOptions;
use crate::error::ConfigError;
use crate::state::Settings;

const APP_DIR: &str = "Soundpad";
const CONFIG_FILE: &str = "config.json";

fn default_board_dir() -> PathBuf {
    dirs::audio_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("sounds"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory whose audio files are loaded onto the board at startup
    pub board_dir: PathBuf,

    /// Master volume percent (0-100)
    pub master_volume: u8,

    /// Position refresh period in milliseconds
    pub refresh_interval_ms: u64,

    /// Minimum position drift (seconds) before the board is republished
    pub position_epsilon_secs: f64,

    /// Give up on a file whose metadata probe takes longer than this
    pub probe_timeout_ms: u64,

    /// Bind digits 1-9 to sounds in load order
    pub auto_assign_hotkeys: bool,

    /// Key that stops every sound ("Escape" or a single character)
    pub stop_all_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board_dir: default_board_dir(),
            master_volume: 80,
            refresh_interval_ms: 16, // one display frame
            position_epsilon_secs: 0.1,
            probe_timeout_ms: 10_000,
            auto_assign_hotkeys: true,
            stop_all_key: "Escape".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the platform-specific config directory.
    /// Creates default config if file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path, writing defaults there when it is missing
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| load_failed(path, e))?;
            let config: Config = serde_json::from_str(&content).map_err(|e| load_failed(path, e))?;

            tracing::info!("✓ Loaded config from: {}", path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!("✓ Created default config at: {}", path.display());
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| save_failed(path, e))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(path, e))?;
        fs::write(path, json).map_err(|e| save_failed(path, e))?;

        Ok(())
    }

    /// `<config dir>/Soundpad`, also home of the log files
    pub fn app_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::app_dir()?.join(CONFIG_FILE))
    }

    /// Get the config file path (for display purposes)
    pub fn config_path_display() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Configured stop-all key; an unparseable name falls back to Escape
    pub fn stop_all_key(&self) -> Key {
        Key::parse(&self.stop_all_key).unwrap_or_else(|| {
            tracing::warn!("Unknown stop-all key {:?}, using Escape", self.stop_all_key);
            Key::Escape
        })
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        let settings = Settings {
            master_volume: crate::audio_system::volume::clamp_percent(config.master_volume),
            ..Settings::default()
        };
        let position_epsilon = if config.position_epsilon_secs.is_finite() {
            config.position_epsilon_secs.max(0.0)
        } else {
            crate::engine::DEFAULT_POSITION_EPSILON
        };

        Self {
            refresh_interval: Duration::from_millis(config.refresh_interval_ms.max(1)),
            position_epsilon,
            probe_timeout: Duration::from_millis(config.probe_timeout_ms.max(1)),
            auto_assign_hotkeys: config.auto_assign_hotkeys,
            stop_all_key: config.stop_all_key(),
            settings,
        }
    }
}

fn load_failed(path: &Path, err: impl std::error::Error + Send + Sync + 'static) -> ConfigError {
    ConfigError::LoadFailed {
        path: path.display().to_string(),
        source: Box::new(err),
    }
}

fn save_failed(path: &Path, err: impl std::error::Error + Send + Sync + 'static) -> ConfigError {
    ConfigError::SaveFailed {
        path: path.display().to_string(),
        source: Box::new(err),
    }
}
