/// Playback resource capability set
///
/// The engine drives every sound through this trait. `RodioResource` is the
/// real implementation; tests use `testutil::FakeResource`.
use std::sync::Arc;

use crate::error::{AudioError, ProbeError};

use super::source::SourceBytes;

/// Called by a resource when non-looping playback reaches the end
pub type EndedCallback = Arc<dyn Fn() + Send + Sync>;

/// Live playback handle bound to one sound's bytes
pub trait SoundResource: Send {
    /// Start or resume playback from the current position
    fn play(&mut self) -> Result<(), AudioError>;

    /// Pause playback, keeping the position
    fn pause(&mut self);

    /// Move the playback position (seconds)
    fn seek(&mut self, position: f64) -> Result<(), AudioError>;

    /// Current playback position (seconds)
    fn position(&self) -> f64;

    /// Linear gain, 0.0-1.0
    fn set_volume(&mut self, gain: f32);

    /// Silence output without touching the gain
    fn set_muted(&mut self, muted: bool);

    /// Restart at 0 on reaching the end instead of stopping
    fn set_loop(&mut self, looping: bool);

    /// Register the end-of-playback notification
    fn on_ended(&mut self, callback: EndedCallback);

    /// Stop playback and drop the bound source. The resource is unusable afterwards.
    fn detach(&mut self);
}

/// Factory for resources and metadata
pub trait AudioBackend: Send + Sync {
    /// Create ("load") a resource bound to the given bytes
    fn create_resource(&self, source: &SourceBytes) -> Result<Box<dyn SoundResource>, AudioError>;

    /// Determine the duration of the encoded audio, in seconds
    fn probe_duration(&self, source: &SourceBytes, extension: Option<&str>) -> Result<f64, ProbeError>;
}
