pub mod looping;
pub mod player;
pub mod probe;
pub mod resource;
/// Audio system module
///
/// Everything below the engine: byte sources, metadata probing and the playback
/// resources bound to them.
///
/// ## Architecture
///
/// ```text
/// AudioBackend (RodioBackend)
///   ├── probe_duration()  ── symphonia
///   └── create_resource() ── RodioResource
///                              └── Sink
///                                  ├── PlaybackSource (decoder, loop flag, cursor)
///                                  └── EmptyCallback  (end of playback)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let (_stream, backend) = RodioBackend::open_default()?;
/// let bytes = SourceBytes::new(std::fs::read("airhorn.mp3")?);
///
/// let duration = backend.probe_duration(&bytes, Some("mp3"))?;
/// let mut resource = backend.create_resource(&bytes)?;
/// resource.set_volume(effective_gain(100, 80));
/// resource.play()?;
/// ```
pub mod source;
pub mod volume;

// Re-export commonly used types
pub use player::{RodioBackend, RodioResource};
pub use resource::{AudioBackend, EndedCallback, SoundResource};
pub use source::{SourceBytes, SourceRef, SourceStore};
pub use volume::effective_gain;
