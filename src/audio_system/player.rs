/// rodio-backed sound resource
///
/// Each resource owns at most one `Sink`. A fresh sink is built whenever playback
/// starts on an empty or finished queue; pause/seek/resume go through the live
/// sink otherwise.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rodio::source::EmptyCallback;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use crate::error::{AudioError, ProbeError};

use super::looping::{open_decoder, PlaybackCursor, PlaybackSource};
use super::probe;
use super::resource::{AudioBackend, EndedCallback, SoundResource};
use super::source::SourceBytes;
use super::volume::output_gain;

/// Individual pad player
pub struct RodioResource {
    handle: OutputStreamHandle,
    bytes: Option<SourceBytes>,
    sink: Option<Sink>,
    looping: Arc<AtomicBool>,
    cursor: Arc<PlaybackCursor>,
    /// Bumped on every new sink; end callbacks from older sinks are ignored
    generation: Arc<AtomicU64>,
    on_ended: Option<EndedCallback>,
    gain: f32,
    muted: bool,
    /// Where the next fresh sink starts
    start_at: f64,
}

impl RodioResource {
    pub fn new(handle: OutputStreamHandle, bytes: SourceBytes) -> Self {
        Self {
            handle,
            bytes: Some(bytes),
            sink: None,
            looping: Arc::new(AtomicBool::new(false)),
            cursor: Arc::new(PlaybackCursor::new()),
            generation: Arc::new(AtomicU64::new(0)),
            on_ended: None,
            gain: 1.0,
            muted: false,
            start_at: 0.0,
        }
    }

    fn has_queued_audio(&self) -> bool {
        self.sink.as_ref().map(|sink| !sink.empty()).unwrap_or(false)
    }

    fn start_fresh_sink(&mut self) -> Result<(), AudioError> {
        let bytes = self.bytes.clone().ok_or(AudioError::SourceReleased)?;
        let sink =
            Sink::try_new(&self.handle).map_err(|err| AudioError::PlaybackFailed(Box::new(err)))?;

        let mut source =
            PlaybackSource::new(bytes, Arc::clone(&self.looping), Arc::clone(&self.cursor))?;
        if self.start_at > 0.0 {
            let position = self.start_at;
            source
                .try_seek(Duration::from_secs_f64(position))
                .map_err(|err| AudioError::SeekFailed {
                    position,
                    source: err.to_string().into(),
                })?;
        } else {
            self.cursor.set_position(0.0);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let on_ended = self.on_ended.clone();

        sink.set_volume(output_gain(self.gain, self.muted));
        sink.append(source);
        sink.append(EmptyCallback::<i16>::new(Box::new(move || {
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Some(callback) = &on_ended {
                callback();
            }
        })));
        sink.play();

        if let Some(previous) = self.sink.replace(sink) {
            previous.stop();
        }
        self.start_at = 0.0;
        Ok(())
    }
}

impl SoundResource for RodioResource {
    fn play(&mut self) -> Result<(), AudioError> {
        if self.has_queued_audio() {
            if let Some(sink) = &self.sink {
                sink.play();
            }
            return Ok(());
        }
        self.start_fresh_sink()
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn seek(&mut self, position: f64) -> Result<(), AudioError> {
        let position = position.max(0.0);
        if self.has_queued_audio() {
            if let Some(sink) = &self.sink {
                return sink
                    .try_seek(Duration::from_secs_f64(position))
                    .map_err(|err| AudioError::SeekFailed {
                        position,
                        source: err.to_string().into(),
                    });
            }
        }
        self.start_at = position;
        self.cursor.set_position(position);
        Ok(())
    }

    fn position(&self) -> f64 {
        self.cursor.position()
    }

    fn set_volume(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(output_gain(self.gain, self.muted));
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(sink) = &self.sink {
            sink.set_volume(output_gain(self.gain, self.muted));
        }
    }

    fn set_loop(&mut self, looping: bool) {
        self.looping.store(looping, Ordering::Relaxed);
    }

    fn on_ended(&mut self, callback: EndedCallback) {
        self.on_ended = Some(callback);
    }

    fn detach(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.bytes = None;
    }
}

/// Backend producing `RodioResource`s on one output stream
#[derive(Clone)]
pub struct RodioBackend {
    handle: OutputStreamHandle,
}

impl RodioBackend {
    pub fn new(handle: OutputStreamHandle) -> Self {
        Self { handle }
    }

    /// Open the default output device.
    ///
    /// The returned `OutputStream` must stay alive (on the thread that opened
    /// it) for as long as sounds should be audible.
    pub fn open_default() -> Result<(OutputStream, Self), AudioError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|err| AudioError::OutputUnavailable(Box::new(err)))?;
        tracing::info!("✓ Audio output opened");
        Ok((stream, Self::new(handle)))
    }
}

impl AudioBackend for RodioBackend {
    fn create_resource(&self, source: &SourceBytes) -> Result<Box<dyn SoundResource>, AudioError> {
        // Verify the audio can be decoded before handing out a resource
        open_decoder(source)?;
        Ok(Box::new(RodioResource::new(self.handle.clone(), source.clone())))
    }

    fn probe_duration(&self, source: &SourceBytes, extension: Option<&str>) -> Result<f64, ProbeError> {
        probe::probe_duration(source, extension)
    }
}
