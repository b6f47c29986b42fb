/// Decoded playback source with live loop control and position tracking
///
/// rodio's `repeat_infinite` fixes looping at append time. Pads toggle looping
/// while playing, so the loop flag is shared with the resource and checked each
/// time the decoder runs dry.
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rodio::source::SeekError;
use rodio::{Decoder, Source};

use crate::error::AudioError;

use super::source::SourceBytes;

pub type BytesDecoder = Decoder<Cursor<Arc<[u8]>>>;

/// Playback position shared between the audio thread and the resource
#[derive(Debug, Default)]
pub struct PlaybackCursor {
    samples: AtomicU64,
    samples_per_second: AtomicU64,
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position in seconds
    pub fn position(&self) -> f64 {
        let rate = self.samples_per_second.load(Ordering::Relaxed);
        if rate == 0 {
            return 0.0;
        }
        self.samples.load(Ordering::Relaxed) as f64 / rate as f64
    }

    pub fn set_position(&self, seconds: f64) {
        let rate = self.samples_per_second.load(Ordering::Relaxed);
        let samples = (seconds.max(0.0) * rate as f64) as u64;
        self.samples.store(samples, Ordering::Relaxed);
    }

    fn set_format(&self, sample_rate: u32, channels: u16) {
        self.samples_per_second
            .store(u64::from(sample_rate) * u64::from(channels), Ordering::Relaxed);
    }

    fn advance(&self) {
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.samples.store(0, Ordering::Relaxed);
    }
}

/// Source handed to the sink for one play
pub struct PlaybackSource {
    bytes: SourceBytes,
    decoder: BytesDecoder,
    looping: Arc<AtomicBool>,
    cursor: Arc<PlaybackCursor>,
}

impl PlaybackSource {
    pub fn new(
        bytes: SourceBytes,
        looping: Arc<AtomicBool>,
        cursor: Arc<PlaybackCursor>,
    ) -> Result<Self, AudioError> {
        let decoder = open_decoder(&bytes)?;
        cursor.set_format(decoder.sample_rate(), decoder.channels());
        Ok(Self {
            bytes,
            decoder,
            looping,
            cursor,
        })
    }

    /// Go back to the first sample. Decoders that cannot seek are reopened.
    fn rewind(&mut self) -> bool {
        if self.decoder.try_seek(Duration::ZERO).is_err() {
            match open_decoder(&self.bytes) {
                Ok(decoder) => self.decoder = decoder,
                Err(err) => {
                    tracing::warn!("Failed to reopen decoder for loop: {}", err);
                    return false;
                }
            }
        }
        self.cursor.reset();
        true
    }
}

/// Open a decoder over the bytes (also used to verify a source on load)
pub fn open_decoder(bytes: &SourceBytes) -> Result<BytesDecoder, AudioError> {
    Decoder::new(bytes.reader()).map_err(|err| AudioError::DecodeFailed(Box::new(err)))
}

impl Iterator for PlaybackSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if let Some(sample) = self.decoder.next() {
            self.cursor.advance();
            return Some(sample);
        }

        if !self.looping.load(Ordering::Relaxed) || !self.rewind() {
            return None;
        }

        // An empty decoder would spin forever
        let sample = self.decoder.next()?;
        self.cursor.advance();
        Some(sample)
    }
}

impl Source for PlaybackSource {
    fn current_frame_len(&self) -> Option<usize> {
        self.decoder.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.decoder.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.decoder.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        if self.looping.load(Ordering::Relaxed) {
            None
        } else {
            self.decoder.total_duration()
        }
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        match self.decoder.try_seek(pos) {
            Ok(()) => {
                self.cursor.set_position(pos.as_secs_f64());
                Ok(())
            }
            Err(_) if pos.is_zero() && self.rewind() => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::wav_bytes;

    fn source(seconds: f64, looping: bool) -> (PlaybackSource, Arc<PlaybackCursor>) {
        let bytes = SourceBytes::new(wav_bytes(1_000, 1, seconds));
        let cursor = Arc::new(PlaybackCursor::new());
        let source =
            PlaybackSource::new(bytes, Arc::new(AtomicBool::new(looping)), Arc::clone(&cursor))
                .unwrap();
        (source, cursor)
    }

    #[test]
    fn test_cursor_tracks_samples() {
        let (mut source, cursor) = source(1.0, false);
        for _ in 0..500 {
            source.next().unwrap();
        }
        assert!((cursor.position() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_looping_source_ends() {
        let (source, cursor) = source(0.1, false);
        assert_eq!(source.count(), 100);
        assert!((cursor.position() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_looping_source_restarts() {
        let (mut source, cursor) = source(0.1, true);
        for _ in 0..150 {
            assert!(source.next().is_some());
        }
        assert!((cursor.position() - 0.05).abs() < 1e-9);
        assert!(source.total_duration().is_none());
    }

    #[test]
    fn test_loop_flag_is_live() {
        let bytes = SourceBytes::new(wav_bytes(1_000, 1, 0.1));
        let looping = Arc::new(AtomicBool::new(true));
        let cursor = Arc::new(PlaybackCursor::new());
        let mut source =
            PlaybackSource::new(bytes, Arc::clone(&looping), Arc::clone(&cursor)).unwrap();

        for _ in 0..150 {
            source.next().unwrap();
        }
        looping.store(false, Ordering::Relaxed);
        assert_eq!(source.count(), 50);
    }
}
