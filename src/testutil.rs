//! Test doubles for the audio backend
//!
//! `FakeBackend` hands out `FakeResource`s whose transport is advanced by hand,
//! so engine behavior can be checked without an output device. Fake audio is
//! just a text marker carrying its duration (see `fake_audio`).

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::audio_system::{AudioBackend, EndedCallback, SoundResource, SourceBytes};
use crate::error::{AudioError, ProbeError};

const FAKE_MAGIC: &str = "FAKEAUDIO ";

/// Bytes the fake backend understands as audio of the given length
pub fn fake_audio(seconds: f64) -> Vec<u8> {
    format!("{}{}", FAKE_MAGIC, seconds).into_bytes()
}

fn parse_fake_audio(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes)
        .ok()?
        .strip_prefix(FAKE_MAGIC)?
        .trim()
        .parse()
        .ok()
}

#[derive(Debug, Default)]
struct FakeTransport {
    duration: f64,
    playing: bool,
    position: f64,
    gain: f32,
    muted: bool,
    looping: bool,
    detached: bool,
    play_calls: usize,
    fail_play: bool,
}

/// Fake resource; state is shared with the `FakeResourceProbe` tests inspect
pub struct FakeResource {
    transport: Arc<Mutex<FakeTransport>>,
    on_ended: Arc<Mutex<Option<EndedCallback>>>,
}

impl SoundResource for FakeResource {
    fn play(&mut self) -> Result<(), AudioError> {
        let mut transport = self.transport.lock();
        if transport.detached {
            return Err(AudioError::SourceReleased);
        }
        transport.play_calls += 1;
        if transport.fail_play {
            return Err(AudioError::PlaybackFailed("fake play failure".into()));
        }
        transport.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.transport.lock().playing = false;
    }

    fn seek(&mut self, position: f64) -> Result<(), AudioError> {
        let mut transport = self.transport.lock();
        transport.position = position.clamp(0.0, transport.duration);
        Ok(())
    }

    fn position(&self) -> f64 {
        self.transport.lock().position
    }

    fn set_volume(&mut self, gain: f32) {
        self.transport.lock().gain = gain;
    }

    fn set_muted(&mut self, muted: bool) {
        self.transport.lock().muted = muted;
    }

    fn set_loop(&mut self, looping: bool) {
        self.transport.lock().looping = looping;
    }

    fn on_ended(&mut self, callback: EndedCallback) {
        *self.on_ended.lock() = Some(callback);
    }

    fn detach(&mut self) {
        let mut transport = self.transport.lock();
        transport.playing = false;
        transport.detached = true;
    }
}

/// Inspection and time control for one fake resource
#[derive(Clone)]
pub struct FakeResourceProbe {
    transport: Arc<Mutex<FakeTransport>>,
    on_ended: Arc<Mutex<Option<EndedCallback>>>,
}

impl FakeResourceProbe {
    pub fn is_playing(&self) -> bool {
        self.transport.lock().playing
    }

    pub fn position(&self) -> f64 {
        self.transport.lock().position
    }

    pub fn gain(&self) -> f32 {
        self.transport.lock().gain
    }

    pub fn is_muted(&self) -> bool {
        self.transport.lock().muted
    }

    /// Gain reaching the output
    pub fn audible_gain(&self) -> f32 {
        let transport = self.transport.lock();
        if transport.muted {
            0.0
        } else {
            transport.gain
        }
    }

    pub fn is_looping(&self) -> bool {
        self.transport.lock().looping
    }

    pub fn is_detached(&self) -> bool {
        self.transport.lock().detached
    }

    pub fn play_calls(&self) -> usize {
        self.transport.lock().play_calls
    }

    pub fn fail_play(&self, fail: bool) {
        self.transport.lock().fail_play = fail;
    }

    /// Let `seconds` of playback elapse. A non-looping resource that reaches
    /// its end stops and fires the end callback; a looping one wraps around.
    pub fn advance(&self, seconds: f64) {
        let ended = {
            let mut transport = self.transport.lock();
            if !transport.playing {
                return;
            }
            transport.position += seconds;
            if transport.position < transport.duration {
                false
            } else if transport.looping && transport.duration > 0.0 {
                transport.position %= transport.duration;
                false
            } else {
                transport.position = transport.duration;
                transport.playing = false;
                true
            }
        };

        if ended {
            let callback = self.on_ended.lock().clone();
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    /// Play through to the end
    pub fn finish(&self) {
        let remaining = {
            let transport = self.transport.lock();
            (transport.duration - transport.position).max(0.0)
        };
        self.advance(remaining);
    }
}

#[derive(Default)]
struct FakeBackendState {
    resources: Vec<FakeResourceProbe>,
    fail_next_create: bool,
    probe_gate: Option<Receiver<()>>,
    probe_count: usize,
}

/// Backend producing `FakeResource`s
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeBackendState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources in creation order
    pub fn resource(&self, index: usize) -> Option<FakeResourceProbe> {
        self.state.lock().resources.get(index).cloned()
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().resources.len()
    }

    pub fn probe_count(&self) -> usize {
        self.state.lock().probe_count
    }

    pub fn fail_next_create(&self) {
        self.state.lock().fail_next_create = true;
    }

    /// Block metadata probes until the returned sender releases them, one
    /// message per probe (dropping the sender releases all)
    pub fn hold_probes(&self) -> Sender<()> {
        let (tx, rx) = unbounded();
        self.state.lock().probe_gate = Some(rx);
        tx
    }
}

impl AudioBackend for FakeBackend {
    fn create_resource(&self, source: &SourceBytes) -> Result<Box<dyn SoundResource>, AudioError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_create) {
            return Err(AudioError::DecodeFailed("fake create failure".into()));
        }

        let duration = parse_fake_audio(source.as_ref())
            .ok_or_else(|| AudioError::DecodeFailed("not fake audio".into()))?;
        let transport = Arc::new(Mutex::new(FakeTransport {
            duration,
            gain: 1.0,
            ..FakeTransport::default()
        }));
        let on_ended = Arc::new(Mutex::new(None));

        state.resources.push(FakeResourceProbe {
            transport: Arc::clone(&transport),
            on_ended: Arc::clone(&on_ended),
        });
        Ok(Box::new(FakeResource {
            transport,
            on_ended,
        }))
    }

    fn probe_duration(&self, source: &SourceBytes, _extension: Option<&str>) -> Result<f64, ProbeError> {
        let gate = {
            let mut state = self.state.lock();
            state.probe_count += 1;
            state.probe_gate.clone()
        };
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        parse_fake_audio(source.as_ref()).ok_or(ProbeError::NoTrack)
    }
}

/// Encode a mono/stereo 16-bit sine as WAV
#[cfg(test)]
pub fn wav_bytes(sample_rate: u32, channels: u16, seconds: f64) -> Vec<u8> {
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::io::Cursor;

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let frames = (f64::from(sample_rate) * seconds).round() as u32;

    let mut buffer = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buffer), spec).unwrap();
        for n in 0..frames {
            let t = f64::from(n) / f64::from(sample_rate);
            let sample = ((t * 440.0 * std::f64::consts::TAU).sin() * 8_000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    buffer
}
