// Integration tests for the soundboard engine
// These drive the public API against the fake audio backend

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use soundpad::audio_system::probe::probe_duration;
use soundpad::audio_system::SourceBytes;
use soundpad::testutil::{fake_audio, FakeBackend};
use soundpad::{
    AddSoundError, AudioFile, Engine, EngineOptions, Event, Hotkey, KeyEvent, SettingsPatch,
    SoundId,
};

const WAIT: Duration = Duration::from_secs(5);

fn options() -> EngineOptions {
    EngineOptions {
        // Tests drive refresh by hand
        refresh_interval: Duration::from_secs(3600),
        ..EngineOptions::default()
    }
}

fn engine_with(options: EngineOptions) -> (Engine, FakeBackend) {
    let backend = FakeBackend::new();
    let engine = Engine::new(Arc::new(backend.clone()), options).unwrap();
    (engine, backend)
}

fn engine() -> (Engine, FakeBackend) {
    engine_with(options())
}

fn load(engine: &Engine, name: &str, seconds: f64) -> SoundId {
    engine
        .add_sound(AudioFile::new(name, fake_audio(seconds)))
        .wait()
        .unwrap()
        .id
}

fn wait_for(events: &Receiver<Event>, wanted: impl Fn(&Event) -> bool) -> Option<Event> {
    let deadline = Instant::now() + WAIT;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match events.recv_timeout(left) {
            Ok(event) if wanted(&event) => return Some(event),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_effective_gain_follows_volume_and_master() {
    let (engine, backend) = engine();
    let id = load(&engine, "airhorn.mp3", 2.0);
    engine.play(id);
    let resource = backend.resource(0).unwrap();

    // 100% of the default 80% master
    assert!(close(resource.gain(), 0.8));

    engine.set_volume(id, 50);
    assert!(close(resource.gain(), 0.4));

    engine.update_settings(SettingsPatch::master_volume(50));
    assert!(close(resource.gain(), 0.25));
    assert_eq!(engine.sound(id).unwrap().volume, 50);
}

#[test]
fn test_volume_is_clamped() {
    let (engine, _backend) = engine();
    let id = load(&engine, "airhorn.mp3", 2.0);

    engine.set_volume(id, 250);
    assert_eq!(engine.sound(id).unwrap().volume, 100);

    engine.update_settings(SettingsPatch::master_volume(180));
    assert_eq!(engine.settings().master_volume, 100);
}

#[test]
fn test_seek_clamps_to_duration() {
    let (engine, backend) = engine();
    let id = load(&engine, "pad.ogg", 10.0);
    engine.play(id);
    let resource = backend.resource(0).unwrap();

    engine.seek(id, -5.0);
    assert_eq!(engine.sound(id).unwrap().current_time, 0.0);
    assert_eq!(resource.position(), 0.0);

    engine.seek(id, 15.0);
    assert_eq!(engine.sound(id).unwrap().current_time, 10.0);
    assert_eq!(resource.position(), 10.0);

    engine.seek(id, f64::NAN);
    assert_eq!(engine.sound(id).unwrap().current_time, 0.0);
}

#[test]
fn test_seek_before_first_play_updates_state_only() {
    let (engine, backend) = engine();
    let id = load(&engine, "pad.ogg", 10.0);

    engine.seek(id, 4.0);
    assert_eq!(engine.sound(id).unwrap().current_time, 4.0);
    assert_eq!(backend.created_count(), 0);
}

#[test]
fn test_remove_sound_is_idempotent() {
    let (engine, backend) = engine();
    let (events, _sub) = engine.subscribe();
    let id = load(&engine, "kick.wav", 1.0);
    engine.play(id);
    let resource = backend.resource(0).unwrap();

    engine.remove_sound(id);
    engine.remove_sound(id);

    assert!(engine.sound(id).is_none());
    assert!(resource.is_detached());
    assert!(!resource.is_playing());
    assert_eq!(engine.resource_count(), 0);
    assert_eq!(engine.live_sources(), 0);

    let removals = events
        .try_iter()
        .filter(|e| matches!(e, Event::SoundRemoved { .. }))
        .count();
    assert_eq!(removals, 1);
}

#[test]
fn test_stop_all_resets_every_sound() {
    let (engine, backend) = engine();
    let ids: Vec<_> = ["a.wav", "b.wav", "c.wav"]
        .iter()
        .map(|name| load(&engine, name, 5.0))
        .collect();
    for id in &ids {
        engine.play(*id);
    }
    backend.resource(0).unwrap().advance(1.0);
    engine.refresh();
    assert_eq!(engine.snapshot().playing_count(), 3);

    engine.stop_all();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.playing_count(), 0);
    assert!(snapshot.sounds.iter().all(|s| s.current_time == 0.0));
    for index in 0..3 {
        let resource = backend.resource(index).unwrap();
        assert!(!resource.is_playing());
        assert_eq!(resource.position(), 0.0);
    }
}

#[test]
fn test_hotkey_toggles_once_per_press() {
    let (engine, _backend) = engine();
    let id = load(&engine, "cheer.mp3", 4.0);
    engine.set_hotkey(id, Hotkey::parse("3"));

    assert!(engine.handle_key(KeyEvent::char('3')));
    assert!(engine.sound(id).unwrap().is_playing);

    assert!(engine.handle_key(KeyEvent::char('3')));
    assert!(!engine.sound(id).unwrap().is_playing);

    assert!(!engine.handle_key(KeyEvent::char('4')));
}

#[test]
fn test_hotkey_ignored_in_text_input() {
    let (engine, _backend) = engine();
    let id = load(&engine, "cheer.mp3", 4.0);
    engine.set_hotkey(id, Hotkey::parse("3"));

    assert!(!engine.handle_key(KeyEvent::char('3').in_text_input()));
    assert!(!engine.sound(id).unwrap().is_playing);
}

#[test]
fn test_letter_hotkeys_ignore_case() {
    let (engine, _backend) = engine();
    let id = load(&engine, "cheer.mp3", 4.0);
    engine.set_hotkey(id, Hotkey::new('q'));

    assert!(engine.handle_key(KeyEvent::char('Q')));
    assert!(engine.sound(id).unwrap().is_playing);
}

#[test]
fn test_escape_stops_everything() {
    let (engine, _backend) = engine();
    let a = load(&engine, "a.wav", 4.0);
    let b = load(&engine, "b.wav", 4.0);
    engine.play(a);
    engine.play(b);

    assert!(engine.handle_key(KeyEvent::pressed(soundpad::Key::Escape)));
    assert_eq!(engine.snapshot().playing_count(), 0);
}

#[test]
fn test_key_sender_dispatches_on_listener_thread() {
    let (engine, _backend) = engine();
    let id = load(&engine, "cheer.mp3", 4.0);
    engine.set_hotkey(id, Hotkey::parse("3"));
    let (events, _sub) = engine.subscribe();

    let keys = engine.key_sender().unwrap();
    keys.send(KeyEvent::char('3')).unwrap();

    let started = wait_for(&events, |e| matches!(e, Event::PlaybackStarted { .. }));
    assert_eq!(started, Some(Event::PlaybackStarted { id }));
    assert!(engine.sound(id).unwrap().is_playing);
}

#[test]
fn test_add_files_keeps_order_and_digits() {
    let names = ["a.wav", "b.wav", "c.wav", "d.wav", "e.wav", "f.wav"];
    let expected = ["a=1", "b=2", "c=3", "d=4", "e=5", "f=6"];

    for _ in 0..20 {
        let (engine, backend) = engine_with(EngineOptions {
            auto_assign_hotkeys: true,
            ..options()
        });
        // Hold every metadata read, then let them all finish at once
        let gate = backend.hold_probes();
        let files = names
            .iter()
            .map(|name| AudioFile::new(*name, fake_audio(1.0)))
            .collect();
        let tickets = engine.add_files(files);
        drop(gate);
        for ticket in tickets {
            ticket.wait().unwrap();
        }

        let board: Vec<String> = engine
            .snapshot()
            .sounds
            .iter()
            .map(|s| {
                let key = s.hotkey.map(|k| k.to_string()).unwrap_or_default();
                format!("{}={}", s.display_name, key)
            })
            .collect();
        assert_eq!(board, expected);
    }
}

#[test]
fn test_reserved_digit_yields_to_manual_binding() {
    let (engine, backend) = engine_with(EngineOptions {
        auto_assign_hotkeys: true,
        ..options()
    });
    let first = load(&engine, "first.wav", 1.0);
    assert_eq!(engine.sound(first).unwrap().hotkey, Hotkey::digit(1));

    let gate = backend.hold_probes();
    let ticket = engine.add_sound(AudioFile::new("second.wav", fake_audio(1.0)));
    // Digit 2 is reserved for the pending sound; bind it by hand meanwhile
    engine.set_hotkey(first, Hotkey::digit(2));
    drop(gate);

    let second = ticket.wait().unwrap();
    assert_eq!(second.hotkey, None);
    assert_eq!(engine.sound(first).unwrap().hotkey, Hotkey::digit(2));
}

#[test]
fn test_hotkey_reassignment_moves_binding() {
    let (engine, _backend) = engine();
    let a = load(&engine, "a.wav", 1.0);
    let b = load(&engine, "b.wav", 1.0);

    engine.set_hotkey(a, Hotkey::parse("5"));
    engine.set_hotkey(b, Hotkey::parse("5"));

    assert_eq!(engine.sound(a).unwrap().hotkey, None);
    assert_eq!(engine.sound(b).unwrap().hotkey, Hotkey::parse("5"));

    engine.handle_key(KeyEvent::char('5'));
    assert!(!engine.sound(a).unwrap().is_playing);
    assert!(engine.sound(b).unwrap().is_playing);
}

#[test]
fn test_non_looping_sound_stops_at_end() {
    let (engine, backend) = engine();
    let (events, _sub) = engine.subscribe();
    let id = load(&engine, "kick.wav", 1.0);
    engine.play(id);

    backend.resource(0).unwrap().finish();

    let sound = engine.sound(id).unwrap();
    assert!(!sound.is_playing);
    assert_eq!(sound.current_time, 0.0);
    assert!(events
        .try_iter()
        .any(|e| e == Event::PlaybackFinished { id }));
}

#[test]
fn test_looping_sound_wraps_at_end() {
    let (engine, backend) = engine();
    let id = load(&engine, "loop.wav", 1.0);
    engine.toggle_loop(id);
    engine.play(id);
    let resource = backend.resource(0).unwrap();

    resource.advance(1.05);
    engine.refresh();

    let sound = engine.sound(id).unwrap();
    assert!(sound.is_playing);
    assert!(sound.current_time < 0.1);
    assert!(resource.position() < 0.1);
}

#[test]
fn test_loop_toggle_applies_to_live_resource() {
    let (engine, backend) = engine();
    let id = load(&engine, "loop.wav", 1.0);
    engine.play(id);
    let resource = backend.resource(0).unwrap();

    engine.toggle_loop(id);
    assert!(resource.is_looping());

    resource.advance(1.5);
    assert!(engine.sound(id).unwrap().is_playing);

    engine.toggle_loop(id);
    resource.finish();
    assert!(!engine.sound(id).unwrap().is_playing);
}

#[test]
fn test_replay_after_end_is_not_cancelled_by_stale_event() {
    let (engine, backend) = engine();
    let id = load(&engine, "kick.wav", 1.0);
    engine.play(id);
    let resource = backend.resource(0).unwrap();

    resource.finish();
    engine.play(id);

    assert!(engine.sound(id).unwrap().is_playing);
    assert!(resource.is_playing());
}

#[test]
fn test_mute_silences_without_touching_volumes() {
    let (engine, backend) = engine();
    let a = load(&engine, "a.wav", 4.0);
    let b = load(&engine, "b.wav", 4.0);
    engine.set_volume(a, 60);
    engine.play(a);
    let resource = backend.resource(0).unwrap();
    let gain = resource.gain();

    engine.update_settings(SettingsPatch::muted(true));
    assert!(resource.is_muted());
    assert_eq!(resource.audible_gain(), 0.0);
    assert!(close(resource.gain(), gain));
    assert_eq!(engine.sound(a).unwrap().volume, 60);

    // Play while muted does nothing
    engine.play(b);
    assert!(!engine.sound(b).unwrap().is_playing);
    assert_eq!(backend.created_count(), 1);

    engine.update_settings(SettingsPatch::muted(false));
    assert!(close(resource.audible_gain(), gain));
}

#[test]
fn test_refresh_tracks_playing_sounds() {
    let (engine, backend) = engine();
    let playing = load(&engine, "a.wav", 10.0);
    let idle = load(&engine, "b.wav", 10.0);
    engine.play(playing);
    let resource = backend.resource(0).unwrap();

    resource.advance(2.0);
    engine.refresh();

    let snapshot = engine.snapshot();
    assert!((snapshot.sound(playing).unwrap().current_time - 2.0).abs() < 1e-9);
    assert_eq!(snapshot.sound(idle).unwrap().current_time, 0.0);
}

#[test]
fn test_refresh_loop_runs_on_schedule() {
    let (engine, backend) = engine_with(EngineOptions {
        refresh_interval: Duration::from_millis(5),
        ..EngineOptions::default()
    });
    let id = load(&engine, "a.wav", 10.0);
    engine.play(id);
    backend.resource(0).unwrap().advance(3.0);

    let deadline = Instant::now() + WAIT;
    while engine.sound(id).unwrap().current_time == 0.0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!((engine.sound(id).unwrap().current_time - 3.0).abs() < 1e-9);
    assert!(engine.refresh_runs() > 0);
}

#[test]
fn test_teardown_stops_background_tasks() {
    let (engine, backend) = engine_with(EngineOptions {
        refresh_interval: Duration::from_millis(5),
        ..EngineOptions::default()
    });
    let id = load(&engine, "a.wav", 10.0);
    engine.play(id);
    let keys = engine.key_sender().unwrap();

    let deadline = Instant::now() + WAIT;
    while engine.refresh_runs() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    engine.shutdown();
    let runs = engine.refresh_runs();
    thread::sleep(Duration::from_millis(50));

    assert_eq!(engine.refresh_runs(), runs);
    assert!(!engine.is_running());
    assert!(engine.key_sender().is_none());
    assert!(keys.send(KeyEvent::char('1')).is_err());
    assert!(backend.resource(0).unwrap().is_detached());
    assert_eq!(engine.live_sources(), 0);
    assert!(engine.snapshot().sounds.is_empty());

    // Second call is a no-op
    engine.shutdown();
}

#[test]
fn test_add_after_shutdown_fails() {
    let (engine, _backend) = engine();
    engine.shutdown();

    let result = engine
        .add_sound(AudioFile::new("late.wav", fake_audio(1.0)))
        .wait();
    assert!(matches!(result, Err(AddSoundError::EngineShutDown)));
}

#[test]
fn test_remove_during_probe_discards_result() {
    let (engine, backend) = engine();
    let gate = backend.hold_probes();

    let ticket = engine.add_sound(AudioFile::new("slow.flac", fake_audio(3.0)));
    let deadline = Instant::now() + WAIT;
    while backend.probe_count() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(ticket.try_result().is_none());

    engine.remove_sound(ticket.id());
    drop(gate);

    let result = ticket.wait();
    assert!(matches!(result, Err(AddSoundError::Cancelled { .. })));
    assert!(engine.snapshot().sounds.is_empty());
    assert_eq!(engine.live_sources(), 0);
}

#[test]
fn test_stalled_probe_times_out() {
    let (engine, backend) = engine_with(EngineOptions {
        probe_timeout: Duration::from_millis(50),
        ..options()
    });
    let gate = backend.hold_probes();

    let result = engine
        .add_sound(AudioFile::new("stuck.mp3", fake_audio(3.0)))
        .wait();
    assert!(matches!(result, Err(AddSoundError::TimedOut { .. })));
    assert!(engine.snapshot().sounds.is_empty());
    assert_eq!(engine.live_sources(), 0);

    drop(gate);
}

#[test]
fn test_unreadable_file_fails_ticket() {
    let (engine, _backend) = engine();
    let result = engine
        .add_sound(AudioFile::new("broken.mp3", b"not audio".to_vec()))
        .wait();

    assert!(matches!(result, Err(AddSoundError::Probe { .. })));
    assert_eq!(engine.live_sources(), 0);
}

#[test]
fn test_intake_filters_files() {
    let (engine, _backend) = engine();
    let (events, _sub) = engine.subscribe();

    let files = vec![
        AudioFile::new("notes.txt", fake_audio(1.0)),
        AudioFile::new("Beat.MP3", fake_audio(1.0)),
        AudioFile::new("clip", fake_audio(1.0)).with_mime("audio/ogg"),
        AudioFile::new("cover.png", fake_audio(1.0)).with_mime("image/png"),
    ];
    let tickets = engine.add_files(files);
    assert_eq!(tickets.len(), 2);

    let names: Vec<_> = tickets
        .into_iter()
        .map(|t| t.wait().unwrap().display_name)
        .collect();
    assert_eq!(names, vec!["Beat".to_string(), "clip".to_string()]);

    let rejected = events
        .try_iter()
        .filter(|e| matches!(e, Event::FileRejected { .. }))
        .count();
    assert_eq!(rejected, 2);
}

#[test]
fn test_clear_releases_everything() {
    let (engine, backend) = engine();
    let a = load(&engine, "a.wav", 1.0);
    load(&engine, "b.wav", 1.0);
    engine.play(a);

    engine.clear();

    assert!(engine.snapshot().sounds.is_empty());
    assert_eq!(engine.resource_count(), 0);
    assert_eq!(engine.live_sources(), 0);
    assert!(backend.resource(0).unwrap().is_detached());
}

#[test]
fn test_symphonia_probe_reads_wav_duration() {
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::io::Cursor;

    let spec = WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut buffer = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buffer), spec).unwrap();
        for _ in 0..16_000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    let duration = probe_duration(&SourceBytes::new(buffer), Some("wav")).unwrap();
    assert!((duration - 2.0).abs() < 1e-6);
}
