mod common;

use tokio::sync::mpsc;
use tokio::time::Instant;

use breathwork::audio::track::{decode_wav, load_track, resample};
use breathwork::audio::SynthEngine;
use breathwork::config::AudioConfig;
use breathwork::error::TrackError;
use breathwork::guided::player::{FINISHED_MESSAGE, PLAYING_MESSAGE};
use breathwork::guided::{GuidedPlayer, PlayerStatus};
use breathwork::kernel::event::{Event, SessionEvent};
use breathwork::EngineConfig;
use common::{harness, write_sine_wav, Hanging, SAMPLE_RATE};

#[tokio::test]
async fn test_missing_track_is_terminal() {
    let (tx, mut rx) = mpsc::channel(4);
    let (mut synth, _mixer) = SynthEngine::offline(&AudioConfig::default(), SAMPLE_RATE);
    let mut player = GuidedPlayer::new("/definitely/not/here.wav", tx);

    // 1. Loading state while the file is read.
    player.start(1, &mut synth).unwrap();
    assert!(player.is_loading());

    // 2. The load reports an open error.
    let Some(Event::TrackLoaded { generation, result }) = rx.recv().await else {
        panic!("expected a load result");
    };
    assert_eq!(generation, 1);
    assert!(matches!(result, Err(TrackError::Open(_))));

    // 3. Failed stays failed: no retry, progress untouched.
    assert!(player.on_loaded(result, &mut synth).is_err());
    assert!(matches!(player.status(), PlayerStatus::Failed(TrackError::Open(_))));
    assert!(!player.update(100.0));
    assert_eq!(player.progress(), 0.0);
    assert!(player.message().unwrap().contains("could not be opened"));
    println!("Missing track surfaced as terminal failure");
}

#[tokio::test]
async fn test_no_output_fails_immediately() {
    let (tx, _rx) = mpsc::channel(4);
    let mut synth = SynthEngine::silent(&AudioConfig::default());
    let mut player = GuidedPlayer::new("whatever.wav", tx);

    assert_eq!(player.start(1, &mut synth), Err(TrackError::NoOutput));
    assert_eq!(player.status(), &PlayerStatus::Failed(TrackError::NoOutput));
}

#[tokio::test]
async fn test_guided_session_plays_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guided.wav");
    write_sine_wav(&path, 24_000, 1, 0.2);

    let config = EngineConfig {
        guided_track: path,
        ..EngineConfig::default()
    };
    let mut h = harness(config, "guided", Hanging);
    let t0 = Instant::now();

    // 1. Start: loading, no synth bed for the guided technique.
    h.reactor.start(t0);
    assert!(h.reactor.player().is_loading());
    assert!(!h.reactor.synth().has_bed());

    // 2. Load completes: playback starts.
    let loaded = h.reactor.receiver.recv().await.unwrap();
    let events = h.reactor.tick_step(t0, vec![loaded]);
    assert!(events.contains(&SessionEvent::GuidedTrackReady));
    let snap = h.reactor.snapshot();
    assert!(snap.speaking);
    assert_eq!(snap.track_message.as_deref(), Some(PLAYING_MESSAGE));

    // 3. Progress follows the output clock.
    h.mixer.advance(0.1);
    h.reactor.tick_step(t0, vec![]);
    let p = h.reactor.player().progress();
    assert!(p > 0.4 && p < 0.6, "progress {}", p);

    // 4. Natural end.
    h.mixer.advance(0.15);
    let events = h.reactor.tick_step(t0, vec![]);
    assert!(events.contains(&SessionEvent::GuidedTrackFinished));
    assert_eq!(h.reactor.player().progress(), 1.0);
    assert!(!h.reactor.snapshot().speaking);
    assert_eq!(h.reactor.snapshot().track_message.as_deref(), Some(FINISHED_MESSAGE));

    // 5. Stop rewinds.
    h.reactor.stop(t0);
    assert_eq!(h.reactor.player().status(), &PlayerStatus::Idle);
    assert_eq!(h.reactor.player().progress(), 0.0);
}

#[tokio::test]
async fn test_late_track_load_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guided.wav");
    write_sine_wav(&path, SAMPLE_RATE, 1, 0.1);

    let config = EngineConfig {
        guided_track: path,
        ..EngineConfig::default()
    };
    let mut h = harness(config, "guided", Hanging);
    let t0 = Instant::now();
    h.reactor.start(t0);
    let generation = h.reactor.generation();

    // Stopped before the load lands.
    h.reactor.stop(t0);
    let late = Event::TrackLoaded {
        generation,
        result: Ok(vec![0.1f32; 100].into()),
    };
    let events = h.reactor.tick_step(t0, vec![late]);
    assert!(!events.contains(&SessionEvent::GuidedTrackReady));
    assert_eq!(h.reactor.player().status(), &PlayerStatus::Idle);
    assert_eq!(h.reactor.telemetry.snapshot().track_stats.stale_discarded, 1);
}

#[test]
fn test_decode_mixes_down_and_resamples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    write_sine_wav(&path, 22_050, 2, 0.5);

    // 1. Stereo in, mono out at the source rate.
    let decoded = decode_wav(&path).unwrap();
    assert_eq!(decoded.sample_rate, 22_050);
    assert_eq!(decoded.samples.len(), 11_025);
    assert!(decoded.samples.iter().all(|s| s.abs() <= 0.51));

    // 2. Resampled length follows the rate ratio.
    let out = resample(decoded.samples, 22_050, 44_100).unwrap();
    assert_eq!(out.len(), 22_050);

    // 3. Same rate is a pass-through.
    let track = load_track(&path, 22_050).unwrap();
    assert_eq!(track.len(), 11_025);
}

#[test]
fn test_empty_wav_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.wav");
    write_sine_wav(&path, 48_000, 1, 0.0);
    assert_eq!(decode_wav(&path).err(), Some(TrackError::Empty));
}
