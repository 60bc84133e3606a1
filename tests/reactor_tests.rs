mod common;

use tokio::time::Instant;

use breathwork::config::GuideConfig;
use breathwork::kernel::event::{Event, SessionEvent};
use breathwork::kernel::haptics::HapticPattern;
use breathwork::kernel::technique::PhaseLabel;
use breathwork::speech::phrase::PhraseOrigin;
use breathwork::EngineConfig;
use std::sync::atomic::Ordering;

use common::{at, harness, run_frames, settle, Counting, Hanging};

fn guided_config() -> EngineConfig {
    EngineConfig {
        guide: GuideConfig {
            enabled: true,
            ..GuideConfig::default()
        },
        ..EngineConfig::default()
    }
}

fn phrase(generation: u64, cycle: u32, text: &str) -> Event {
    Event::PhraseReady {
        generation,
        cycle,
        phrase: text.to_string(),
        origin: PhraseOrigin::Service,
    }
}

#[tokio::test]
async fn test_start_emits_and_pulses() {
    let mut h = harness(EngineConfig::default(), "box", Hanging);
    let t0 = Instant::now();

    h.reactor.start(t0);
    let events = h.reactor.tick_step(t0, vec![]);

    assert!(matches!(&events[0], SessionEvent::Started { technique_id, .. } if technique_id == "box"));
    assert!(h.reactor.is_active());
    assert!(h.reactor.session_id().is_some());
    assert_eq!(h.haptics.pulses(), vec![HapticPattern::SESSION_START]);
    assert!(h.reactor.cue().visible);

    // Bed (3) and the first inhale (2) are playing.
    h.mixer.advance(0.05);
    assert_eq!(h.mixer.voice_count(), 5);
}

#[tokio::test]
async fn test_box_session_timeline() {
    let mut h = harness(EngineConfig::default(), "box", Hanging);
    let t0 = Instant::now();
    h.reactor.start(t0);

    // 1. One cycle at 60 Hz.
    let events = run_frames(&mut h.reactor, t0, 0, 966);

    let labels: Vec<PhaseLabel> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::PhaseChanged { phase, .. } => Some(phase.label),
            _ => None,
        })
        .collect();
    assert_eq!(
        labels,
        vec![PhaseLabel::Hold, PhaseLabel::Exhale, PhaseLabel::Hold, PhaseLabel::Inhale]
    );

    // 2. CycleCompleted follows the wrap to phase 0.
    let wrap = events
        .iter()
        .position(|e| matches!(e, SessionEvent::PhaseChanged { index: 0, .. }))
        .unwrap();
    assert_eq!(events[wrap + 1], SessionEvent::CycleCompleted { cycles: 1 });

    // 3. Haptics per phase.
    assert_eq!(
        h.haptics.pulses(),
        vec![
            HapticPattern::SESSION_START,
            HapticPattern::MEDIUM,
            HapticPattern::LONG,
            HapticPattern::MEDIUM,
            HapticPattern::SHORT,
        ]
    );

    let frame = h.reactor.frame();
    assert_eq!(frame.cycles_completed, 1);
    assert!((frame.progress - 0.025).abs() < 0.005);
    println!("Reactor box timeline OK");
}

#[tokio::test]
async fn test_stalled_loop_skips_tones_but_counts() {
    let mut h = harness(EngineConfig::default(), "box", Hanging);
    let t0 = Instant::now();
    h.reactor.start(t0);
    h.reactor.tick_step(t0, vec![]);

    // 9 s stall: the missed hold is entered overdue, without haptics.
    let first = h.reactor.tick_step(at(t0, 9.0), vec![]);
    assert!(matches!(first[0], SessionEvent::PhaseChanged { index: 1, .. }));
    assert_eq!(h.haptics.pulses().len(), 1);

    let second = h.reactor.tick_step(at(t0, 9.016), vec![]);
    assert!(matches!(second[0], SessionEvent::PhaseChanged { index: 2, .. }));
    assert_eq!(h.haptics.pulses().last(), Some(&HapticPattern::LONG));

    let snap = h.reactor.telemetry.snapshot();
    assert_eq!(snap.phase_stats.transitions, 2);
    assert_eq!(snap.phase_stats.overdue, 1);
}

#[tokio::test]
async fn test_stale_phrase_rejected() {
    let mut h = harness(guided_config(), "box", Hanging);
    let t0 = Instant::now();
    h.reactor.start(t0);
    h.reactor.tick_step(t0, vec![]);
    let current = h.reactor.generation();

    // 1. Older generation: dropped.
    let events = h.reactor.tick_step(at(t0, 0.1), vec![phrase(current - 1, 0, "Old words.")]);
    assert!(events.is_empty());
    assert!(h.speech.spoken().is_empty());

    // 2. Current generation: spoken once.
    let events = h.reactor.tick_step(at(t0, 0.2), vec![phrase(current, 0, "Fresh words.")]);
    assert_eq!(
        events,
        vec![SessionEvent::PhraseSpoken { cycle: 0, phrase: "Fresh words.".into() }]
    );
    assert_eq!(h.speech.spoken().len(), 1);
    assert_eq!(h.reactor.snapshot().phrase.as_deref(), Some("Fresh words."));

    let snap = h.reactor.telemetry.snapshot();
    assert_eq!(snap.phrase_stats.stale_discarded, 1);
    assert_eq!(snap.phrase_stats.from_service, 1);
    println!("Stale phrase rejected");
}

#[tokio::test]
async fn test_phrase_after_stop_is_discarded() {
    let mut h = harness(guided_config(), "box", Hanging);
    let t0 = Instant::now();
    h.reactor.start(t0);
    let generation = h.reactor.generation();

    h.reactor.stop(at(t0, 3.0));
    assert!(h.speech.cancels() >= 1, "stop cancels speech");

    h.reactor.tick_step(at(t0, 3.1), vec![]);
    let events = h.reactor.tick_step(at(t0, 3.5), vec![phrase(generation, 0, "Too late.")]);
    assert!(events.is_empty());
    assert!(h.speech.spoken().is_empty());
}

#[tokio::test]
async fn test_short_session_not_counted() {
    let mut h = harness(EngineConfig::default(), "coherent", Hanging);
    let t0 = Instant::now();
    h.reactor.start(t0);

    assert!(h.reactor.stop(at(t0, 10.0)).is_none());
    assert_eq!(h.reactor.lifetime_sessions(), 0);

    let events = h.reactor.tick_step(at(t0, 10.1), vec![]);
    assert!(events.contains(&SessionEvent::Stopped { summary: None }));

    // Stop again: nothing happens.
    assert!(h.reactor.stop(at(t0, 11.0)).is_none());
}

#[tokio::test]
async fn test_fifth_session_raises_milestone() {
    let mut h = harness(EngineConfig::default(), "coherent", Hanging);
    let t0 = Instant::now();

    let mut last = None;
    for i in 0..5 {
        let start = i as f64 * 20.0;
        h.reactor.start(at(t0, start));
        last = h.reactor.stop(at(t0, start + 11.0));
    }
    let summary = last.unwrap();
    assert_eq!(summary.lifetime_session_count, 5);
    assert_eq!(summary.technique_id, "coherent");
    assert_eq!(summary.cycles_completed, 0);

    let events = h.reactor.tick_step(at(t0, 91.0), vec![]);
    assert!(events.iter().any(|e| matches!(e, SessionEvent::MilestoneRaised(m) if m.session_count == 5)));
    assert!(h.reactor.snapshot().milestone.is_some());

    // Dismissed 3.5 s later.
    let events = h.reactor.tick_step(at(t0, 94.6), vec![]);
    assert_eq!(events, vec![SessionEvent::MilestoneDismissed]);
    assert!(h.reactor.snapshot().milestone.is_none());
}

#[tokio::test]
async fn test_switch_technique_mid_session() {
    let mut h = harness(EngineConfig::default(), "box", Hanging);
    let t0 = Instant::now();
    h.reactor.start(t0);
    run_frames(&mut h.reactor, t0, 0, 300);
    let before = h.reactor.generation();

    // 1. Unknown id leaves the session alone.
    assert!(h.reactor.switch_technique("nope", at(t0, 5.0)).is_err());
    assert_eq!(h.reactor.technique().id(), "box");
    assert!(h.reactor.is_active());

    // 2. Valid id restarts from phase 0.
    h.reactor.switch_technique("power", at(t0, 5.0)).unwrap();
    assert_eq!(h.reactor.technique().id(), "power");
    assert!(h.reactor.is_active());
    assert_eq!(h.reactor.frame().index, 0);
    assert_eq!(h.reactor.generation(), before + 2);

    // 3. Old tones fade; only the new inhale set survives.
    h.mixer.advance(0.5);
    assert_eq!(h.mixer.voice_count(), 5);
}

#[tokio::test]
async fn test_stop_tears_down_audio_and_cues() {
    let mut h = harness(EngineConfig::default(), "478", Hanging);
    let t0 = Instant::now();
    h.reactor.start(t0);
    h.mixer.advance(1.0);
    assert!(h.mixer.total_gain() > 0.0);

    h.reactor.stop(at(t0, 1.0));
    assert!(!h.reactor.cue().visible);

    h.mixer.advance(0.35);
    assert_eq!(h.mixer.total_gain(), 0.0);
    h.mixer.advance(0.01);
    assert_eq!(h.mixer.voice_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_catch_up_does_not_flood_phrase_service() {
    let phrases = Counting::default();
    let calls = phrases.calls.clone();
    let mut h = harness(guided_config(), "box", phrases);
    let t0 = Instant::now();

    // 1. Cycle 0 asks once.
    h.reactor.start(t0);
    h.reactor.tick_step(t0, vec![]);
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // 2. Two minutes stalled, then one second of ticks: seven wraps replayed.
    let mut cycles = 0;
    for k in 0..60 {
        let events = h.reactor.tick_step(at(t0, 120.0 + k as f64 / 60.0), vec![]);
        cycles += events
            .iter()
            .filter(|e| matches!(e, SessionEvent::CycleCompleted { .. }))
            .count();
        settle().await;
    }
    assert_eq!(cycles, 7);
    assert_eq!(h.reactor.frame().cycles_completed, 7);
    assert_eq!(h.reactor.frame().index, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "replayed cycles must not fetch");

    // 3. Back on schedule, the next wrap asks again.
    h.reactor.tick_step(at(t0, 124.0), vec![]);
    h.reactor.tick_step(at(t0, 128.0), vec![]);
    settle().await;
    assert_eq!(h.reactor.frame().cycles_completed, 8);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    println!("Catch-up replayed {} cycles with no extra fetches", cycles);
}
