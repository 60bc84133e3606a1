use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::aggregator::{Milestone, SessionAggregator, SessionSummary};
use super::cues::{CueRotation, CueState};
use super::event::{Event, Generation, SessionEvent};
use super::haptics::{HapticPattern, HapticSink};
use super::phase::{PhaseEvent, PhaseFrame, PhaseMachine};
use super::technique::{Catalog, PhaseLabel, Technique};
use super::telemetry::event::{StaleKind, TelemetryEvent, TrackEventKind, VoiceEventKind};
use super::telemetry::TelemetryRecorder;
use super::time::{Tick, Ticker};
use crate::audio::SynthEngine;
use crate::config::EngineConfig;
use crate::error::TechniqueError;
use crate::guided::GuidedPlayer;
use crate::speech::output::SpeechOutput;
use crate::speech::phrase::PhraseSource;
use crate::speech::GuideScheduler;

/// Platform-facing collaborators handed to the reactor at construction.
pub struct ReactorParts<P: PhraseSource> {
    pub synth: SynthEngine,
    pub speech: Box<dyn SpeechOutput>,
    pub phrases: P,
    pub haptics: Box<dyn HapticSink>,
}

/// Everything a display layer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub technique_id: String,
    pub frame: PhaseFrame,
    pub cue: CueState,
    pub phrase: Option<String>,
    pub speaking: bool,
    pub track_loading: bool,
    pub track_progress: f64,
    pub track_message: Option<String>,
    pub milestone: Option<Milestone>,
}

/// Single owner of session state. All mutation happens in `tick_step`,
/// `start`, `stop` and `switch_technique`, on one task.
pub struct SessionReactor<P: PhraseSource> {
    pub receiver: mpsc::Receiver<Event>,
    config: EngineConfig,
    catalog: Catalog,
    machine: PhaseMachine,
    synth: SynthEngine,
    cues: CueRotation,
    guide: GuideScheduler<P>,
    player: GuidedPlayer,
    aggregator: SessionAggregator,
    haptics: Box<dyn HapticSink>,
    pub telemetry: TelemetryRecorder,
    generation: Generation,
    tick: Tick,
    session_id: Option<Uuid>,
    // Emitted by start/stop, handed out on the next tick.
    outbox: Vec<SessionEvent>,
}

impl<P: PhraseSource> SessionReactor<P> {
    pub fn new(
        config: EngineConfig,
        catalog: Catalog,
        technique: Technique,
        receiver: mpsc::Receiver<Event>,
        tx: mpsc::Sender<Event>,
        parts: ReactorParts<P>,
    ) -> Self {
        Self {
            receiver,
            machine: PhaseMachine::new(technique),
            synth: parts.synth,
            cues: CueRotation::new(&config.cues),
            guide: GuideScheduler::new(&config.guide, parts.phrases, parts.speech, tx.clone()),
            player: GuidedPlayer::new(config.guided_track.clone(), tx),
            aggregator: SessionAggregator::new(&config.session),
            haptics: parts.haptics,
            telemetry: TelemetryRecorder::new(),
            generation: 0,
            tick: Tick::new(),
            session_id: None,
            outbox: Vec::new(),
            catalog,
            config,
        }
    }

    pub fn technique(&self) -> &Technique {
        self.machine.technique()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_active(&self) -> bool {
        self.machine.is_active()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn synth(&self) -> &SynthEngine {
        &self.synth
    }

    pub fn player(&self) -> &GuidedPlayer {
        &self.player
    }

    pub fn guide(&self) -> &GuideScheduler<P> {
        &self.guide
    }

    pub fn lifetime_sessions(&self) -> u64 {
        self.aggregator.lifetime_sessions()
    }

    /// Opt in or out of spoken phrases. Opting out silences any current one.
    pub fn set_guide_enabled(&mut self, enabled: bool) {
        self.guide.set_enabled(enabled);
    }

    pub fn frame(&self) -> PhaseFrame {
        self.machine.frame()
    }

    pub fn cue(&self) -> CueState {
        self.cues.current()
    }

    pub fn cue_updates(&self) -> watch::Receiver<CueState> {
        self.cues.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            technique_id: self.technique().id().to_string(),
            frame: self.frame(),
            cue: self.cue(),
            phrase: self.guide.phrase().map(str::to_string),
            speaking: self.guide.is_speaking() || self.player.is_speaking(),
            track_loading: self.player.is_loading(),
            track_progress: self.player.progress(),
            track_message: self.player.message(),
            milestone: self.aggregator.milestone().copied(),
        }
    }

    /// Starts a session. Restarts if one is already running.
    pub fn start(&mut self, now: Instant) {
        if self.is_active() {
            self.stop(now);
        }

        self.generation += 1;
        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        let technique = self.machine.technique().clone();
        let guided = technique.is_guided();

        self.machine.start(now);
        self.haptics.pulse(HapticPattern::SESSION_START);
        self.cues.start(&technique);
        self.telemetry.record(TelemetryEvent::SessionStarted {
            guided,
            audio: self.synth.is_available(),
        });
        info!("Session {} started: {} (generation {})", session_id, technique.id(), self.generation);
        self.outbox.push(SessionEvent::Started {
            session_id,
            technique_id: technique.id().to_string(),
        });

        if guided {
            // The recording is the audio; no bed, no phase tones.
            self.telemetry.record(TelemetryEvent::GuidedTrack(TrackEventKind::Loading));
            if let Err(e) = self.player.start(self.generation, &mut self.synth) {
                self.telemetry.record(TelemetryEvent::GuidedTrack(TrackEventKind::Failed));
                self.outbox.push(SessionEvent::GuidedTrackFailed { message: e.to_string() });
            }
            return;
        }

        self.synth.start_bed();
        if self.synth.has_bed() {
            self.telemetry.record(TelemetryEvent::VoiceLifecycle {
                kind: VoiceEventKind::BedStarted,
                count: self.synth.live_voices(),
            });
        }
        let first = *technique.phase(0);
        self.play_phase_tones(first.label, first.duration_seconds);
        self.guide.on_cycle(0, technique.display_name(), self.generation);
    }

    /// Stops the session. Idempotent. Returns a summary only for sessions
    /// long enough to count.
    pub fn stop(&mut self, now: Instant) -> Option<SessionSummary> {
        let stopped = self.machine.stop(now)?;
        self.generation += 1;

        self.cues.stop();
        self.guide.reset();
        self.player.stop(&mut self.synth);
        self.synth.stop_all();
        self.telemetry.record(TelemetryEvent::VoiceLifecycle {
            kind: VoiceEventKind::AllReleased,
            count: 0,
        });

        let session_id = self.session_id.take().unwrap_or_else(Uuid::new_v4);
        let technique = self.machine.technique().clone();
        let outcome = self.aggregator.record(session_id, &technique, stopped, now);

        self.telemetry.record(TelemetryEvent::SessionEnded {
            elapsed_secs: stopped.elapsed_seconds,
            cycles: stopped.cycles_completed,
            counted: outcome.is_some(),
        });
        info!(
            "Session {} stopped after {:.1}s, {} cycles",
            session_id, stopped.elapsed_seconds, stopped.cycles_completed
        );

        let summary = outcome.as_ref().map(|o| o.summary.clone());
        self.outbox.push(SessionEvent::Stopped { summary: summary.clone() });
        if let Some(m) = outcome.and_then(|o| o.milestone) {
            self.outbox.push(SessionEvent::MilestoneRaised(m));
        }
        summary
    }

    /// Selecting a technique mid-session stops the current one and starts
    /// the new one from phase 0.
    pub fn switch_technique(&mut self, id: &str, now: Instant) -> Result<Option<SessionSummary>, TechniqueError> {
        let technique = self.catalog.get(id)?;
        let was_active = self.is_active();
        let summary = if was_active { self.stop(now) } else { None };

        self.machine.set_technique(technique);
        if was_active {
            self.start(now);
        }
        Ok(summary)
    }

    fn play_phase_tones(&mut self, label: PhaseLabel, duration_seconds: f64) {
        self.synth.play_phase(label, duration_seconds);
        let count = self.synth.phase_voice_ids().len();
        if count > 0 {
            self.telemetry.record(TelemetryEvent::VoiceLifecycle {
                kind: VoiceEventKind::PhaseStarted,
                count,
            });
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// One frame. Applies async results, advances the phase machine and
    /// reacts to its transitions. Never awaits.
    pub fn tick_step(&mut self, now: Instant, events: Vec<Event>) -> Vec<SessionEvent> {
        self.tick = self.tick.next();
        let mut out = std::mem::take(&mut self.outbox);
        let guided = self.technique().is_guided();

        // === 1. ASYNC RESULTS (stale rejection) ===
        for event in events {
            match event {
                Event::PhraseReady { generation, cycle, phrase, origin } => {
                    if generation != self.generation || !self.is_active() {
                        info!("Discarded stale phrase: generation {} vs {}", generation, self.generation);
                        self.telemetry.record(TelemetryEvent::StaleDiscarded { kind: StaleKind::Phrase });
                        continue;
                    }
                    self.telemetry.record(TelemetryEvent::PhraseResolved { origin });
                    self.guide.deliver(phrase.clone());
                    out.push(SessionEvent::PhraseSpoken { cycle, phrase });
                }
                Event::TrackLoaded { generation, result } => {
                    if generation != self.generation || !self.is_active() {
                        info!("Discarded stale track load: generation {} vs {}", generation, self.generation);
                        self.telemetry.record(TelemetryEvent::StaleDiscarded { kind: StaleKind::Track });
                        continue;
                    }
                    match self.player.on_loaded(result, &mut self.synth) {
                        Ok(()) if self.player.is_speaking() => {
                            self.telemetry.record(TelemetryEvent::GuidedTrack(TrackEventKind::Playing));
                            out.push(SessionEvent::GuidedTrackReady);
                        }
                        Ok(()) => {}
                        Err(e) => {
                            self.telemetry.record(TelemetryEvent::GuidedTrack(TrackEventKind::Failed));
                            out.push(SessionEvent::GuidedTrackFailed { message: e.to_string() });
                        }
                    }
                }
                Event::Speech(signal) => self.guide.on_speech(signal),
            }
        }

        // === 2. PHASE ===
        for event in self.machine.tick(now) {
            match event {
                PhaseEvent::PhaseChanged { index, phase, overdue } => {
                    self.telemetry.record(TelemetryEvent::PhaseTransition {
                        index,
                        label: phase.label,
                        overdue,
                    });
                    if overdue {
                        debug!("Catching up: phase {} entered late, tones skipped", index);
                    } else {
                        if !guided {
                            self.play_phase_tones(phase.label, phase.duration_seconds);
                        }
                        self.haptics.pulse(HapticPattern::for_phase(phase.label));
                    }
                    out.push(SessionEvent::PhaseChanged { index, phase });
                }
                PhaseEvent::CycleCompleted { cycles, overdue } => {
                    self.telemetry.record(TelemetryEvent::CycleCompleted { cycles });
                    out.push(SessionEvent::CycleCompleted { cycles });
                    // Cycles replayed while catching up get no phrase.
                    if !guided && !overdue {
                        let name = self.machine.technique().display_name().to_string();
                        self.guide.on_cycle(cycles, &name, self.generation);
                    }
                }
            }
        }

        // === 3. GUIDED TRACK ===
        if self.player.update(self.synth.now()) {
            self.telemetry.record(TelemetryEvent::GuidedTrack(TrackEventKind::Finished));
            out.push(SessionEvent::GuidedTrackFinished);
        }

        // === 4. MILESTONE ===
        if self.aggregator.expire_milestone(now) {
            out.push(SessionEvent::MilestoneDismissed);
        }

        out
    }

    /// Drives `tick_step` at the configured cadence until `shutdown` fires,
    /// then stops the session. Returns the final summary, if it counted.
    pub async fn run<F>(&mut self, shutdown: CancellationToken, mut observer: F) -> Option<SessionSummary>
    where
        F: FnMut(&SessionEvent, &SessionSnapshot),
    {
        info!("Session reactor running, tick {}ms", self.config.tick_ms);
        let mut ticker = Ticker::new(self.config.tick_ms);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                (_, now) = ticker.next() => {
                    let events = self.drain_events();
                    let emitted = self.tick_step(now, events);
                    if !emitted.is_empty() {
                        let snapshot = self.snapshot();
                        for event in &emitted {
                            observer(event, &snapshot);
                        }
                    }
                }
            }
        }

        let summary = self.stop(Instant::now());
        let snapshot = self.snapshot();
        for event in std::mem::take(&mut self.outbox) {
            observer(&event, &snapshot);
        }
        summary
    }
}
