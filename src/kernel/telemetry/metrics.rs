use std::collections::VecDeque;

use super::event::{StaleKind, TelemetryEvent, TrackEventKind, VoiceEventKind};
use crate::speech::phrase::PhraseOrigin;

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub session_stats: SessionStats,
    pub phase_stats: PhaseStats,
    pub phrase_stats: PhraseStats,
    pub voice_stats: VoiceStats,
    pub track_stats: TrackStats,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub started: u64,
    pub ended: u64,
    pub counted: u64,
    pub skipped: u64,
    pub total_secs: f64,
    pub avg_session_secs: f64,
    pub max_cycles: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PhaseStats {
    pub transitions: u64,
    pub overdue: u64,
    pub cycles: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PhraseStats {
    pub from_service: u64,
    pub from_fallback: u64,
    pub stale_discarded: u64,
    /// Share of resolved phrases that came from the fallback bank.
    pub fallback_ratio: f64,
}

#[derive(Debug, Clone, Default)]
pub struct VoiceStats {
    pub bed_starts: u64,
    pub phase_voices_started: u64,
    pub releases: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TrackStats {
    pub loads: u64,
    pub played: u64,
    pub finished: u64,
    pub failed: u64,
    pub stale_discarded: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::SessionStarted { .. } => snap.session_stats.started += 1,
            TelemetryEvent::PhaseTransition { overdue, .. } => {
                snap.phase_stats.transitions += 1;
                if *overdue {
                    snap.phase_stats.overdue += 1;
                }
            }
            TelemetryEvent::CycleCompleted { .. } => snap.phase_stats.cycles += 1,
            TelemetryEvent::PhraseResolved { origin } => match origin {
                PhraseOrigin::Service => snap.phrase_stats.from_service += 1,
                PhraseOrigin::Fallback => snap.phrase_stats.from_fallback += 1,
            },
            TelemetryEvent::StaleDiscarded { kind } => match kind {
                StaleKind::Phrase => snap.phrase_stats.stale_discarded += 1,
                StaleKind::Track => snap.track_stats.stale_discarded += 1,
            },
            TelemetryEvent::VoiceLifecycle { kind, count } => match kind {
                VoiceEventKind::BedStarted => snap.voice_stats.bed_starts += 1,
                VoiceEventKind::PhaseStarted => snap.voice_stats.phase_voices_started += *count as u64,
                VoiceEventKind::AllReleased => snap.voice_stats.releases += 1,
            },
            TelemetryEvent::GuidedTrack(kind) => match kind {
                TrackEventKind::Loading => snap.track_stats.loads += 1,
                TrackEventKind::Playing => snap.track_stats.played += 1,
                TrackEventKind::Finished => snap.track_stats.finished += 1,
                TrackEventKind::Failed => snap.track_stats.failed += 1,
            },
            TelemetryEvent::SessionEnded { elapsed_secs, cycles, counted } => {
                snap.session_stats.ended += 1;
                snap.session_stats.total_secs += elapsed_secs;
                if *counted {
                    snap.session_stats.counted += 1;
                } else {
                    snap.session_stats.skipped += 1;
                }
                if *cycles > snap.session_stats.max_cycles {
                    snap.session_stats.max_cycles = *cycles;
                }
            }
        }
    }

    // Averages
    if snap.session_stats.ended > 0 {
        snap.session_stats.avg_session_secs = snap.session_stats.total_secs / snap.session_stats.ended as f64;
    }

    let resolved = snap.phrase_stats.from_service + snap.phrase_stats.from_fallback;
    if resolved > 0 {
        snap.phrase_stats.fallback_ratio = snap.phrase_stats.from_fallback as f64 / resolved as f64;
    }

    snap
}
