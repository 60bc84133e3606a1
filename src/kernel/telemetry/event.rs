use serde::{Deserialize, Serialize};

use crate::kernel::technique::PhaseLabel;
use crate::speech::phrase::PhraseOrigin;

// Allowed: indices, labels, counts, durations, enums
// Forbidden: phrase text, audio samples, anything typed by the user

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    SessionStarted {
        guided: bool,
        audio: bool,
    },

    PhaseTransition {
        index: usize,
        label: PhaseLabel,
        /// Entered late enough that its tones were skipped.
        overdue: bool,
    },

    CycleCompleted {
        cycles: u32,
    },

    PhraseResolved {
        origin: PhraseOrigin,
    },

    StaleDiscarded {
        kind: StaleKind,
    },

    VoiceLifecycle {
        kind: VoiceEventKind,
        count: usize,
    },

    GuidedTrack(TrackEventKind),

    SessionEnded {
        elapsed_secs: f64,
        cycles: u32,
        counted: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaleKind {
    Phrase,
    Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceEventKind {
    BedStarted,
    PhaseStarted,
    AllReleased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackEventKind {
    Loading,
    Playing,
    Finished,
    Failed,
}
