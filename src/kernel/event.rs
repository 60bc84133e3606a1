use std::sync::Arc;

use uuid::Uuid;

use super::aggregator::{Milestone, SessionSummary};
use super::technique::Phase;
use crate::error::TrackError;
use crate::speech::phrase::PhraseOrigin;

/// Generation stamp. Bumped on every start and stop; async results carrying
/// an older stamp are discarded.
pub type Generation = u64;

/// Asynchronous results arriving from spawned work (network, decoding,
/// speech processes). Drained by the reactor once per tick.
#[derive(Debug, Clone)]
pub enum Event {
    PhraseReady {
        generation: Generation,
        cycle: u32,
        phrase: String,
        origin: PhraseOrigin,
    },
    TrackLoaded {
        generation: Generation,
        result: Result<Arc<[f32]>, TrackError>,
    },
    Speech(SpeechSignal),
}

/// Callbacks from the speech output. `utterance` identifies which request
/// the signal belongs to so a late `Ended` cannot clear a newer utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechSignal {
    Started { utterance: u64 },
    Ended { utterance: u64 },
}

/// Notifications emitted by the reactor for display layers and logs.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started { session_id: Uuid, technique_id: String },
    PhaseChanged { index: usize, phase: Phase },
    CycleCompleted { cycles: u32 },
    PhraseSpoken { cycle: u32, phrase: String },
    GuidedTrackReady,
    GuidedTrackFinished,
    GuidedTrackFailed { message: String },
    Stopped { summary: Option<SessionSummary> },
    MilestoneRaised(Milestone),
    MilestoneDismissed,
}
