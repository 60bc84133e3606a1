use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::PhraseError;

/// Where in the session a phrase is asked for. Shapes the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentHint {
    Beginning,
    SecondCycle,
    Milestone,
    Ongoing,
}

impl MomentHint {
    pub fn for_cycle(cycle: u32) -> Self {
        match cycle {
            0 => MomentHint::Beginning,
            1 => MomentHint::SecondCycle,
            n if n % 5 == 0 => MomentHint::Milestone,
            _ => MomentHint::Ongoing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MomentHint::Beginning => "session beginning",
            MomentHint::SecondCycle => "second cycle",
            MomentHint::Milestone => "fifth cycle milestone",
            MomentHint::Ongoing => "ongoing session",
        }
    }
}

/// Everything a phrase source is told. Deliberately nothing about the user.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseRequest {
    pub technique_name: String,
    pub cycle: u32,
    pub moment: MomentHint,
}

impl PhraseRequest {
    pub fn new(technique_name: impl Into<String>, cycle: u32) -> Self {
        Self {
            technique_name: technique_name.into(),
            cycle,
            moment: MomentHint::for_cycle(cycle),
        }
    }

    pub fn user_prompt(&self) -> String {
        format!(
            "Technique: {}. Moment: {}. Cycle: {}. Give one phrase.",
            self.technique_name,
            self.moment.as_str(),
            self.cycle + 1
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhraseOrigin {
    Service,
    Fallback,
}

/// Something that can produce a guide phrase. Implementations need not
/// enforce a timeout; the scheduler does.
pub trait PhraseSource: Send + Sync + 'static {
    fn fetch(&self, request: PhraseRequest) -> impl Future<Output = Result<String, PhraseError>> + Send;
}

pub const SYSTEM_PROMPT: &str = "You are a meditation guide. Respond with ONE short calming phrase \
(8\u{2013}12 words maximum). Present tense, gentle, non-commanding. No quotes, no punctuation except a period.";

pub const FALLBACK_PHRASES: [&str; 5] = [
    "Let your body soften with each breath.",
    "Nothing to do right now but breathe.",
    "You are exactly where you need to be.",
    "Each breath slows your world a little.",
    "Let the exhale take the weight with it.",
];

pub fn fallback_phrase(cycle: u32) -> &'static str {
    FALLBACK_PHRASES[cycle as usize % FALLBACK_PHRASES.len()]
}

/// Source that never answers; every request falls back.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflinePhrases;

impl PhraseSource for OfflinePhrases {
    async fn fetch(&self, _request: PhraseRequest) -> Result<String, PhraseError> {
        Err(PhraseError::Empty)
    }
}
