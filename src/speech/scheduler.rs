use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::output::{SpeechOutput, Utterance};
use super::phrase::{fallback_phrase, PhraseOrigin, PhraseRequest, PhraseSource};
use crate::config::GuideConfig;
use crate::error::PhraseError;
use crate::kernel::event::{Event, Generation, SpeechSignal};

/// Decides which cycles get a spoken phrase, fetches it off the tick loop,
/// and speaks whatever comes back if it is still current.
pub struct GuideScheduler<P: PhraseSource> {
    config: GuideConfig,
    enabled: bool,
    source: Arc<P>,
    speech: Box<dyn SpeechOutput>,
    tx: mpsc::Sender<Event>,
    last_cycle: Option<u32>,
    pending: Option<JoinHandle<()>>,
    phrase: Option<String>,
    utterance: Option<u64>,
    speaking: bool,
}

impl<P: PhraseSource> GuideScheduler<P> {
    pub fn new(config: &GuideConfig, source: P, speech: Box<dyn SpeechOutput>, tx: mpsc::Sender<Event>) -> Self {
        Self {
            config: config.clone(),
            enabled: config.enabled,
            source: Arc::new(source),
            speech,
            tx,
            last_cycle: None,
            pending: None,
            phrase: None,
            utterance: None,
            speaking: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    /// Every cycle up to `every_other_after`, then even cycles only.
    pub fn wants_phrase(&self, cycle: u32) -> bool {
        !(cycle > self.config.every_other_after && cycle % 2 != 0)
    }

    /// Called once per cycle boundary (and for cycle 0 at start). Returns
    /// whether a fetch was started.
    pub fn on_cycle(&mut self, cycle: u32, technique_name: &str, generation: Generation) -> bool {
        if !self.enabled || self.last_cycle == Some(cycle) {
            return false;
        }
        self.last_cycle = Some(cycle);
        if !self.wants_phrase(cycle) {
            debug!("Cycle {} skipped by phrase cadence", cycle);
            return false;
        }

        if let Some(prev) = self.pending.take() {
            prev.abort();
        }

        let request = PhraseRequest::new(technique_name, cycle);
        let source = self.source.clone();
        let tx = self.tx.clone();
        let timeout_ms = self.config.timeout_ms;

        self.pending = Some(tokio::spawn(async move {
            let result = tokio::time::timeout(Duration::from_millis(timeout_ms), source.fetch(request))
                .await
                .unwrap_or(Err(PhraseError::Timeout(timeout_ms)));

            let (phrase, origin) = match result {
                Ok(text) => (text, PhraseOrigin::Service),
                Err(e) => {
                    warn!("Phrase source failed, using fallback: {}", e);
                    (fallback_phrase(cycle).to_string(), PhraseOrigin::Fallback)
                }
            };

            let _ = tx
                .send(Event::PhraseReady {
                    generation,
                    cycle,
                    phrase,
                    origin,
                })
                .await;
        }));

        true
    }

    /// Shows and speaks a phrase the reactor has accepted as current.
    pub fn deliver(&mut self, phrase: String) {
        if !self.enabled {
            return;
        }
        self.phrase = Some(phrase.clone());
        if !self.speech.is_available() {
            // Text-only: the phrase is shown, nothing is spoken.
            return;
        }

        match self.speech.speak(Utterance::new(phrase, &self.config)) {
            Ok(id) => {
                self.utterance = Some(id);
                self.speaking = false;
            }
            Err(e) => debug!("Phrase not spoken: {}", e),
        }
    }

    pub fn on_speech(&mut self, signal: SpeechSignal) {
        match signal {
            SpeechSignal::Started { utterance } if self.utterance == Some(utterance) => {
                self.speaking = true;
            }
            SpeechSignal::Ended { utterance } if self.utterance == Some(utterance) => {
                self.speaking = false;
                self.utterance = None;
            }
            _ => {}
        }
    }

    /// Abandons any fetch, silences speech and forgets cycle history.
    pub fn reset(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
            info!("Pending phrase fetch abandoned");
        }
        self.speech.cancel();
        self.last_cycle = None;
        self.phrase = None;
        self.utterance = None;
        self.speaking = false;
    }

    pub fn phrase(&self) -> Option<&str> {
        self.phrase.as_deref()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl<P: PhraseSource> Drop for GuideScheduler<P> {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        self.speech.cancel();
    }
}
