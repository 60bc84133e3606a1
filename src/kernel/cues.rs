use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::technique::Technique;
use super::time::config_secs;
use crate::config::CueConfig;

pub const GENERAL_CUES: &[&str] = &[
    "Focus on the centre of the orb.",
    "Let any thoughts pass. Return to the breath.",
    "Feel the cool air in. Warm air out.",
    "You are here. Nowhere else.",
    "Anchor your gaze. Anchor your mind.",
    "Notice the silence between your thoughts.",
    "Your body knows how to do this.",
];

/// Technique cues followed by the shared general cues.
#[derive(Debug, Clone)]
pub struct CuePool {
    cues: Arc<[String]>,
}

impl CuePool {
    pub fn for_technique(technique: &Technique) -> Self {
        let cues: Vec<String> = technique
            .cues()
            .iter()
            .cloned()
            .chain(GENERAL_CUES.iter().map(|s| s.to_string()))
            .collect();
        Self { cues: cues.into() }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Wraps around the end of the pool.
    pub fn get(&self, index: usize) -> &str {
        &self.cues[index % self.cues.len()]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueState {
    pub text: String,
    pub visible: bool,
    pub index: usize,
}

/// Shows a cue, hides it after the display window, waits out the idle
/// interval, then shows the next one. Runs on its own timer, unrelated to
/// phase timing.
pub struct CueRotation {
    display: Duration,
    idle: Duration,
    state: Arc<watch::Sender<CueState>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl CueRotation {
    pub fn new(config: &CueConfig) -> Self {
        let defaults = CueConfig::default();
        let (tx, _rx) = watch::channel(CueState::default());
        Self {
            display: config_secs("cues.display_secs", config.display_secs, defaults.display_secs),
            idle: config_secs("cues.idle_secs", config.idle_secs, defaults.idle_secs),
            state: Arc::new(tx),
            cancel: None,
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CueState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> CueState {
        self.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }

    /// Shows the first cue immediately. Must be called inside a tokio runtime.
    pub fn start(&mut self, technique: &Technique) {
        self.stop();

        let pool = CuePool::for_technique(technique);
        if pool.is_empty() {
            return;
        }

        self.state.send_replace(CueState {
            text: pool.get(0).to_string(),
            visible: true,
            index: 0,
        });

        let token = CancellationToken::new();
        let task_token = token.clone();
        let tx = self.state.clone();
        let display = self.display;
        let idle = self.idle;

        let task = tokio::spawn(async move {
            let mut index = 0usize;
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = sleep(display) => {}
                }
                tx.send_if_modified(|s| {
                    if task_token.is_cancelled() {
                        return false;
                    }
                    s.visible = false;
                    true
                });

                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = sleep(idle) => {}
                }
                index += 1;
                let text = pool.get(index).to_string();
                debug!("Cue {}: {}", index, text);
                tx.send_if_modified(|s| {
                    if task_token.is_cancelled() {
                        return false;
                    }
                    *s = CueState { text, visible: true, index };
                    true
                });
            }
        });

        self.cancel = Some(token);
        self.task = Some(task);
    }

    /// Cancels pending timers and clears the cue at once, without a fade.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state.send_replace(CueState::default());
    }
}

impl Drop for CueRotation {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}
