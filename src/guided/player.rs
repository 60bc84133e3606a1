use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::audio::track::load_track;
use crate::audio::SynthEngine;
use crate::error::TrackError;
use crate::kernel::event::{Event, Generation};

pub const PLAYING_MESSAGE: &str = "Close your eyes and follow the voice.";
pub const FINISHED_MESSAGE: &str = "Gently open your eyes.";

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerStatus {
    Idle,
    Loading,
    Playing,
    Finished,
    /// Terminal until the next `start`.
    Failed(TrackError),
}

/// Plays the pre-recorded track for the guided technique and tracks its
/// position. Loading runs on a blocking thread and reports back through
/// `Event::TrackLoaded`.
pub struct GuidedPlayer {
    path: PathBuf,
    tx: mpsc::Sender<Event>,
    status: PlayerStatus,
    load: Option<JoinHandle<()>>,
    started_at: f64,
    length: f64,
    progress: f64,
}

impl GuidedPlayer {
    pub fn new(path: impl Into<PathBuf>, tx: mpsc::Sender<Event>) -> Self {
        Self {
            path: path.into(),
            tx,
            status: PlayerStatus::Idle,
            load: None,
            started_at: 0.0,
            length: 0.0,
            progress: 0.0,
        }
    }

    /// Begins loading the track. Fails immediately when there is no output
    /// to play it on.
    pub fn start(&mut self, generation: Generation, synth: &mut SynthEngine) -> Result<(), TrackError> {
        self.stop(synth);

        let Some(rate) = synth.sample_rate() else {
            self.status = PlayerStatus::Failed(TrackError::NoOutput);
            return Err(TrackError::NoOutput);
        };

        self.status = PlayerStatus::Loading;
        let path = self.path.clone();
        let tx = self.tx.clone();
        info!("Loading guided track {}", path.display());

        self.load = Some(tokio::spawn(async move {
            let result = match tokio::task::spawn_blocking(move || load_track(&path, rate)).await {
                Ok(r) => r,
                Err(e) => Err(TrackError::Decode(e.to_string())),
            };
            let _ = tx.send(Event::TrackLoaded { generation, result }).await;
        }));

        Ok(())
    }

    /// Applies a load result. Ignored unless a load is outstanding.
    pub fn on_loaded(&mut self, result: Result<std::sync::Arc<[f32]>, TrackError>, synth: &mut SynthEngine) -> Result<(), TrackError> {
        if self.status != PlayerStatus::Loading {
            return Ok(());
        }
        self.load = None;

        let outcome = result.and_then(|data| synth.play_track(data).ok_or(TrackError::NoOutput));
        match outcome {
            Ok(length) => {
                self.started_at = synth.now();
                self.length = length;
                self.progress = 0.0;
                self.status = PlayerStatus::Playing;
                info!("Guided track playing ({:.1}s)", length);
                Ok(())
            }
            Err(e) => {
                warn!("Guided track failed: {}", e);
                self.status = PlayerStatus::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Advances progress from the synth clock. Returns true the moment the
    /// track completes.
    pub fn update(&mut self, now: f64) -> bool {
        if self.status != PlayerStatus::Playing {
            return false;
        }
        self.progress = if self.length > 0.0 {
            ((now - self.started_at) / self.length).clamp(0.0, 1.0)
        } else {
            1.0
        };
        if self.progress >= 1.0 {
            self.status = PlayerStatus::Finished;
            return true;
        }
        false
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&mut self, synth: &mut SynthEngine) {
        if let Some(task) = self.load.take() {
            task.abort();
        }
        synth.stop_track();
        self.status = PlayerStatus::Idle;
        self.progress = 0.0;
        self.started_at = 0.0;
        self.length = 0.0;
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == PlayerStatus::Loading
    }

    pub fn is_speaking(&self) -> bool {
        self.status == PlayerStatus::Playing
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Inline status line for display.
    pub fn message(&self) -> Option<String> {
        match &self.status {
            PlayerStatus::Idle | PlayerStatus::Loading => None,
            PlayerStatus::Playing => Some(PLAYING_MESSAGE.to_string()),
            PlayerStatus::Finished => Some(FINISHED_MESSAGE.to_string()),
            PlayerStatus::Failed(e) => Some(e.to_string()),
        }
    }
}
