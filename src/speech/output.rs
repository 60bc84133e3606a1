use tokio::process::Command;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::GuideConfig;
use crate::error::SpeechError;
use crate::kernel::event::{Event, SpeechSignal};

/// Words per minute `say` uses at rate 1.0.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, config: &GuideConfig) -> Self {
        Self {
            text: text.into(),
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
        }
    }
}

/// Speaks one utterance at a time. Starting a new one cancels the old.
/// Start and end are reported as `Event::Speech` on the reactor channel.
pub trait SpeechOutput: Send {
    fn speak(&mut self, utterance: Utterance) -> Result<u64, SpeechError>;
    fn cancel(&mut self);
    fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in when no synthesizer exists.
#[derive(Debug, Default)]
pub struct SilentSpeech;

impl SpeechOutput for SilentSpeech {
    fn speak(&mut self, _utterance: Utterance) -> Result<u64, SpeechError> {
        Err(SpeechError::Unavailable)
    }

    fn cancel(&mut self) {}

    fn is_available(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceInfo {
    pub name: String,
    pub lang: String,
}

/// First preferred voice that exists, else the first English one, else any.
pub fn select_voice(voices: &[VoiceInfo], preferred: &[String]) -> Option<String> {
    preferred
        .iter()
        .find(|p| voices.iter().any(|v| &v.name == *p))
        .cloned()
        .or_else(|| voices.iter().find(|v| v.lang.starts_with("en")).map(|v| v.name.clone()))
        .or_else(|| voices.first().map(|v| v.name.clone()))
}

/// Parses `say -v ?` output: `Name  xx_YY  # sample sentence`.
pub fn parse_voice_list(output: &str) -> Vec<VoiceInfo> {
    output
        .lines()
        .filter_map(|line| {
            let head = line.split('#').next()?.trim();
            let (name, lang) = head.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() || !lang.contains(['_', '-']) {
                return None;
            }
            Some(VoiceInfo {
                name: name.to_string(),
                lang: lang.to_string(),
            })
        })
        .collect()
}

/// Drives an external `say`-style program, one child process per utterance.
pub struct SayCommand {
    program: String,
    voice: Option<String>,
    tx: mpsc::Sender<Event>,
    stop: Option<oneshot::Sender<()>>,
    next_id: u64,
}

impl SayCommand {
    pub fn new(program: impl Into<String>, voice: Option<String>, tx: mpsc::Sender<Event>) -> Self {
        Self {
            program: program.into(),
            voice,
            tx,
            stop: None,
            next_id: 1,
        }
    }

    /// Lists installed voices and picks one. Fails if the program is missing.
    pub async fn detect(config: &GuideConfig, tx: mpsc::Sender<Event>) -> Result<Self, SpeechError> {
        let output = Command::new(&config.speech_program)
            .args(["-v", "?"])
            .output()
            .await?;
        if !output.status.success() {
            return Err(SpeechError::Unavailable);
        }
        let voices = parse_voice_list(&String::from_utf8_lossy(&output.stdout));
        let voice = select_voice(&voices, &config.preferred_voices);
        info!("Speech voice: {}", voice.as_deref().unwrap_or("(system default)"));
        Ok(Self::new(config.speech_program.clone(), voice, tx))
    }
}

impl SpeechOutput for SayCommand {
    /// Returns at once; the child is spawned on its own task so the caller
    /// never waits on process creation.
    fn speak(&mut self, utterance: Utterance) -> Result<u64, SpeechError> {
        self.cancel();

        let mut cmd = Command::new(&self.program);
        if let Some(v) = &self.voice {
            cmd.arg("-v").arg(v);
        }
        // `say` exposes rate only; pitch and volume are left to the system.
        let wpm = (BASE_WORDS_PER_MINUTE * utterance.rate).round().max(1.0) as u32;
        cmd.arg("-r").arg(wpm.to_string()).arg(&utterance.text).kill_on_drop(true);

        let id = self.next_id;
        self.next_id += 1;

        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop = Some(stop_tx);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let ended = Event::Speech(SpeechSignal::Ended { utterance: id });
            if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                let _ = tx.send(ended).await;
                return;
            }

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    warn!("Failed to start speech program: {}", e);
                    let _ = tx.send(ended).await;
                    return;
                }
            };
            let _ = tx.send(Event::Speech(SpeechSignal::Started { utterance: id })).await;

            tokio::select! {
                _ = child.wait() => {}
                _ = &mut stop_rx => {
                    debug!("Cancelling utterance {}", id);
                    let _ = child.kill().await;
                }
            }

            let _ = tx.send(ended).await;
        });

        Ok(id)
    }

    fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for SayCommand {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Builds the configured speech output, falling back to silence.
pub async fn open_speech(config: &GuideConfig, tx: mpsc::Sender<Event>) -> Box<dyn SpeechOutput> {
    match SayCommand::detect(config, tx).await {
        Ok(say) => Box::new(say),
        Err(e) => {
            warn!("Speech unavailable, phrases will be shown only: {}", e);
            Box::new(SilentSpeech)
        }
    }
}
