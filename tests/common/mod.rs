#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use breathwork::audio::{Mixer, SynthEngine};
use breathwork::error::{PhraseError, SpeechError};
use breathwork::kernel::event::SessionEvent;
use breathwork::kernel::haptics::{HapticPattern, HapticSink};
use breathwork::speech::output::{SpeechOutput, Utterance};
use breathwork::speech::phrase::{PhraseRequest, PhraseSource};
use breathwork::{Catalog, EngineConfig, ReactorParts, SessionReactor};

pub const SAMPLE_RATE: u32 = 48_000;

/// Phrase source that never answers.
pub struct Hanging;

impl PhraseSource for Hanging {
    async fn fetch(&self, _request: PhraseRequest) -> Result<String, PhraseError> {
        std::future::pending().await
    }
}

/// Phrase source with a canned answer.
pub struct Fixed(pub &'static str);

impl PhraseSource for Fixed {
    async fn fetch(&self, _request: PhraseRequest) -> Result<String, PhraseError> {
        Ok(self.0.to_string())
    }
}

/// Phrase source that always errors.
pub struct Failing;

impl PhraseSource for Failing {
    async fn fetch(&self, _request: PhraseRequest) -> Result<String, PhraseError> {
        Err(PhraseError::Status(503))
    }
}

/// Phrase source that counts requests and never answers.
#[derive(Clone, Default)]
pub struct Counting {
    pub calls: Arc<AtomicUsize>,
}

impl PhraseSource for Counting {
    async fn fetch(&self, _request: PhraseRequest) -> Result<String, PhraseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Lets spawned tasks run up to their first await.
pub async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[derive(Clone, Default)]
pub struct RecordingSpeech {
    pub spoken: Arc<Mutex<Vec<Utterance>>>,
    pub cancels: Arc<AtomicUsize>,
    /// Reports itself unavailable, like a machine with no synthesizer.
    pub muted: bool,
}

impl RecordingSpeech {
    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl SpeechOutput for RecordingSpeech {
    fn speak(&mut self, utterance: Utterance) -> Result<u64, SpeechError> {
        let mut spoken = self.spoken.lock().unwrap();
        spoken.push(utterance);
        Ok(spoken.len() as u64)
    }

    fn cancel(&mut self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn is_available(&self) -> bool {
        !self.muted
    }
}

#[derive(Clone, Default)]
pub struct RecordingHaptics {
    pub pulses: Arc<Mutex<Vec<HapticPattern>>>,
}

impl RecordingHaptics {
    pub fn pulses(&self) -> Vec<HapticPattern> {
        self.pulses.lock().unwrap().clone()
    }
}

impl HapticSink for RecordingHaptics {
    fn pulse(&mut self, pattern: HapticPattern) {
        self.pulses.lock().unwrap().push(pattern);
    }
}

pub struct Harness<P: PhraseSource> {
    pub reactor: SessionReactor<P>,
    pub mixer: Mixer,
    pub speech: RecordingSpeech,
    pub haptics: RecordingHaptics,
}

/// Reactor over an offline mixer, recording speech and haptics.
pub fn harness<P: PhraseSource>(config: EngineConfig, technique: &str, phrases: P) -> Harness<P> {
    let catalog = Catalog::new(config.techniques.clone()).unwrap();
    let technique = catalog.get(technique).unwrap();
    let (tx, rx) = mpsc::channel(100);
    let (synth, mixer) = SynthEngine::offline(&config.audio, SAMPLE_RATE);
    let speech = RecordingSpeech::default();
    let haptics = RecordingHaptics::default();

    let parts = ReactorParts {
        synth,
        speech: Box::new(speech.clone()),
        phrases,
        haptics: Box::new(haptics.clone()),
    };
    let reactor = SessionReactor::new(config, catalog, technique, rx, tx, parts);

    Harness { reactor, mixer, speech, haptics }
}

pub fn at(t0: Instant, secs: f64) -> Instant {
    t0 + Duration::from_secs_f64(secs)
}

/// Ticks at 60 Hz over `[from_frame, to_frame]`, collecting emitted events.
pub fn run_frames<P: PhraseSource>(
    reactor: &mut SessionReactor<P>,
    t0: Instant,
    from_frame: u64,
    to_frame: u64,
) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    for frame in from_frame..=to_frame {
        out.extend(reactor.tick_step(at(t0, frame as f64 / 60.0), Vec::new()));
    }
    out
}

/// Writes a mono 16-bit sine WAV.
pub fn write_sine_wav(path: &std::path::Path, sample_rate: u32, channels: u16, secs: f64) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (sample_rate as f64 * secs) as usize;
    for n in 0..frames {
        let s = (n as f64 * 440.0 * std::f64::consts::TAU / sample_rate as f64).sin() * 0.5;
        for _ in 0..channels {
            writer.write_sample((s * i16::MAX as f64) as i16).unwrap();
        }
    }
    writer.finalize().unwrap();
}
