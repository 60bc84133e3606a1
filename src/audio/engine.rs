use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::automation::Automation;
use super::mixer::{Mixer, MixerCommand, MixerShared};
use super::output::AudioOutput;
use super::patches;
use super::voice::{Voice, VoiceId};
use crate::config::AudioConfig;
use crate::kernel::technique::PhaseLabel;

/// Phase duration used when a phase carries no usable one.
pub const FALLBACK_PHASE_SECS: f64 = 4.0;

const TRACK_FADE_IN_SECS: f64 = 0.05;
const OFFLINE_NOISE_SEED: u64 = 0x5EED;

/// A started voice. Not `Clone`: the only way to stop a voice is to hand its
/// handle back, so each voice is stopped at most once.
#[derive(Debug)]
pub struct VoiceHandle {
    id: VoiceId,
    stop_at: Option<f64>,
}

impl VoiceHandle {
    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// Scheduled natural end, if the voice has one.
    pub fn stop_at(&self) -> Option<f64> {
        self.stop_at
    }

    fn ended_by(&self, now: f64) -> bool {
        self.stop_at.map(|s| now >= s).unwrap_or(false)
    }
}

struct Link {
    commands: HeapProd<MixerCommand>,
    shared: Arc<MixerShared>,
    sample_rate: u32,
    _output: Option<AudioOutput>,
}

/// Control side of the synth. Owns every voice handle and sends commands to
/// the render thread. With no output device it runs silent and every call is
/// a no-op.
pub struct SynthEngine {
    config: AudioConfig,
    link: Option<Link>,
    next_id: VoiceId,
    noise_seed: u64,
    epoch: u64,
    bed: Vec<VoiceHandle>,
    phase_voices: Vec<VoiceHandle>,
    track: Option<VoiceHandle>,
    /// Stopped handles whose `Release` did not fit in the queue yet.
    pending_release: Vec<VoiceHandle>,
}

impl SynthEngine {
    fn with_link(config: &AudioConfig, link: Option<Link>, noise_seed: u64) -> Self {
        Self {
            config: config.clone(),
            link,
            next_id: 1,
            noise_seed,
            epoch: 0,
            bed: Vec::new(),
            phase_voices: Vec::new(),
            track: None,
            pending_release: Vec::new(),
        }
    }

    /// Opens the default output device, or runs silent if that fails.
    pub fn open(config: &AudioConfig) -> Self {
        if !config.enabled {
            info!("Audio disabled by config");
            return Self::silent(config);
        }

        let (prod, cons) = HeapRb::<MixerCommand>::new(config.command_capacity.max(1)).split();
        let shared = Arc::new(MixerShared::default());
        let mixer_shared = shared.clone();
        let fade = config.voice_fade_secs;

        match AudioOutput::open(move |rate| Mixer::new(rate, cons, mixer_shared, fade)) {
            Ok(output) => {
                let link = Link {
                    commands: prod,
                    shared,
                    sample_rate: output.sample_rate,
                    _output: Some(output),
                };
                Self::with_link(config, Some(link), rand::random())
            }
            Err(e) => {
                warn!("Audio output unavailable, running silent: {}", e);
                Self::silent(config)
            }
        }
    }

    pub fn silent(config: &AudioConfig) -> Self {
        Self::with_link(config, None, 0)
    }

    /// Engine plus a mixer the caller renders by hand.
    pub fn offline(config: &AudioConfig, sample_rate: u32) -> (Self, Mixer) {
        let (prod, cons) = HeapRb::<MixerCommand>::new(config.command_capacity.max(1)).split();
        let shared = Arc::new(MixerShared::default());
        let mixer = Mixer::new(sample_rate, cons, shared.clone(), config.voice_fade_secs);
        let link = Link {
            commands: prod,
            shared,
            sample_rate,
            _output: None,
        };
        (Self::with_link(config, Some(link), OFFLINE_NOISE_SEED), mixer)
    }

    pub fn is_available(&self) -> bool {
        self.link.is_some()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.link.as_ref().map(|l| l.sample_rate)
    }

    /// Seconds rendered so far by the output.
    pub fn now(&self) -> f64 {
        match &self.link {
            Some(l) => l.shared.frames.load(Ordering::Acquire) as f64 / l.sample_rate as f64,
            None => 0.0,
        }
    }

    fn send(&mut self, cmd: MixerCommand) -> bool {
        self.retry_releases();
        let Some(link) = self.link.as_mut() else {
            return false;
        };
        if link.commands.try_push(cmd).is_err() {
            warn!("Mixer command queue full, dropping command");
            return false;
        }
        true
    }

    /// Queues parked releases, oldest first, until the queue is full again.
    fn retry_releases(&mut self) {
        if self.pending_release.is_empty() {
            return;
        }
        let Some(link) = self.link.as_mut() else {
            return;
        };
        let now = link.shared.frames.load(Ordering::Acquire) as f64 / link.sample_rate as f64;
        let fade = self.config.voice_fade_secs;
        let mut sent = 0;
        for h in &self.pending_release {
            if h.ended_by(now) {
                sent += 1;
                continue;
            }
            if link.commands.try_push(MixerCommand::Release { id: h.id, fade }).is_err() {
                break;
            }
            sent += 1;
        }
        self.pending_release.drain(..sent);
        if sent > 0 {
            debug!("Queued {} parked releases, {} still waiting", sent, self.pending_release.len());
        }
    }

    pub fn start(&mut self, mut voice: Voice) -> Option<VoiceHandle> {
        if self.link.is_none() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        voice.id = id;
        voice.epoch = self.epoch;
        let stop_at = voice.stop_at();

        if !self.send(MixerCommand::Start(Box::new(voice))) {
            return None;
        }
        Some(VoiceHandle { id, stop_at })
    }

    /// Ramps the voice's gain to `gain`, arriving at output time `at`.
    /// Returns false when the voice has already ended or the change could
    /// not be queued.
    pub fn schedule_fade_to(&mut self, handle: &VoiceHandle, gain: f32, at: f64) -> bool {
        if handle.ended_by(self.now()) {
            return false;
        }
        self.send(MixerCommand::FadeTo { id: handle.id, gain, at })
    }

    /// Fades the voice out over the configured fade, then drops it. When the
    /// queue is full the handle is parked and the release retried on the
    /// next engine call.
    pub fn stop(&mut self, handle: VoiceHandle) {
        if handle.ended_by(self.now()) {
            return;
        }
        let fade = self.config.voice_fade_secs;
        if !self.send(MixerCommand::Release { id: handle.id, fade }) && self.link.is_some() {
            self.pending_release.push(handle);
        }
    }

    pub fn has_bed(&self) -> bool {
        !self.bed.is_empty()
    }

    /// Drone pair plus filtered noise, fading in. Idempotent.
    pub fn start_bed(&mut self) {
        if self.has_bed() || !self.is_available() {
            return;
        }
        let now = self.now();
        let mut voices = patches::drone(&self.config, now);
        if let Some(rate) = self.sample_rate() {
            voices.push(patches::noise(&self.config, self.noise_seed, rate, now));
        }
        for v in voices {
            if let Some(h) = self.start(v) {
                self.bed.push(h);
            }
        }
        debug!("Ambient bed started ({} voices)", self.bed.len());
    }

    /// Starts the tones for a new phase, fading out the previous ones.
    pub fn play_phase(&mut self, label: PhaseLabel, duration_seconds: f64) {
        self.release_phase();
        if !self.is_available() {
            return;
        }
        let dur = if duration_seconds.is_finite() && duration_seconds > 0.0 {
            duration_seconds
        } else {
            FALLBACK_PHASE_SECS
        };
        let now = self.now();
        for v in patches::phase(label, now, dur) {
            if let Some(h) = self.start(v) {
                self.phase_voices.push(h);
            }
        }
    }

    pub fn release_phase(&mut self) {
        for h in std::mem::take(&mut self.phase_voices) {
            self.stop(h);
        }
    }

    /// Plays a decoded track at the output rate. Returns its length in
    /// seconds, or `None` when there is no output.
    pub fn play_track(&mut self, data: Arc<[f32]>) -> Option<f64> {
        self.stop_track();
        let rate = self.sample_rate()?;
        let now = self.now();
        let length = data.len() as f64 / rate as f64;

        let mut gain = Automation::new(0.0);
        gain.set_value_at(0.0, now).linear_ramp_to(1.0, now + TRACK_FADE_IN_SECS);
        let voice = Voice::sample(data, gain, now).stopping_at(now + length);

        self.track = Some(self.start(voice)?);
        Some(length)
    }

    pub fn stop_track(&mut self) {
        if let Some(h) = self.track.take() {
            self.stop(h);
        }
    }

    /// Fades out every voice the engine owns. Goes through the shared epoch
    /// rather than the command queue, so it works with the queue full.
    pub fn stop_all(&mut self) {
        let Some(link) = self.link.as_ref() else {
            return;
        };
        self.epoch += 1;
        link.shared.release_epoch.store(self.epoch, Ordering::Release);

        let released = self.bed.len() + self.phase_voices.len() + self.track.iter().len() + self.pending_release.len();
        self.bed.clear();
        self.phase_voices.clear();
        self.track = None;
        self.pending_release.clear();
        if released > 0 {
            debug!("Released {} voices (epoch {})", released, self.epoch);
        }
    }

    /// Handles that have not reached their natural end.
    pub fn live_voices(&self) -> usize {
        let now = self.now();
        self.bed
            .iter()
            .chain(self.phase_voices.iter())
            .chain(self.track.iter())
            .chain(self.pending_release.iter())
            .filter(|h| !h.ended_by(now))
            .count()
    }

    pub fn phase_voice_ids(&self) -> Vec<VoiceId> {
        self.phase_voices.iter().map(|h| h.id).collect()
    }
}

impl Drop for SynthEngine {
    fn drop(&mut self) {
        self.stop_all();
    }
}
