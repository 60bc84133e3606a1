use ringbuf::traits::Consumer;
use ringbuf::HeapCons;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use super::voice::{Voice, VoiceId};

/// Control-thread requests, applied at the start of the next render block.
#[derive(Debug)]
pub enum MixerCommand {
    Start(Box<Voice>),
    /// Ramp a voice's gain to `gain`, arriving at absolute time `at`.
    FadeTo { id: VoiceId, gain: f32, at: f64 },
    /// Fade to silence over `fade` seconds, then drop the voice.
    Release { id: VoiceId, fade: f64 },
}

/// State the engine and the render side share outside the command queue.
#[derive(Debug, Default)]
pub(crate) struct MixerShared {
    /// Frames rendered so far.
    pub frames: AtomicU64,
    /// Bumped by the engine on teardown. Voices started under an older epoch
    /// are released even if no `Release` command ever arrives.
    pub release_epoch: AtomicU64,
}

/// Render side of the synth. Owned by the output callback (or by a test
/// driving it offline).
pub struct Mixer {
    sample_rate: u32,
    frames: u64,
    shared: Arc<MixerShared>,
    release_fade: f64,
    epoch: u64,
    commands: HeapCons<MixerCommand>,
    voices: Vec<Voice>,
}

impl Mixer {
    pub(crate) fn new(
        sample_rate: u32,
        commands: HeapCons<MixerCommand>,
        shared: Arc<MixerShared>,
        release_fade: f64,
    ) -> Self {
        Self {
            sample_rate,
            frames: 0,
            shared,
            release_fade,
            epoch: 0,
            commands,
            voices: Vec::with_capacity(32),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id() == id)
    }

    /// Sum of every live voice's current gain.
    pub fn total_gain(&self) -> f32 {
        let now = self.now();
        self.voices.iter().map(|v| v.gain_at(now)).sum()
    }

    /// Releases everything started before the current teardown epoch.
    fn apply_epoch(&mut self) {
        let epoch = self.shared.release_epoch.load(Ordering::Acquire);
        if epoch == self.epoch {
            return;
        }
        self.epoch = epoch;
        let now = self.now();
        for v in self.voices.iter_mut().filter(|v| v.epoch < epoch) {
            v.release(now, self.release_fade);
        }
    }

    fn apply_commands(&mut self) {
        let now = self.now();
        while let Some(cmd) = self.commands.try_pop() {
            match cmd {
                MixerCommand::Start(voice) if voice.epoch < self.epoch => {
                    trace!("Skipping voice {} queued before teardown", voice.id());
                }
                MixerCommand::Start(voice) => self.voices.push(*voice),
                MixerCommand::FadeTo { id, gain, at } => {
                    if let Some(v) = self.voices.iter_mut().find(|v| v.id() == id && !v.is_released()) {
                        v.fade_to(gain, now, at);
                    }
                }
                MixerCommand::Release { id, fade } => {
                    if let Some(v) = self.voices.iter_mut().find(|v| v.id() == id) {
                        v.release(now, fade);
                    }
                }
            }
        }
    }

    /// Fills an interleaved buffer. Every channel gets the same mono mix.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        self.apply_epoch();
        self.apply_commands();

        let channels = channels.max(1);
        let dt = 1.0 / self.sample_rate as f64;

        for frame in out.chunks_mut(channels) {
            let t = self.frames as f64 * dt;
            let mut sum = 0.0f32;
            for voice in self.voices.iter_mut() {
                sum += voice.render(t, dt);
            }
            let sample = sum.clamp(-1.0, 1.0);
            for s in frame.iter_mut() {
                *s = sample;
            }
            self.frames += 1;
        }

        let now = self.now();
        let before = self.voices.len();
        self.voices.retain(|v| !v.is_finished(now));
        if self.voices.len() != before {
            trace!("Mixer dropped {} finished voices", before - self.voices.len());
        }

        self.shared.frames.store(self.frames, Ordering::Release);
    }

    /// Renders `seconds` of audio into a scratch buffer and discards it.
    pub fn advance(&mut self, seconds: f64) {
        let frames = (seconds * self.sample_rate as f64).round() as usize;
        let mut scratch = vec![0.0f32; 512];
        let mut left = frames;
        while left > 0 {
            let n = left.min(scratch.len());
            self.render(&mut scratch[..n], 1);
            left -= n;
        }
    }
}
