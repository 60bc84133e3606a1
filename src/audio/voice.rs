use std::f64::consts::TAU;
use std::sync::Arc;

use super::automation::Automation;
use super::filter::LowPass;
use super::pink::PinkNoise;

pub type VoiceId = u64;

/// Extra time a released voice lingers after its fade reaches zero.
pub const RELEASE_TAIL_SECS: f64 = 0.05;

#[derive(Debug, Clone)]
enum Source {
    Sine { phase: f64, frequency: Automation },
    Noise { noise: PinkNoise, filter: LowPass },
    Sample { data: Arc<[f32]>, position: usize },
}

/// One sounding layer: a source and its gain envelope. Lives on the render
/// thread once started.
#[derive(Debug, Clone)]
pub struct Voice {
    pub(crate) id: VoiceId,
    pub(crate) epoch: u64,
    source: Source,
    gain: Automation,
    start_at: f64,
    stop_at: Option<f64>,
    released: bool,
}

impl Voice {
    pub fn sine(frequency: Automation, gain: Automation, start_at: f64) -> Self {
        Self {
            id: 0,
            epoch: 0,
            source: Source::Sine { phase: 0.0, frequency },
            gain,
            start_at,
            stop_at: None,
            released: false,
        }
    }

    /// Pink noise through a low-pass filter.
    pub fn filtered_noise(seed: u64, cutoff_hz: f64, sample_rate: u32, gain: Automation, start_at: f64) -> Self {
        Self {
            id: 0,
            epoch: 0,
            source: Source::Noise {
                noise: PinkNoise::new(seed),
                filter: LowPass::new(cutoff_hz, sample_rate),
            },
            gain,
            start_at,
            stop_at: None,
            released: false,
        }
    }

    /// Plays `data` once at the output sample rate.
    pub fn sample(data: Arc<[f32]>, gain: Automation, start_at: f64) -> Self {
        Self {
            id: 0,
            epoch: 0,
            source: Source::Sample { data, position: 0 },
            gain,
            start_at,
            stop_at: None,
            released: false,
        }
    }

    pub fn stopping_at(mut self, at: f64) -> Self {
        self.stop_at = Some(at);
        self
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn start_at(&self) -> f64 {
        self.start_at
    }

    pub fn stop_at(&self) -> Option<f64> {
        self.stop_at
    }

    pub fn gain(&self) -> &Automation {
        &self.gain
    }

    pub fn gain_at(&self, t: f64) -> f32 {
        if t < self.start_at || self.is_finished(t) {
            0.0
        } else {
            self.gain.value_at(t)
        }
    }

    pub fn is_finished(&self, t: f64) -> bool {
        if self.stop_at.map(|s| t >= s).unwrap_or(false) {
            return true;
        }
        matches!(&self.source, Source::Sample { data, position } if *position >= data.len())
    }

    /// Ramps gain to `value` at `at`, starting from whatever it is at `from`.
    pub fn fade_to(&mut self, value: f32, from: f64, at: f64) {
        self.gain.cancel_and_hold(from);
        self.gain.linear_ramp_to(value, at.max(from));
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Cancels scheduled changes and ramps to silence over `fade` seconds.
    /// Only the first release takes effect.
    pub fn release(&mut self, now: f64, fade: f64) {
        if self.released {
            return;
        }
        self.released = true;
        let end = now + fade.max(0.0);
        self.fade_to(0.0, now, end);
        let stop = end + RELEASE_TAIL_SECS;
        self.stop_at = Some(self.stop_at.map(|s| s.min(stop)).unwrap_or(stop));
    }

    /// Renders one sample at time `t`; `dt` is the sample period.
    pub fn render(&mut self, t: f64, dt: f64) -> f32 {
        if t < self.start_at || self.is_finished(t) {
            return 0.0;
        }
        let gain = self.gain.value_at(t);

        let raw = match &mut self.source {
            Source::Sine { phase, frequency } => {
                let s = (*phase * TAU).sin() as f32;
                *phase = (*phase + frequency.value_at(t) as f64 * dt).fract();
                s
            }
            Source::Noise { noise, filter } => filter.process(noise.next_sample()),
            Source::Sample { data, position } => {
                let s = data.get(*position).copied().unwrap_or(0.0);
                *position += 1;
                s
            }
        };

        raw * gain
    }
}
