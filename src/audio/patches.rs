//! Timbres for the ambient bed and the per-phase tones.
//!
//! Times are absolute seconds on the synth clock. Every phase voice reaches
//! zero gain at or before its stop time.

use super::automation::Automation;
use super::voice::Voice;
use crate::config::AudioConfig;
use crate::kernel::technique::PhaseLabel;

/// Phase voices stop this long after the phase's nominal end.
pub const PHASE_TAIL_SECS: f64 = 0.1;

/// Gain envelope: silent at `now`, then linear ramps through `(offset, gain)`
/// pairs.
fn envelope(now: f64, steps: &[(f64, f32)]) -> Automation {
    let mut a = Automation::new(0.0);
    a.set_value_at(0.0, now);
    for &(offset, gain) in steps {
        a.linear_ramp_to(gain, now + offset);
    }
    a
}

fn sweep(now: f64, from: f32, to: f32, over: f64) -> Automation {
    let mut a = Automation::new(from);
    a.set_value_at(from, now).linear_ramp_to(to, now + over);
    a
}

pub fn drone(config: &AudioConfig, now: f64) -> Vec<Voice> {
    [config.drone_hz, config.drone_hz + config.drone_detune_hz]
        .into_iter()
        .map(|hz| {
            Voice::sine(
                Automation::constant(hz as f32, now),
                envelope(now, &[(config.drone_ramp_secs, config.drone_gain)]),
                now,
            )
        })
        .collect()
}

pub fn noise(config: &AudioConfig, seed: u64, sample_rate: u32, now: f64) -> Voice {
    Voice::filtered_noise(
        seed,
        config.noise_cutoff_hz,
        sample_rate,
        envelope(now, &[(config.noise_ramp_secs, config.noise_gain)]),
        now,
    )
}

/// Tones for one phase lasting `dur` seconds.
pub fn phase(label: PhaseLabel, now: f64, dur: f64) -> Vec<Voice> {
    let stop = now + dur + PHASE_TAIL_SECS;
    let voices = match label {
        PhaseLabel::Inhale => inhale(now, dur),
        PhaseLabel::Exhale => exhale(now, dur),
        PhaseLabel::Hold => hold(now, dur),
    };
    voices.into_iter().map(|v| v.stopping_at(stop)).collect()
}

// Rising fifth with an octave partial.
fn inhale(now: f64, dur: f64) -> Vec<Voice> {
    let attack = 0.4f64.min(dur * 0.2);
    let octave_attack = 0.5f64.min(dur * 0.25);
    vec![
        Voice::sine(
            sweep(now, 164.8, 246.9, dur * 0.85),
            envelope(now, &[(attack, 0.055), (dur * 0.8, 0.030), (dur, 0.0)]),
            now,
        ),
        Voice::sine(
            sweep(now, 329.6, 493.8, dur * 0.85),
            envelope(now, &[(octave_attack, 0.020), (dur * 0.9, 0.0)]),
            now,
        ),
    ]
}

// Falling sweep over a static fifth.
fn exhale(now: f64, dur: f64) -> Vec<Voice> {
    let attack = 0.25f64.min(dur * 0.2);
    let fifth_attack = 0.3f64.min(dur * 0.25);
    vec![
        Voice::sine(
            sweep(now, 246.9, 164.8, dur * 0.9),
            envelope(now, &[(attack, 0.052), (dur * 0.6, 0.025), (dur, 0.0)]),
            now,
        ),
        Voice::sine(
            Automation::constant(369.9, now),
            envelope(now, &[(fifth_attack, 0.016), (dur * 0.75, 0.0)]),
            now,
        ),
    ]
}

// Steady tone plus a quiet shimmer a fifth above.
fn hold(now: f64, dur: f64) -> Vec<Voice> {
    let attack = 0.5f64.min(dur * 0.25);
    let sustain_end = (dur - 0.6).max(attack);
    let shimmer_attack = 0.8f64.min(dur * 0.4);
    let shimmer_end = (dur - 0.5).max(shimmer_attack);
    vec![
        Voice::sine(
            Automation::constant(196.0, now),
            envelope(now, &[(attack, 0.038), (sustain_end, 0.038), (dur, 0.0)]),
            now,
        ),
        Voice::sine(
            Automation::constant(293.7, now),
            envelope(now, &[(shimmer_attack, 0.012), (shimmer_end, 0.0)]),
            now,
        ),
    ]
}
