use tracing::debug;

use super::technique::PhaseLabel;

/// Vibration pattern in milliseconds, alternating on/off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HapticPattern(pub &'static [u32]);

impl HapticPattern {
    pub const SESSION_START: HapticPattern = HapticPattern(&[30, 50, 30]);
    pub const SHORT: HapticPattern = HapticPattern(&[40]);
    pub const MEDIUM: HapticPattern = HapticPattern(&[20, 60, 20]);
    pub const LONG: HapticPattern = HapticPattern(&[60]);

    pub fn for_phase(label: PhaseLabel) -> Self {
        match label {
            PhaseLabel::Inhale => Self::SHORT,
            PhaseLabel::Hold => Self::MEDIUM,
            PhaseLabel::Exhale => Self::LONG,
        }
    }
}

/// Best-effort vibration output. Implementations must not block and must
/// swallow their own failures.
pub trait HapticSink: Send {
    fn pulse(&mut self, pattern: HapticPattern);
}

/// For hosts without a vibration motor.
#[derive(Debug, Default)]
pub struct NoHaptics;

impl HapticSink for NoHaptics {
    fn pulse(&mut self, _pattern: HapticPattern) {}
}

/// Writes patterns to the log instead of a motor.
#[derive(Debug, Default)]
pub struct LogHaptics;

impl HapticSink for LogHaptics {
    fn pulse(&mut self, pattern: HapticPattern) {
        debug!("Haptic pulse {:?}", pattern.0);
    }
}
