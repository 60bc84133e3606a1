use tokio::time::{Duration, Instant};
use tracing::debug;

use super::technique::{Direction, Phase, Technique};

const ORB_MIN: f64 = 0.55;
const ORB_MAX: f64 = 1.0;

/// Timing state of one running session. Only `PhaseMachine::tick` mutates it.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    pub phase_index: usize,
    pub phase_started_at: Instant,
    pub session_started_at: Instant,
    pub cycles_completed: u32,
    pub elapsed_seconds: f64,
    pub active: bool,
}

impl SessionClock {
    fn started(now: Instant) -> Self {
        Self {
            phase_index: 0,
            phase_started_at: now,
            session_started_at: now,
            cycles_completed: 0,
            elapsed_seconds: 0.0,
            active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseEvent {
    /// `overdue` is set while catching up after a stalled loop: the new phase
    /// had already ended by the time it was entered.
    PhaseChanged { index: usize, phase: Phase, overdue: bool },
    /// `overdue` matches the wrap's `PhaseChanged`.
    CycleCompleted { cycles: u32, overdue: bool },
}

/// Read-only view for display layers.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseFrame {
    pub index: usize,
    pub phase: Phase,
    pub progress: f64,
    pub seconds_remaining: u32,
    pub orb_scale: f64,
    pub cycles_completed: u32,
    pub elapsed_seconds: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoppedSession {
    pub cycles_completed: u32,
    pub elapsed_seconds: f64,
}

pub struct PhaseMachine {
    technique: Technique,
    clock: Option<SessionClock>,
    progress: f64,
    hold_scale: f64,
}

impl PhaseMachine {
    pub fn new(technique: Technique) -> Self {
        Self {
            technique,
            clock: None,
            progress: 0.0,
            hold_scale: ORB_MIN,
        }
    }

    pub fn technique(&self) -> &Technique {
        &self.technique
    }

    pub fn is_active(&self) -> bool {
        self.clock.map(|c| c.active).unwrap_or(false)
    }

    pub fn clock(&self) -> Option<&SessionClock> {
        self.clock.as_ref()
    }

    /// Only valid while inactive; callers stop first.
    pub fn set_technique(&mut self, technique: Technique) {
        debug_assert!(!self.is_active());
        self.technique = technique;
        self.clock = None;
        self.progress = 0.0;
    }

    pub fn start(&mut self, now: Instant) {
        self.clock = Some(SessionClock::started(now));
        self.progress = 0.0;
        self.hold_scale = ORB_MIN;
        debug!("Phase machine started: {}", self.technique.id());
    }

    /// Advances at most one phase per call. A stalled loop catches up one
    /// phase per subsequent tick; phases are never skipped.
    pub fn tick(&mut self, now: Instant) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        let Some(clock) = self.clock.as_mut() else {
            return events;
        };
        if !clock.active {
            return events;
        }

        let since_start = now.saturating_duration_since(clock.session_started_at).as_secs_f64();
        clock.elapsed_seconds = clock.elapsed_seconds.max(since_start);

        let phase = *self.technique.phase(clock.phase_index);
        let in_phase = now.saturating_duration_since(clock.phase_started_at).as_secs_f64();
        let progress = (in_phase / phase.duration_seconds).clamp(0.0, 1.0);

        if progress < 1.0 {
            // Monotonic within a phase even if the clock steps backwards.
            self.progress = self.progress.max(progress);
            return events;
        }

        match phase.direction {
            Direction::Expand => self.hold_scale = ORB_MAX,
            Direction::Shrink => self.hold_scale = ORB_MIN,
            Direction::Hold => {}
        }

        let len = self.technique.phases().len();
        let next = (clock.phase_index + 1) % len;
        // Anchor to the scheduled boundary, not to `now`, so tick jitter
        // never accumulates into drift.
        clock.phase_started_at += Duration::from_secs_f64(phase.duration_seconds);
        clock.phase_index = next;
        self.progress = 0.0;

        let next_phase = *self.technique.phase(next);
        let lag = now.saturating_duration_since(clock.phase_started_at).as_secs_f64();
        let overdue = lag >= next_phase.duration_seconds;
        events.push(PhaseEvent::PhaseChanged {
            index: next,
            phase: next_phase,
            overdue,
        });

        if next == 0 {
            clock.cycles_completed += 1;
            events.push(PhaseEvent::CycleCompleted {
                cycles: clock.cycles_completed,
                overdue,
            });
        }

        events
    }

    /// Freezes elapsed time and deactivates. Returns `None` when not running.
    pub fn stop(&mut self, now: Instant) -> Option<StoppedSession> {
        let clock = self.clock.as_mut()?;
        if !clock.active {
            return None;
        }
        let since_start = now.saturating_duration_since(clock.session_started_at).as_secs_f64();
        clock.elapsed_seconds = clock.elapsed_seconds.max(since_start);
        clock.active = false;

        let stopped = StoppedSession {
            cycles_completed: clock.cycles_completed,
            elapsed_seconds: clock.elapsed_seconds,
        };
        self.clock = None;
        self.progress = 0.0;
        Some(stopped)
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn frame(&self) -> PhaseFrame {
        let (index, cycles, elapsed, active) = match &self.clock {
            Some(c) => (c.phase_index, c.cycles_completed, c.elapsed_seconds, c.active),
            None => (0, 0, 0.0, false),
        };
        let phase = *self.technique.phase(index);
        let progress = self.progress;

        let orb_scale = if !active {
            ORB_MIN
        } else {
            match phase.direction {
                Direction::Expand => ORB_MIN + (ORB_MAX - ORB_MIN) * progress,
                Direction::Shrink => ORB_MAX - (ORB_MAX - ORB_MIN) * progress,
                Direction::Hold => self.hold_scale,
            }
        };

        PhaseFrame {
            index,
            phase,
            progress,
            seconds_remaining: (phase.duration_seconds * (1.0 - progress)).ceil() as u32,
            orb_scale,
            cycles_completed: cycles,
            elapsed_seconds: elapsed,
            active,
        }
    }
}
