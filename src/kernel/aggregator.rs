use serde::Serialize;
use tokio::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

use super::phase::StoppedSession;
use super::technique::Technique;
use super::time::config_secs;
use crate::config::SessionConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub technique_id: String,
    pub technique_name: String,
    pub cycles_completed: u32,
    pub elapsed_seconds: f64,
    pub lifetime_session_count: u64,
}

impl SessionSummary {
    /// `m:ss`
    pub fn formatted_elapsed(&self) -> String {
        let secs = self.elapsed_seconds.max(0.0).floor() as u64;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Milestone {
    pub session_count: u64,
    pub raised_at: Instant,
    pub dismiss_at: Instant,
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub summary: SessionSummary,
    pub milestone: Option<Milestone>,
}

/// Owns the lifetime session counter. One instance per running application.
#[derive(Debug)]
pub struct SessionAggregator {
    lifetime_sessions: u64,
    min_elapsed_secs: f64,
    milestone_every: u64,
    milestone_display: Duration,
    milestone: Option<Milestone>,
}

impl SessionAggregator {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            lifetime_sessions: 0,
            min_elapsed_secs: config.min_summary_secs,
            milestone_every: config.milestone_every.max(1),
            milestone_display: config_secs(
                "session.milestone_display_secs",
                config.milestone_display_secs,
                SessionConfig::default().milestone_display_secs,
            ),
            milestone: None,
        }
    }

    pub fn lifetime_sessions(&self) -> u64 {
        self.lifetime_sessions
    }

    /// Counts the session if it ran past the threshold. Short sessions leave
    /// the counter untouched and produce no summary.
    pub fn record(
        &mut self,
        session_id: Uuid,
        technique: &Technique,
        stopped: StoppedSession,
        now: Instant,
    ) -> Option<SessionOutcome> {
        if stopped.elapsed_seconds <= self.min_elapsed_secs {
            info!(
                "Session too short to count ({:.1}s <= {:.1}s)",
                stopped.elapsed_seconds, self.min_elapsed_secs
            );
            return None;
        }

        self.lifetime_sessions += 1;
        let count = self.lifetime_sessions;

        let milestone = if count % self.milestone_every == 0 {
            let m = Milestone {
                session_count: count,
                raised_at: now,
                dismiss_at: now + self.milestone_display,
            };
            info!("Milestone reached: {} sessions", count);
            self.milestone = Some(m);
            Some(m)
        } else {
            None
        };

        Some(SessionOutcome {
            summary: SessionSummary {
                session_id,
                technique_id: technique.id().to_string(),
                technique_name: technique.display_name().to_string(),
                cycles_completed: stopped.cycles_completed,
                elapsed_seconds: stopped.elapsed_seconds,
                lifetime_session_count: count,
            },
            milestone,
        })
    }

    pub fn milestone(&self) -> Option<&Milestone> {
        self.milestone.as_ref()
    }

    /// Clears an expired milestone. Returns true once, on the tick it expires.
    pub fn expire_milestone(&mut self, now: Instant) -> bool {
        match self.milestone {
            Some(m) if now >= m.dismiss_at => {
                self.milestone = None;
                true
            }
            _ => false,
        }
    }
}
