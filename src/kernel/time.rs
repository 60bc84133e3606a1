use tokio::time::{interval, Duration, Instant, Interval, MissedTickBehavior};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick {
    pub frame: u64,
}

/// Display-refresh cadence (~60 Hz).
pub const TICK_MS: u64 = 16;

/// Longest span accepted from config or the command line (one week).
pub const MAX_CONFIG_SECS: f64 = 7.0 * 24.0 * 3600.0;

/// `None` for negative, non-finite or out-of-range seconds.
pub fn bounded_secs(secs: f64) -> Option<Duration> {
    if secs > MAX_CONFIG_SECS {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// A configured span, or `default` when the value is unusable.
pub fn config_secs(name: &str, secs: f64, default: f64) -> Duration {
    bounded_secs(secs).unwrap_or_else(|| {
        warn!("{} = {} is out of range, using {}s", name, secs, default);
        Duration::from_secs_f64(default)
    })
}

impl Tick {
    pub fn new() -> Self {
        Tick { frame: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { frame: self.frame + 1 }
    }
}

/// Monotonic time source for the session kernel.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Tokio's monotonic clock. Honors `tokio::time::pause` in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Repeating high-frequency callback source.
///
/// Late ticks are skipped rather than bursted, so a stalled loop resumes at
/// the normal cadence instead of replaying every missed frame.
pub struct Ticker<C: Clock = TokioClock> {
    cadence: Interval,
    clock: C,
    tick: Tick,
}

impl Ticker<TokioClock> {
    pub fn new(period_ms: u64) -> Self {
        Self::with_clock(period_ms, TokioClock)
    }
}

impl<C: Clock> Ticker<C> {
    pub fn with_clock(period_ms: u64, clock: C) -> Self {
        let mut cadence = interval(Duration::from_millis(period_ms.max(1)));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            cadence,
            clock,
            tick: Tick::new(),
        }
    }

    /// Waits for the next frame boundary. Never blocks the thread.
    pub async fn next(&mut self) -> (Tick, Instant) {
        self.cadence.tick().await;
        self.tick = self.tick.next();
        (self.tick, self.clock.now())
    }

    pub fn current(&self) -> Tick {
        self.tick
    }
}
