//! # Tick Loop
//!
//! Fixed-timestep pacing for the simulation thread.
//!
//! ## Design
//!
//! The tick loop must:
//! - Run at a constant rate regardless of how long a tick takes
//! - Catch up after a slow tick, but never by more than a bounded amount
//! - Record how long ticks take and how many blew their budget

use std::time::{Duration, Instant};

/// Fixed-timestep tick loop controller.
pub struct TickLoop {
    /// Target tick duration.
    tick_duration: Duration,
    /// Largest backlog the accumulator may hold.
    max_backlog: Duration,
    /// Time of last accumulation.
    last_tick: Instant,
    /// Wall-clock time owed to the simulation.
    accumulator: Duration,
    /// Total ticks executed.
    tick_count: u64,
    /// Tick time statistics.
    stats: TickStats,
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Minimum tick duration observed.
    pub min_tick_us: u64,
    /// Maximum tick duration observed.
    pub max_tick_us: u64,
    /// Average tick duration (rolling).
    pub avg_tick_us: u64,
    /// Number of late ticks (took longer than budget).
    pub late_ticks: u64,
    /// Total ticks measured.
    pub total_ticks: u64,
    /// Wall-clock time discarded because the backlog exceeded its cap.
    pub skipped_us: u64,
}

impl TickStats {
    fn fresh(tick_duration: Duration) -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: micros(tick_duration),
            late_ticks: 0,
            total_ticks: 0,
            skipped_us: 0,
        }
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl TickLoop {
    /// Default catch-up limit.
    pub const DEFAULT_MAX_BACKLOG: Duration = Duration::from_millis(250);

    /// Highest supported tick rate, in Hz.
    pub const MAX_TICK_RATE: u32 = 10_000;

    /// Creates a new tick loop with the specified rate.
    ///
    /// The rate is clamped to `1..=MAX_TICK_RATE`.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.clamp(1, Self::MAX_TICK_RATE);
        let tick_duration = Duration::from_micros(1_000_000 / u64::from(tick_rate));

        Self {
            tick_duration,
            max_backlog: Self::DEFAULT_MAX_BACKLOG.max(tick_duration),
            last_tick: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            stats: TickStats::fresh(tick_duration),
        }
    }

    /// Caps how much wall-clock time the loop catches up on after a stall.
    ///
    /// Never lower than one tick.
    #[must_use]
    pub fn with_max_backlog(mut self, max_backlog: Duration) -> Self {
        self.max_backlog = max_backlog.max(self.tick_duration);
        self
    }

    /// Returns true if it's time to execute a tick.
    ///
    /// Call this in a loop until it returns false.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_tick);
        self.last_tick = now;

        if self.accumulator > self.max_backlog {
            let skipped = self.accumulator - self.max_backlog;
            self.stats.skipped_us += micros(skipped);
            tracing::warn!(
                skipped_ms = skipped.as_millis(),
                "simulation fell behind, dropping backlog"
            );
            self.accumulator = self.max_backlog;
        }

        self.accumulator >= self.tick_duration
    }

    /// Marks the start of a tick.
    ///
    /// Returns the tick start time for duration measurement.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        self.tick_count += 1;
        Instant::now()
    }

    /// Marks the end of a tick.
    ///
    /// Records statistics about tick duration.
    pub fn end_tick(&mut self, start: Instant) {
        let duration = start.elapsed();
        let duration_us = micros(duration);

        self.stats.total_ticks += 1;
        self.stats.min_tick_us = self.stats.min_tick_us.min(duration_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(duration_us);

        // Rolling average
        self.stats.avg_tick_us = (self.stats.avg_tick_us * 15 + duration_us) / 16;

        if duration > self.tick_duration {
            self.stats.late_ticks += 1;
            tracing::debug!(
                tick = self.tick_count,
                took_us = duration_us,
                budget_us = micros(self.tick_duration),
                "late tick"
            );
        }
    }

    /// Waits until the next tick is due.
    ///
    /// Sleeps for most of the wait and spins for the final stretch.
    pub fn wait_for_next_tick(&self) {
        let owed = self.accumulator + self.last_tick.elapsed();
        if owed >= self.tick_duration {
            return;
        }
        let remaining = self.tick_duration - owed;

        if remaining > Duration::from_micros(1000) {
            std::thread::sleep(remaining - Duration::from_micros(500));
        }

        let deadline = Instant::now() + remaining.min(Duration::from_micros(500));
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }

    /// Restarts wall-clock accounting from now, forgetting any backlog.
    pub fn reset_clock(&mut self) {
        self.last_tick = Instant::now();
        self.accumulator = Duration::ZERO;
    }

    /// Returns the current tick count.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Returns tick statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Returns the target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::fresh(self.tick_duration);
    }
}

impl Default for TickLoop {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_loop_creation() {
        let tick_loop = TickLoop::new(60);
        assert_eq!(tick_loop.tick_count(), 0);
        assert_eq!(tick_loop.tick_duration(), Duration::from_micros(16666));
    }

    #[test]
    fn test_tick_rate_is_clamped() {
        assert_eq!(TickLoop::new(0).tick_duration(), Duration::from_secs(1));
        assert_eq!(TickLoop::new(u32::MAX).tick_duration(), Duration::from_micros(100));
        assert!(!TickLoop::new(2_000_000).tick_duration().is_zero());
    }

    #[test]
    fn test_tick_execution() {
        let mut tick_loop = TickLoop::new(1000);

        std::thread::sleep(Duration::from_millis(5));
        assert!(tick_loop.should_tick());

        let start = tick_loop.begin_tick();
        tick_loop.end_tick(start);

        assert_eq!(tick_loop.tick_count(), 1);
        assert_eq!(tick_loop.stats().total_ticks, 1);
    }

    #[test]
    fn test_backlog_is_capped() {
        let mut tick_loop = TickLoop::new(1000).with_max_backlog(Duration::from_millis(3));

        std::thread::sleep(Duration::from_millis(20));
        let mut ticks = 0;
        while tick_loop.should_tick() {
            let start = tick_loop.begin_tick();
            tick_loop.end_tick(start);
            ticks += 1;
            if ticks > 100 {
                break;
            }
        }

        // 3ms of backlog at 1ms per tick, plus whatever accrued meanwhile.
        assert!(ticks >= 3);
        assert!(ticks < 20);
        assert!(tick_loop.stats().skipped_us > 0);
    }

    #[test]
    fn test_stats_reset() {
        let mut tick_loop = TickLoop::new(100);
        let start = tick_loop.begin_tick();
        tick_loop.end_tick(start);
        tick_loop.reset_stats();

        assert_eq!(tick_loop.stats().total_ticks, 0);
        assert_eq!(tick_loop.stats().min_tick_us, u64::MAX);
        assert_eq!(tick_loop.tick_count(), 1);
    }
}
