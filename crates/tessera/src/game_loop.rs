//! # TESSERA Game Loop
//!
//! ```text
//! Tick N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. LOGIC                                                            │
//! │    ├─ Prune dropped event subscriptions                             │
//! │    ├─ Advance the tick clock by the fixed delta                     │
//! │    └─ Run systems in priority order                                 │
//! │                                                                     │
//! │ 2. CAPTURE                                                          │
//! │    └─ Deep-copy the presentation snapshot                           │
//! │                                                                     │
//! │ 3. PUBLISH                                                          │
//! │    └─ Swap the snapshot into the slot (brief lock)                  │
//! │                                                                     │
//! │ 4. WAIT                                                             │
//! │    └─ Sleep until the next tick is due                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Presentation runs on its own thread against a [`SnapshotReader`] and
//! never touches the world.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tessera_core::{OccupancySnapshot, Snapshot, SnapshotReader, SnapshotSlot, World};

use crate::config::RuntimeConfig;
use crate::tick::TickLoop;

/// Timing of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Tick number.
    pub tick: u64,
    /// Systems and event dispatch, in microseconds.
    pub logic_us: u64,
    /// Snapshot capture and publish, in microseconds.
    pub capture_us: u64,
    /// Whole tick, in microseconds.
    pub total_us: u64,
    /// Snapshot generation published by this tick.
    pub generation: u64,
}

/// Owns the world and drives it at a fixed rate.
pub struct GameLoop<S: Snapshot = OccupancySnapshot> {
    world: World,
    ticker: TickLoop,
    snapshots: Arc<SnapshotSlot<S>>,
    stats: FrameStatsAccumulator,
}

impl<S: Snapshot> GameLoop<S> {
    /// Creates a loop around a fresh world built from `config`.
    #[must_use]
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::with_world(World::from_config(&config.core), config)
    }

    /// Creates a loop around an existing world.
    #[must_use]
    pub fn with_world(world: World, config: &RuntimeConfig) -> Self {
        let ticker = TickLoop::new(config.tick_rate_hz).with_max_backlog(config.max_frame_delta());
        let budget_us = micros(ticker.tick_duration());
        Self {
            world,
            ticker,
            snapshots: Arc::new(SnapshotSlot::new()),
            stats: FrameStatsAccumulator::new(budget_us),
        }
    }

    /// The simulation world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The simulation world, for setup between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Slot the loop publishes into.
    #[must_use]
    pub fn snapshots(&self) -> &Arc<SnapshotSlot<S>> {
        &self.snapshots
    }

    /// Reader for the presentation thread.
    #[must_use]
    pub fn reader(&self) -> SnapshotReader<S> {
        self.snapshots.reader()
    }

    /// Runs exactly one tick with the fixed delta and publishes a snapshot.
    pub fn step(&mut self) -> FrameStats {
        let start = self.ticker.begin_tick();

        self.world.run_tick(self.ticker.tick_duration());
        let logic_done = Instant::now();

        let generation = self.snapshots.capture_from(&self.world);
        self.ticker.end_tick(start);

        let stats = FrameStats {
            tick: self.world.tick_count(),
            logic_us: micros(logic_done - start),
            capture_us: micros(logic_done.elapsed()),
            total_us: micros(start.elapsed()),
            generation,
        };
        self.stats.record(stats);
        stats
    }

    /// Runs `ticks` ticks back to back, without pacing.
    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Runs in real time until `shutdown` is set.
    ///
    /// The flag is checked between ticks, so a system may set it to end the
    /// run after the current tick. Returns the number of ticks run.
    pub fn run(&mut self, shutdown: &AtomicBool) -> u64 {
        let first = self.ticker.tick_count();
        tracing::info!(
            tick_us = micros(self.ticker.tick_duration()),
            "simulation loop started"
        );

        self.ticker.reset_clock();
        'outer: while !shutdown.load(Ordering::Acquire) {
            while self.ticker.should_tick() {
                self.step();
                if shutdown.load(Ordering::Acquire) {
                    break 'outer;
                }
            }
            self.ticker.wait_for_next_tick();
        }

        let ran = self.ticker.tick_count() - first;
        let ticks = self.ticker.stats();
        tracing::info!(
            ticks = ran,
            late = ticks.late_ticks,
            max_tick_us = ticks.max_tick_us,
            "simulation loop stopped"
        );
        ran
    }

    /// Pacing controller.
    #[must_use]
    pub fn ticker(&self) -> &TickLoop {
        &self.ticker
    }

    /// Accumulated frame statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }
}

fn micros(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Tick budget in microseconds.
    pub budget_us: u64,
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of logic times.
    pub logic_us_sum: u64,
    /// Sum of capture times.
    pub capture_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded budget.
    pub frames_over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator for a tick budget of `budget_us`.
    #[must_use]
    pub fn new(budget_us: u64) -> Self {
        Self {
            budget_us,
            frames_recorded: 0,
            total_us_sum: 0,
            logic_us_sum: 0,
            capture_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.logic_us_sum += stats.logic_us;
        self.capture_us_sum += stats.capture_us;
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);

        if stats.total_us > self.budget_us {
            self.frames_over_budget += 1;
        }
    }

    /// Returns average frame time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Returns the share of frames over budget.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Logs a summary at info level.
    pub fn log_summary(&self) {
        if self.frames_recorded == 0 {
            tracing::info!("no frames recorded");
            return;
        }
        tracing::info!(
            frames = self.frames_recorded,
            avg_ms = self.avg_frame_ms(),
            min_us = self.min_frame_us,
            max_us = self.max_frame_us,
            over_budget = self.frames_over_budget,
            "frame statistics"
        );
    }
}
