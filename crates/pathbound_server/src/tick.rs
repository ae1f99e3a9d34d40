//! # Tick Timing
//!
//! Bookkeeping for the fixed-rate room loop.
//!
//! ## Design
//!
//! The room task is woken by a tokio interval; this module does not sleep.
//! It turns wake-ups into simulation deltas and records how long each tick
//! took:
//! - `dt` is the wall-clock time since the previous tick started
//! - The first tick uses the nominal tick duration
//! - A tick that takes longer than its budget counts as late

use std::time::Duration;

use tokio::time::Instant;

use pathbound_shared::constants::TICK_DURATION_MS;

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
}

impl Default for TickStats {
    fn default() -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: 0,
            late_ticks: 0,
            total_ticks: 0,
        }
    }
}

impl TickStats {
    /// Fraction of measured ticks that ran over budget.
    #[must_use]
    pub fn late_ratio(&self) -> f64 {
        self.late_ticks as f64 / self.total_ticks.max(1) as f64
    }

    fn record(&mut self, duration_us: u64, budget_us: u64) {
        self.min_tick_us = self.min_tick_us.min(duration_us);
        self.max_tick_us = self.max_tick_us.max(duration_us);
        self.avg_tick_us = if self.total_ticks == 0 {
            duration_us
        } else {
            (self.avg_tick_us * 15 + duration_us) / 16
        };
        self.total_ticks += 1;
        if duration_us > budget_us {
            self.late_ticks += 1;
        }
    }
}

/// Fixed-rate tick controller.
#[derive(Clone, Debug)]
pub struct TickTimer {
    /// Target tick duration.
    tick_duration: Duration,
    /// Start of the previous tick.
    last_tick: Option<Instant>,
    /// Total ticks started.
    tick_count: u64,
    /// Frame time statistics.
    stats: TickStats,
}

impl TickTimer {
    /// Creates a timer with the given target tick duration.
    #[must_use]
    pub fn new(tick_duration: Duration) -> Self {
        Self {
            tick_duration,
            last_tick: None,
            tick_count: 0,
            stats: TickStats::default(),
        }
    }

    /// Creates a timer at the arena tick rate (20Hz).
    #[must_use]
    pub fn arena() -> Self {
        Self::new(Duration::from_millis(TICK_DURATION_MS))
    }

    /// Marks the start of a tick at `now`.
    ///
    /// Returns the simulation delta in seconds, never negative.
    pub fn begin_tick(&mut self, now: Instant) -> f32 {
        let dt = match self.last_tick {
            Some(last) => now.saturating_duration_since(last),
            None => self.tick_duration,
        };
        self.last_tick = Some(now);
        self.tick_count += 1;
        dt.as_secs_f32()
    }

    /// Marks the end of a tick that started at `started`.
    pub fn end_tick(&mut self, started: Instant, finished: Instant) {
        let duration_us = finished.saturating_duration_since(started).as_micros() as u64;
        self.stats.record(duration_us, self.tick_duration.as_micros() as u64);
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
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::arena()
    }
}
