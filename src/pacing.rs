//! Pacing facilities for the conductor loop.
//!
//! The conductor drives simulation steps and frame paints on two
//! independent schedules. Each schedule is a [`RateLimiter`] comparing the
//! work completed so far against a wall-clock target; a [`Throughput`]
//! tracker produces the periodic performance line.
//!
//! Uses `std::time` for high-precision timing with no external
//! dependencies.

use std::time::{Duration, Instant};

/// Wall-clock budget for one kind of work (steps or frames).
///
/// A target of 0 means unlimited: the conductor runs the work as fast as
/// it can.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    /// Target completions per second (0 = unlimited).
    target: u32,
    /// Completions so far.
    done: u64,
}

impl RateLimiter {
    /// Create a limiter with the given per-second target.
    pub fn new(target: u32) -> Self {
        Self { target, done: 0 }
    }

    /// Current per-second target.
    #[inline]
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Completions recorded so far.
    #[inline]
    pub fn done(&self) -> u64 {
        self.done
    }

    /// Change the target. Returns `true` when the target actually changed,
    /// so the caller can resynchronize against the clock.
    pub fn set_target(&mut self, target: u32) -> bool {
        let changed = self.target != target;
        self.target = target;
        changed
    }

    /// Completions the schedule calls for after `elapsed` seconds.
    /// Unlimited targets call for endless work.
    pub fn needed(&self, elapsed: f64) -> u64 {
        if self.target == 0 {
            u64::MAX
        } else {
            (self.target as f64 * elapsed) as u64
        }
    }

    /// Whether the schedule calls for more work right now.
    pub fn is_behind(&self, elapsed: f64) -> bool {
        self.needed(elapsed) > self.done
    }

    /// Record one completion.
    pub fn record(&mut self) {
        self.done += 1;
    }

    /// Drop backlog beyond a single pending completion.
    ///
    /// When the conductor falls far behind (a debugger pause, a huge
    /// resize) it must not race through hundreds of make-up iterations;
    /// the schedule forgives everything but one step.
    pub fn catch_up(&mut self, needed: u64) {
        if needed != u64::MAX && self.done + 1 < needed {
            self.done = needed - 1;
        }
    }

    /// Re-anchor the completion count to the current schedule, used after
    /// a target change so old progress does not stall or flood the loop.
    pub fn resync(&mut self, elapsed: f64) {
        if self.target != 0 {
            self.done = self.needed(elapsed);
        }
    }
}

/// Windowed steps/frames throughput reporter.
#[derive(Debug)]
pub struct Throughput {
    /// When the current measurement window opened.
    window_start: Instant,
    /// Steps completed in the current window.
    steps: u64,
    /// Frames painted in the current window.
    frames: u64,
}

/// One throughput measurement over a closed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputReport {
    pub steps_per_sec: f32,
    pub frames_per_sec: f32,
}

impl Throughput {
    /// Open a tracker with an empty window starting now.
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            steps: 0,
            frames: 0,
        }
    }

    /// Record one completed simulation step.
    pub fn record_step(&mut self) {
        self.steps += 1;
    }

    /// Record one painted frame.
    pub fn record_frame(&mut self) {
        self.frames += 1;
    }

    /// Close the window and report if `interval` has elapsed; a zero
    /// interval disables reporting.
    pub fn poll(&mut self, interval: Duration) -> Option<ThroughputReport> {
        if interval.is_zero() {
            return None;
        }
        let elapsed = self.window_start.elapsed();
        if elapsed < interval {
            return None;
        }
        let secs = elapsed.as_secs_f32();
        let report = ThroughputReport {
            steps_per_sec: self.steps as f32 / secs,
            frames_per_sec: self.frames as f32 / secs,
        };
        self.window_start = Instant::now();
        self.steps = 0;
        self.frames = 0;
        Some(report)
    }
}

impl Default for Throughput {
    fn default() -> Self {
        Self::new()
    }
}
