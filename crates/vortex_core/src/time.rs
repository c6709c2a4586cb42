//! Frame clock
//!
//! Variable-step timing: each frame advances the simulation by the wall-clock
//! time since the previous one, clamped so a stall (window drag, breakpoint)
//! does not fling every entity across the world.

use std::time::{Duration, Instant};

/// Largest step handed to the simulation in one frame.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

pub struct FrameClock {
    last: Instant,
    frame_count: u64,
    total: Duration,
    max_delta: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_max_delta(MAX_FRAME_DELTA)
    }

    pub fn with_max_delta(max_delta: Duration) -> Self {
        Self {
            last: Instant::now(),
            frame_count: 0,
            total: Duration::ZERO,
            max_delta,
        }
    }

    /// Start a new frame and return its step in seconds.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let delta = now.saturating_duration_since(self.last).min(self.max_delta);
        self.last = now;
        self.frame_count += 1;
        self.total += delta;
        delta.as_secs_f32()
    }

    /// Forget time spent while not ticking (paused, minimized).
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Simulated time so far, the sum of clamped steps.
    pub fn total_time(&self) -> Duration {
        self.total
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
