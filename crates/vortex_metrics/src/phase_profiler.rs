//! Rolling per-phase timings

use super::ring_buffer::RingBuffer;
use super::Phase;
use std::fmt::Write;
use std::time::{Duration, Instant};

pub struct PhaseProfiler {
    phases: [RingBuffer<Duration>; 5],
}

impl PhaseProfiler {
    pub fn new(capacity: usize) -> Self {
        Self {
            phases: std::array::from_fn(|_| RingBuffer::new(capacity)),
        }
    }

    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        self.phases[phase.index()].push(elapsed);
    }

    pub fn time<F, R>(&mut self, phase: Phase, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(phase, start.elapsed());
        result
    }

    pub fn average(&self, phase: Phase) -> Duration {
        self.phases[phase.index()].average()
    }

    pub fn average_ms(&self, phase: Phase) -> f64 {
        self.average(phase).as_secs_f64() * 1000.0
    }

    /// Fraction of the summed phase averages spent in `phase`.
    pub fn share(&self, phase: Phase) -> f64 {
        let total: f64 = Phase::ALL.iter().map(|p| self.average(*p).as_secs_f64()).sum();
        if total > 0.0 {
            self.average(phase).as_secs_f64() / total
        } else {
            0.0
        }
    }

    /// One line, e.g. `idle 1.20ms (40%) physics 0.90ms (30%) ...`.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for phase in Phase::ALL {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(
                out,
                "{} {:.2}ms ({:.0}%)",
                phase.name(),
                self.average_ms(phase),
                self.share(phase) * 100.0
            );
        }
        out
    }
}

impl Default for PhaseProfiler {
    fn default() -> Self {
        Self::new(120)
    }
}
