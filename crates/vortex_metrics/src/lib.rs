//! Vortex Metrics - frame and phase timing
//!
//! Collection compiles away unless the `metrics` feature is on: the types
//! below keep their API but every call is a no-op.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use vortex_metrics::{FrameTimer, Phase, PhaseProfiler};
//!
//! let mut timer = FrameTimer::new(120);
//! let mut phases = PhaseProfiler::new(120);
//! timer.begin();
//! phases.record(Phase::Physics, physics_time);
//! timer.end();
//! println!("{:.1} fps, physics {:.2} ms", timer.fps(), phases.average_ms(Phase::Physics));
//! ```

#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod phase_profiler;
#[cfg(feature = "metrics")]
mod ring_buffer;

#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use phase_profiler::PhaseProfiler;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;

/// The stages a frame's wall time is split into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting on the compositor / vsync.
    Idle,
    Physics,
    Encode,
    Upload,
    Render,
}

impl Phase {
    pub const ALL: [Phase; 5] = [Phase::Idle, Phase::Physics, Phase::Encode, Phase::Upload, Phase::Render];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Physics => "physics",
            Phase::Encode => "encode",
            Phase::Upload => "upload",
            Phase::Render => "render",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn record(&mut self, _frame_time: std::time::Duration) {}
    pub fn frames(&self) -> u64 { 0 }
    pub fn fps(&self) -> f64 { 0.0 }
    pub fn frame_time_ms(&self) -> f64 { 0.0 }
    pub fn frame_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
}

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _value: T) {}
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
    pub fn average(&self) -> T where T: Default { T::default() }
}

#[cfg(not(feature = "metrics"))]
pub struct PhaseProfiler;

#[cfg(not(feature = "metrics"))]
impl PhaseProfiler {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn record(&mut self, _phase: Phase, _elapsed: std::time::Duration) {}
    pub fn time<F, R>(&mut self, _phase: Phase, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn average(&self, _phase: Phase) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn average_ms(&self, _phase: Phase) -> f64 { 0.0 }
    pub fn share(&self, _phase: Phase) -> f64 { 0.0 }
    pub fn summary(&self) -> String { String::new() }
}

#[cfg(test)]
mod tests {
    use super::Phase;

    #[test]
    fn test_compiles_without_metrics() {
        let mut _timer = super::FrameTimer::new(60);
        let mut _buffer = super::RingBuffer::<f64>::new(10);
        let mut _profiler = super::PhaseProfiler::new(60);
    }

    #[test]
    fn phase_indices_follow_declaration_order() {
        for (i, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
        assert_eq!(Phase::Upload.name(), "upload");
    }
}
