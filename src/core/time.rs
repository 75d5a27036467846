//! Frame clock for the fixed-step simulation loop

use std::time::Duration;

/// Tracks simulated time as frames are stepped.
///
/// Time only moves when [`Time::advance`] is called, which keeps the
/// simulation deterministic and testable.
#[derive(Debug, Clone, Default)]
pub struct Time {
    /// Total simulated time
    elapsed: Duration,
    /// Duration of the last frame
    delta: Duration,
    /// Number of frames stepped
    frame: u64,
}

impl Time {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Step the clock by one frame
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed = self.elapsed.saturating_add(delta);
        self.frame += 1;
    }

    /// Duration of the last frame
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Duration of the last frame in seconds
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Total simulated time
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Total simulated time in seconds
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Number of frames stepped so far
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Convert a delay in seconds into a `Duration`.
///
/// Negatives and NaN become zero; delays too long to represent saturate.
pub fn seconds(delay: f32) -> Duration {
    if delay > 0.0 {
        Duration::try_from_secs_f32(delay).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
