//! Simulation time for the game loop.
//!
//! Every manager reads time through [`Timestamp`] values handed to it by the
//! caller, never from the wall clock, so a whole session can be replayed by
//! feeding the same sequence of `advance` calls.

use std::ops::{Add, AddAssign};
use std::time::Duration;

/// A point on the simulation timeline, measured from session start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub fn from_secs_f32(secs: f32) -> Self {
        Self(Duration::from_secs_f32(secs.max(0.0)))
    }

    /// Time since session start.
    pub fn since_start(&self) -> Duration {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0.as_millis() as u64
    }

    /// Time elapsed since `earlier`. Zero if `earlier` is in the future.
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs)
    }
}

impl AddAssign<Duration> for Timestamp {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs;
    }
}

/// Manages frame timing and delta time calculation.
#[derive(Debug)]
pub struct Time {
    /// Current simulation time.
    now: Timestamp,
    /// Duration of the last frame.
    delta: Duration,
    /// Frame count since start.
    frame_count: u64,
    /// Fixed timestep for the game loop (default 60 Hz).
    fixed_timestep: Duration,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a clock at session start.
    pub fn new() -> Self {
        Self {
            now: Timestamp::ZERO,
            delta: Duration::ZERO,
            frame_count: 0,
            fixed_timestep: Duration::from_secs_f64(1.0 / 60.0),
        }
    }

    /// Advance the simulation by an explicit step.
    pub fn advance(&mut self, dt: Duration) {
        self.delta = dt;
        self.now += dt;
        self.frame_count += 1;
    }

    /// Current simulation time.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get the delta time as a Duration.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.now.since_start().as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the fixed timestep.
    pub fn fixed_timestep(&self) -> Duration {
        self.fixed_timestep
    }

    /// Set the fixed timestep rate in Hz. Non-positive rates are ignored.
    pub fn set_fixed_rate(&mut self, hz: f64) {
        if hz > 0.0 {
            self.fixed_timestep = Duration::from_secs_f64(1.0 / hz);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_now_and_counts_frames() {
        let mut time = Time::new();
        time.advance(Duration::from_millis(16));
        time.advance(Duration::from_millis(16));
        assert_eq!(time.now(), Timestamp::from_millis(32));
        assert_eq!(time.frame_count(), 2);
        assert_eq!(time.delta(), Duration::from_millis(16));
    }

    #[test]
    fn duration_since_saturates() {
        let early = Timestamp::from_millis(100);
        let late = Timestamp::from_millis(250);
        assert_eq!(late.duration_since(early), Duration::from_millis(150));
        assert_eq!(early.duration_since(late), Duration::ZERO);
    }

    #[test]
    fn fixed_rate_sets_step_without_moving_the_clock() {
        let mut time = Time::new();
        time.set_fixed_rate(10.0);
        assert_eq!(time.fixed_timestep(), Duration::from_millis(100));
        time.set_fixed_rate(0.0);
        assert_eq!(time.fixed_timestep(), Duration::from_millis(100));

        let step = time.fixed_timestep();
        time.advance(step);
        time.advance(step);
        assert_eq!(time.now(), Timestamp::from_millis(200));
        assert_eq!(time.frame_count(), 2);
    }
}
