//! Cooldown timers derived from a start timestamp and a duration.

use std::time::Duration;

use crate::time::Timestamp;

/// A cooldown that starts when triggered and is ready once `duration` passed.
///
/// A cooldown that was never triggered is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    started: Option<Timestamp>,
    duration: Duration,
}

impl Cooldown {
    pub fn new(duration: Duration) -> Self {
        Self {
            started: None,
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    pub fn started(&self) -> Option<Timestamp> {
        self.started
    }

    /// Fraction of the cooldown elapsed, clamped to `[0, 1]`.
    pub fn progress(&self, now: Timestamp) -> f32 {
        progress_between(self.started, self.duration, now)
    }

    pub fn is_ready(&self, now: Timestamp) -> bool {
        self.progress(now) >= 1.0
    }

    /// Time left until ready.
    pub fn remaining(&self, now: Timestamp) -> Duration {
        match self.started {
            Some(at) => self.duration.saturating_sub(now.duration_since(at)),
            None => Duration::ZERO,
        }
    }

    pub fn trigger(&mut self, now: Timestamp) {
        self.started = Some(now);
    }

    pub fn reset(&mut self) {
        self.started = None;
    }
}

/// `clamp((now - start) / duration, 0, 1)`, treating a missing start or a
/// zero duration as complete.
pub fn progress_between(start: Option<Timestamp>, duration: Duration, now: Timestamp) -> f32 {
    let Some(start) = start else {
        return 1.0;
    };
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.duration_since(start).as_secs_f64();
    (elapsed / duration.as_secs_f64()).clamp(0.0, 1.0) as f32
}
