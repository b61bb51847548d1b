//! Common state components shared by the gameplay managers.

use std::time::Duration;

use crate::time::Timestamp;

/// Health component for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.current = (self.current - amount.max(0.0)).max(0.0);
    }

    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount.max(0.0)).min(self.max);
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn percentage(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// A regenerating resource such as stamina.
///
/// `0 <= current <= max` holds after every operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourcePool {
    pub current: f32,
    pub max: f32,
    /// Units restored per second once regeneration is allowed.
    pub regen_rate: f32,
    /// Quiet period after a consumption before regeneration resumes.
    pub regen_delay: Duration,
    last_consumed: Option<Timestamp>,
}

impl ResourcePool {
    pub fn new(max: f32, regen_rate: f32, regen_delay: Duration) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            regen_rate,
            regen_delay,
            last_consumed: None,
        }
    }

    /// Consume `amount` if the pool holds at least that much. All or nothing.
    pub fn try_consume(&mut self, amount: f32, now: Timestamp) -> bool {
        if self.current < amount {
            return false;
        }
        self.current = (self.current - amount).max(0.0);
        self.last_consumed = Some(now);
        true
    }

    pub fn can_afford(&self, amount: f32) -> bool {
        self.current >= amount
    }

    /// Regenerate for a frame of length `dt`, if the delay has passed.
    pub fn regenerate(&mut self, now: Timestamp, dt: Duration) {
        if self.current >= self.max {
            return;
        }
        let mut dt = dt;
        if let Some(at) = self.last_consumed {
            let since = now.duration_since(at);
            if since < self.regen_delay {
                return;
            }
            // Only the part of the frame past the delay counts.
            dt = dt.min(since - self.regen_delay);
        }
        self.current = (self.current + self.regen_rate * dt.as_secs_f32()).min(self.max);
    }

    pub fn last_consumed(&self) -> Option<Timestamp> {
        self.last_consumed
    }

    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_clamps_at_zero_and_max() {
        let mut hp = Health::new(50.0);
        hp.take_damage(80.0);
        assert_eq!(hp.current, 0.0);
        assert!(hp.is_dead());
        hp.heal(500.0);
        assert_eq!(hp.current, 50.0);
    }

    #[test]
    fn pool_consume_is_all_or_nothing() {
        let mut pool = ResourcePool::new(30.0, 10.0, Duration::from_secs(1));
        assert!(pool.try_consume(25.0, Timestamp::ZERO));
        assert!(!pool.try_consume(25.0, Timestamp::from_millis(10)));
        assert!((pool.current - 5.0).abs() < 1e-5);
        assert_eq!(pool.last_consumed(), Some(Timestamp::ZERO));
    }

    #[test]
    fn pool_waits_for_regen_delay() {
        let mut pool = ResourcePool::new(100.0, 20.0, Duration::from_millis(1000));
        pool.try_consume(50.0, Timestamp::ZERO);
        pool.regenerate(Timestamp::from_millis(500), Duration::from_millis(500));
        assert!((pool.current - 50.0).abs() < 1e-5);
        pool.regenerate(Timestamp::from_millis(1500), Duration::from_millis(1000));
        assert!((pool.current - 60.0).abs() < 1e-3);
    }

    #[test]
    fn pool_regen_never_exceeds_max() {
        let mut pool = ResourcePool::new(100.0, 20.0, Duration::ZERO);
        pool.try_consume(5.0, Timestamp::ZERO);
        pool.regenerate(Timestamp::from_secs_f32(10.0), Duration::from_secs(10));
        assert_eq!(pool.current, 100.0);
    }
}
