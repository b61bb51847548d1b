//! Kill combo: consecutive hits inside a rolling window build a score
//! multiplier.

use std::time::Duration;

use engine_core::{EventBus, Timestamp};
use serde::{Deserialize, Serialize};

use crate::events::GameEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboConfig {
    /// Longest gap between hits that keeps the combo alive.
    pub window_ms: u64,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self { window_ms: 2000 }
    }
}

/// Score multiplier for a combo of `count` hits.
pub fn multiplier_for(count: u32) -> f32 {
    match count {
        50.. => 4.0,
        25.. => 3.0,
        10.. => 2.0,
        5.. => 1.5,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComboSnapshot {
    pub count: u32,
    pub multiplier: f32,
    pub best: u32,
    /// Fraction of the window left before the combo drops, 0 when idle.
    pub window_left: f32,
}

pub struct ComboSystem {
    window: Duration,
    count: u32,
    best: u32,
    last_hit: Option<Timestamp>,
}

impl ComboSystem {
    pub fn new(config: &ComboConfig) -> Self {
        Self {
            window: Duration::from_millis(config.window_ms),
            count: 0,
            best: 0,
            last_hit: None,
        }
    }

    fn expired(&self, now: Timestamp) -> bool {
        self.last_hit.is_some_and(|at| now.duration_since(at) > self.window)
    }

    fn break_combo(&mut self, bus: &mut EventBus<GameEvent>) {
        if self.count > 0 {
            log::debug!("Combo broken at {}", self.count);
            bus.publish(GameEvent::ComboBroken {
                final_count: self.count,
            });
        }
        self.count = 0;
        self.last_hit = None;
    }

    /// Count a hit. Returns the combo after it.
    pub fn register_hit(&mut self, now: Timestamp, bus: &mut EventBus<GameEvent>) -> u32 {
        if self.expired(now) {
            self.break_combo(bus);
        }
        self.count += 1;
        self.best = self.best.max(self.count);
        self.last_hit = Some(now);
        bus.publish(GameEvent::ComboChanged {
            count: self.count,
            multiplier: self.multiplier(),
        });
        self.count
    }

    /// Drop the combo once the window has passed without a hit.
    pub fn update(&mut self, now: Timestamp, bus: &mut EventBus<GameEvent>) {
        if self.expired(now) {
            self.break_combo(bus);
        }
    }

    /// Player took damage or the mode ended.
    pub fn reset(&mut self, bus: &mut EventBus<GameEvent>) {
        self.break_combo(bus);
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn multiplier(&self) -> f32 {
        multiplier_for(self.count)
    }

    pub fn snapshot(&self, now: Timestamp) -> ComboSnapshot {
        let window_left = match self.last_hit {
            Some(at) if !self.window.is_zero() => {
                let left = self.window.saturating_sub(now.duration_since(at));
                left.as_secs_f32() / self.window.as_secs_f32()
            }
            _ => 0.0,
        };
        ComboSnapshot {
            count: self.count,
            multiplier: self.multiplier(),
            best: self.best,
            window_left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken(bus: &mut EventBus<GameEvent>) -> Vec<u32> {
        bus.drain()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::ComboBroken { final_count } => Some(final_count),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn multiplier_tiers() {
        assert_eq!(multiplier_for(0), 1.0);
        assert_eq!(multiplier_for(4), 1.0);
        assert_eq!(multiplier_for(5), 1.5);
        assert_eq!(multiplier_for(10), 2.0);
        assert_eq!(multiplier_for(25), 3.0);
        assert_eq!(multiplier_for(49), 3.0);
        assert_eq!(multiplier_for(50), 4.0);
    }

    #[test]
    fn hits_inside_window_chain() {
        let mut combo = ComboSystem::new(&ComboConfig::default());
        let mut bus = EventBus::new();
        for i in 0..6 {
            combo.register_hit(Timestamp::from_millis(i * 2000), &mut bus);
        }
        assert_eq!(combo.count(), 6);
        assert_eq!(combo.multiplier(), 1.5);
        assert!(broken(&mut bus).is_empty());
    }

    #[test]
    fn gap_breaks_combo_once() {
        let mut combo = ComboSystem::new(&ComboConfig::default());
        let mut bus = EventBus::new();
        combo.register_hit(Timestamp::ZERO, &mut bus);
        combo.register_hit(Timestamp::from_millis(500), &mut bus);

        combo.update(Timestamp::from_millis(2500), &mut bus);
        assert_eq!(combo.count(), 2);
        combo.update(Timestamp::from_millis(2501), &mut bus);
        combo.update(Timestamp::from_millis(4000), &mut bus);
        assert_eq!(broken(&mut bus), vec![2]);
        assert_eq!(combo.count(), 0);
        assert_eq!(combo.best(), 2);
    }

    #[test]
    fn late_hit_starts_fresh_combo() {
        let mut combo = ComboSystem::new(&ComboConfig::default());
        let mut bus = EventBus::new();
        combo.register_hit(Timestamp::ZERO, &mut bus);
        assert_eq!(combo.register_hit(Timestamp::from_millis(5000), &mut bus), 1);
        assert_eq!(broken(&mut bus), vec![1]);
    }
}
