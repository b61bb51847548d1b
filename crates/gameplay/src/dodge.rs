//! Dodge roll: stamina-gated dash with a cooldown and an invulnerability window.
//!
//! The roll itself is `Idle -> Dodging -> Idle`. Cooldown and stamina are side
//! constraints checked on every attempt. Upgrades are applied when a value is
//! read, never folded into the base tuning.

use std::time::Duration;

use engine_core::{progress_between, EventBus, ResourcePool, Time, Timestamp};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::GameEvent;

/// Direction used when the caller asks to dodge with no input.
pub const DEFAULT_DODGE_DIRECTION: Vec3 = Vec3::NEG_Z;

/// Base dodge tuning. Loaded from the `dodge` section of `config.ron`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DodgeConfig {
    pub max_stamina: f32,
    pub stamina_cost: f32,
    /// Stamina restored per second.
    pub regen_rate: f32,
    pub regen_delay_ms: u64,
    pub cooldown_ms: u64,
    pub duration_ms: u64,
    pub invulnerability_ms: u64,
    pub distance: f32,
}

impl Default for DodgeConfig {
    fn default() -> Self {
        Self {
            max_stamina: 100.0,
            stamina_cost: 25.0,
            regen_rate: 20.0,
            regen_delay_ms: 1000,
            cooldown_ms: 1500,
            duration_ms: 300,
            invulnerability_ms: 200,
            distance: 5.0,
        }
    }
}

/// Purchasable dodge upgrades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DodgeUpgrades {
    /// Cooldown x0.8.
    pub quick_recovery: bool,
    /// Stamina cost x0.7.
    pub efficient: bool,
    /// Invulnerability window +100 ms.
    pub extended_iframes: bool,
    /// Distance x1.15.
    pub long_dash: bool,
    /// Stored for the upgrade screen; no dodge rule reads it yet.
    pub phase_through: bool,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DodgeError {
    #[error("already dodging")]
    AlreadyDodging,
    #[error("dodge on cooldown for {remaining_ms} ms")]
    OnCooldown { remaining_ms: u64 },
    #[error("need {required} stamina, have {available}")]
    InsufficientStamina { required: f32, available: f32 },
}

/// The motion a successful dodge will perform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DodgeMotion {
    /// Unit direction of travel.
    pub direction: Vec3,
    pub distance: f32,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DodgeState {
    Idle,
    Dodging { started: Timestamp, offset: Vec3 },
}

/// Read-only view for HUD polling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DodgeSnapshot {
    pub is_dodging: bool,
    pub is_invulnerable: bool,
    pub can_dodge: bool,
    pub stamina: f32,
    pub max_stamina: f32,
    pub cooldown_progress: f32,
    pub dodges_performed: u32,
}

pub struct DodgeSystem {
    config: DodgeConfig,
    upgrades: DodgeUpgrades,
    stamina: ResourcePool,
    state: DodgeState,
    last_dodge: Option<Timestamp>,
    dodges_performed: u32,
}

fn scale_ms(ms: u64, factor: f64) -> Duration {
    Duration::from_millis((ms as f64 * factor).round() as u64)
}

impl DodgeSystem {
    pub fn new(config: DodgeConfig) -> Self {
        let stamina = ResourcePool::new(
            config.max_stamina,
            config.regen_rate,
            Duration::from_millis(config.regen_delay_ms),
        );
        Self {
            config,
            upgrades: DodgeUpgrades::default(),
            stamina,
            state: DodgeState::Idle,
            last_dodge: None,
            dodges_performed: 0,
        }
    }

    pub fn upgrades(&self) -> DodgeUpgrades {
        self.upgrades
    }

    pub fn set_upgrades(&mut self, upgrades: DodgeUpgrades) {
        self.upgrades = upgrades;
    }

    pub fn effective_cooldown(&self) -> Duration {
        let factor = if self.upgrades.quick_recovery { 0.8 } else { 1.0 };
        scale_ms(self.config.cooldown_ms, factor)
    }

    pub fn effective_cost(&self) -> f32 {
        let factor = if self.upgrades.efficient { 0.7 } else { 1.0 };
        self.config.stamina_cost * factor
    }

    pub fn effective_invulnerability(&self) -> Duration {
        let extra = if self.upgrades.extended_iframes { 100 } else { 0 };
        Duration::from_millis(self.config.invulnerability_ms + extra)
    }

    pub fn effective_distance(&self) -> f32 {
        let factor = if self.upgrades.long_dash { 1.15 } else { 1.0 };
        self.config.distance * factor
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.config.duration_ms)
    }

    /// Start of the current roll, if it has not run its course yet.
    fn active_start(&self, now: Timestamp) -> Option<Timestamp> {
        match self.state {
            DodgeState::Dodging { started, .. } if now.duration_since(started) < self.duration() => Some(started),
            _ => None,
        }
    }

    pub fn is_dodging(&self, now: Timestamp) -> bool {
        self.active_start(now).is_some()
    }

    /// Why a dodge attempted at `now` would fail, if it would.
    ///
    /// The cooldown gate is checked first: with default tuning it outlasts the
    /// roll, so a rejected mid-roll attempt reports the remaining cooldown.
    pub fn check(&self, now: Timestamp) -> Result<(), DodgeError> {
        if let Some(last) = self.last_dodge {
            let cooldown = self.effective_cooldown();
            let since = now.duration_since(last);
            if since < cooldown {
                return Err(DodgeError::OnCooldown {
                    remaining_ms: (cooldown - since).as_millis() as u64,
                });
            }
        }
        if self.is_dodging(now) {
            return Err(DodgeError::AlreadyDodging);
        }
        let cost = self.effective_cost();
        if !self.stamina.can_afford(cost) {
            return Err(DodgeError::InsufficientStamina {
                required: cost,
                available: self.stamina.current,
            });
        }
        Ok(())
    }

    pub fn can_dodge(&self, now: Timestamp) -> bool {
        self.check(now).is_ok()
    }

    /// Attempt a dodge. A failed attempt leaves stamina and timers untouched.
    pub fn try_dodge(
        &mut self,
        direction: Vec3,
        now: Timestamp,
        bus: &mut EventBus<GameEvent>,
    ) -> Result<DodgeMotion, DodgeError> {
        self.check(now)?;
        self.finish_expired(now, bus);

        let cost = self.effective_cost();
        if !self.stamina.try_consume(cost, now) {
            return Err(DodgeError::InsufficientStamina {
                required: cost,
                available: self.stamina.current,
            });
        }

        let direction = direction.try_normalize().unwrap_or(DEFAULT_DODGE_DIRECTION);
        let distance = self.effective_distance();
        let duration = self.duration();

        self.state = DodgeState::Dodging {
            started: now,
            offset: direction * distance,
        };
        self.last_dodge = Some(now);
        self.dodges_performed += 1;

        log::debug!("Dodge toward {:?} ({} units), stamina left {}", direction, distance, self.stamina.current);
        bus.publish(GameEvent::DodgeStarted {
            direction,
            distance,
            duration_ms: duration.as_millis() as u64,
        });

        Ok(DodgeMotion {
            direction,
            distance,
            duration,
        })
    }

    /// Finish a roll whose time is up and regenerate stamina.
    pub fn update(&mut self, time: &Time, bus: &mut EventBus<GameEvent>) {
        let now = time.now();
        self.finish_expired(now, bus);
        self.stamina.regenerate(now, time.delta());
    }

    /// Every `DodgeStarted` gets its `DodgeEnded`, including a roll that ran
    /// out before `update` got to it.
    fn finish_expired(&mut self, now: Timestamp, bus: &mut EventBus<GameEvent>) {
        if let DodgeState::Dodging { started, .. } = self.state {
            if now.duration_since(started) >= self.duration() {
                self.state = DodgeState::Idle;
                bus.publish(GameEvent::DodgeEnded);
            }
        }
    }

    pub fn is_invulnerable(&self, now: Timestamp) -> bool {
        self.active_start(now)
            .is_some_and(|started| now.duration_since(started) < self.effective_invulnerability())
    }

    /// Fraction of the roll completed.
    pub fn progress(&self, now: Timestamp) -> f32 {
        match self.active_start(now) {
            Some(started) => progress_between(Some(started), self.duration(), now),
            None => 0.0,
        }
    }

    /// Displacement from the roll's start position. Cubic ease-out, so the
    /// mover decelerates into the stop.
    pub fn position_offset(&self, now: Timestamp) -> Vec3 {
        match self.state {
            DodgeState::Dodging { started, offset } => {
                let t = progress_between(Some(started), self.duration(), now);
                offset * ease_out_cubic(t)
            }
            DodgeState::Idle => Vec3::ZERO,
        }
    }

    pub fn cooldown_progress(&self, now: Timestamp) -> f32 {
        progress_between(self.last_dodge, self.effective_cooldown(), now)
    }

    pub fn stamina(&self) -> f32 {
        self.stamina.current
    }

    pub fn dodges_performed(&self) -> u32 {
        self.dodges_performed
    }

    pub fn snapshot(&self, now: Timestamp) -> DodgeSnapshot {
        DodgeSnapshot {
            is_dodging: self.is_dodging(now),
            is_invulnerable: self.is_invulnerable(now),
            can_dodge: self.can_dodge(now),
            stamina: self.stamina.current,
            max_stamina: self.stamina.max,
            cooldown_progress: self.cooldown_progress(now),
            dodges_performed: self.dodges_performed,
        }
    }
}

pub fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}
