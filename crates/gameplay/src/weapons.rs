//! Weapon stat table and per-weapon fire/reload state.

use std::time::Duration;

use engine_core::{Cooldown, EventBus, Timestamp};
use thiserror::Error;

use crate::events::GameEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponKind {
    /// Sidearm with a bottomless reserve.
    Pistol,
    AssaultRifle,
    /// Fires a spread of pellets per shot.
    Shotgun,
    Smg,
    Sniper,
    RocketLauncher,
}

/// Fixed tuning for a weapon kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub name: &'static str,
    /// Per pellet.
    pub damage: f32,
    /// Shots per second.
    pub fire_rate: f32,
    pub magazine: u32,
    /// `None` for unlimited reserve ammo.
    pub reserve: Option<u32>,
    pub reload_time: Duration,
    /// Cone half-angle in degrees.
    pub spread: f32,
    pub pellets: u32,
    pub range: f32,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 6] = [
        WeaponKind::Pistol,
        WeaponKind::AssaultRifle,
        WeaponKind::Shotgun,
        WeaponKind::Smg,
        WeaponKind::Sniper,
        WeaponKind::RocketLauncher,
    ];

    pub fn stats(&self) -> WeaponStats {
        let (name, damage, fire_rate, magazine, reserve, reload_ms, spread, pellets, range) = match self {
            WeaponKind::Pistol => ("Pistol", 20.0, 4.0, 12, None, 1200, 1.5, 1, 60.0),
            WeaponKind::AssaultRifle => ("Assault Rifle", 24.0, 10.0, 30, Some(210), 2000, 2.5, 1, 100.0),
            WeaponKind::Shotgun => ("Shotgun", 12.0, 1.2, 8, Some(48), 2600, 9.0, 8, 25.0),
            WeaponKind::Smg => ("SMG", 14.0, 15.0, 40, Some(240), 1800, 4.0, 1, 50.0),
            WeaponKind::Sniper => ("Sniper", 140.0, 0.8, 5, Some(30), 3000, 0.2, 1, 400.0),
            WeaponKind::RocketLauncher => ("Rocket Launcher", 180.0, 0.6, 1, Some(10), 3400, 0.0, 1, 150.0),
        };
        WeaponStats {
            name,
            damage,
            fire_rate,
            magazine,
            reserve,
            reload_time: Duration::from_millis(reload_ms),
            spread,
            pellets,
            range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FireError {
    #[error("reloading, {remaining_ms} ms left")]
    Reloading { remaining_ms: u64 },
    #[error("waiting on fire rate")]
    OnCooldown,
    #[error("magazine empty")]
    EmptyMagazine,
}

/// What a successful trigger pull produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub pellets: u32,
    pub damage_per_pellet: f32,
    pub spread: f32,
    pub range: f32,
}

pub struct Weapon {
    kind: WeaponKind,
    stats: WeaponStats,
    magazine: u32,
    reserve: Option<u32>,
    fire_gate: Cooldown,
    reload_done_at: Option<Timestamp>,
}

impl Weapon {
    pub fn new(kind: WeaponKind) -> Self {
        let stats = kind.stats();
        let fire_interval = if stats.fire_rate > 0.0 {
            Duration::from_millis((1000.0 / stats.fire_rate).round() as u64)
        } else {
            Duration::ZERO
        };
        Self {
            kind,
            stats,
            magazine: stats.magazine,
            reserve: stats.reserve,
            fire_gate: Cooldown::new(fire_interval),
            reload_done_at: None,
        }
    }

    pub fn kind(&self) -> WeaponKind {
        self.kind
    }

    pub fn stats(&self) -> &WeaponStats {
        &self.stats
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_done_at.is_some()
    }

    pub fn check_fire(&self, now: Timestamp) -> Result<(), FireError> {
        if let Some(done) = self.reload_done_at {
            return Err(FireError::Reloading {
                remaining_ms: done.duration_since(now).as_millis() as u64,
            });
        }
        if !self.fire_gate.is_ready(now) {
            return Err(FireError::OnCooldown);
        }
        if self.magazine == 0 {
            return Err(FireError::EmptyMagazine);
        }
        Ok(())
    }

    pub fn try_fire(&mut self, now: Timestamp, bus: &mut EventBus<GameEvent>) -> Result<Shot, FireError> {
        self.check_fire(now)?;
        self.magazine -= 1;
        self.fire_gate.trigger(now);
        bus.publish(GameEvent::WeaponFired {
            weapon: self.kind,
            pellets: self.stats.pellets,
        });
        Ok(Shot {
            pellets: self.stats.pellets,
            damage_per_pellet: self.stats.damage,
            spread: self.stats.spread,
            range: self.stats.range,
        })
    }

    /// Begin a reload. `false` if already reloading, full, or out of
    /// reserve ammo.
    pub fn start_reload(&mut self, now: Timestamp) -> bool {
        if self.is_reloading() || self.magazine >= self.stats.magazine || self.reserve == Some(0) {
            return false;
        }
        self.reload_done_at = Some(now + self.stats.reload_time);
        true
    }

    /// Weapon switch interrupts a reload. Nothing is refilled.
    pub fn cancel_reload(&mut self) {
        self.reload_done_at = None;
    }

    pub fn update(&mut self, now: Timestamp, bus: &mut EventBus<GameEvent>) {
        let Some(done) = self.reload_done_at else {
            return;
        };
        if now < done {
            return;
        }
        let needed = self.stats.magazine - self.magazine;
        let loaded = match self.reserve.as_mut() {
            Some(reserve) => {
                let n = needed.min(*reserve);
                *reserve -= n;
                n
            }
            None => needed,
        };
        self.magazine += loaded;
        self.reload_done_at = None;
        bus.publish(GameEvent::WeaponReloaded { weapon: self.kind });
    }

    pub fn magazine(&self) -> u32 {
        self.magazine
    }

    pub fn reserve(&self) -> Option<u32> {
        self.reserve
    }

    /// HUD ammo counter.
    pub fn ammo_display(&self) -> String {
        match (self.is_reloading(), self.reserve) {
            (true, _) => "RELOADING".to_string(),
            (false, Some(reserve)) => format!("{} / {}", self.magazine, reserve),
            (false, None) => format!("{} / --", self.magazine),
        }
    }
}
