//! Boss fights: the arena they happen in and the special attacks the boss
//! throws at the player.

pub mod arena;
pub mod attacks;

pub use arena::{arena_config, ArenaConfig, ArenaShape, BossArena, DamageOutcome, ElementConfig, ElementKind};
pub use attacks::{AttackKind, BossAttackConfig, BossAttackSystem};

use engine_core::{EventBus, Health, Time, Timestamp};
use glam::Vec3;

use crate::events::GameEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BossKind {
    Colossus,
    HiveQueen,
    Warden,
}

impl BossKind {
    pub fn name(&self) -> &'static str {
        match self {
            BossKind::Colossus => "The Colossus",
            BossKind::HiveQueen => "Hive Queen",
            BossKind::Warden => "The Warden",
        }
    }

    pub fn max_health(&self) -> f32 {
        match self {
            BossKind::Colossus => 5000.0,
            BossKind::HiveQueen => 4000.0,
            BossKind::Warden => 6000.0,
        }
    }
}

/// Fight phase, derived from remaining health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BossPhase {
    /// Above 66%
    One,
    /// Above 33%
    Two,
    Three,
}

impl BossPhase {
    pub fn from_health_fraction(fraction: f32) -> Self {
        if fraction > 0.66 {
            BossPhase::One
        } else if fraction > 0.33 {
            BossPhase::Two
        } else {
            BossPhase::Three
        }
    }
}

/// One boss fight: the boss's health plus its arena and attack systems.
pub struct BossEncounter {
    kind: BossKind,
    health: Health,
    arena: BossArena,
    attacks: BossAttackSystem,
    position: Vec3,
}

impl BossEncounter {
    pub fn new(kind: BossKind, config: &BossAttackConfig, now: Timestamp, bus: &mut EventBus<GameEvent>) -> Self {
        let arena = BossArena::new(&arena_config(kind), now);
        let attacks = BossAttackSystem::new(kind, config);
        Self::assemble(kind, arena, attacks, bus)
    }

    pub fn with_seed(
        kind: BossKind,
        config: &BossAttackConfig,
        now: Timestamp,
        seed: u64,
        bus: &mut EventBus<GameEvent>,
    ) -> Self {
        let arena = BossArena::with_seed(&arena_config(kind), now, seed);
        let attacks = BossAttackSystem::with_seed(kind, config, seed.wrapping_add(1));
        Self::assemble(kind, arena, attacks, bus)
    }

    fn assemble(kind: BossKind, arena: BossArena, mut attacks: BossAttackSystem, bus: &mut EventBus<GameEvent>) -> Self {
        let health = Health::new(kind.max_health());
        log::info!("{} awaits in '{}'", kind.name(), arena.name());
        attacks.observe_health(&health, bus);
        Self {
            kind,
            health,
            arena,
            attacks,
            position: Vec3::ZERO,
        }
    }

    /// Scale the boss's health pool, e.g. for New Game+ cycles. Only
    /// meaningful before the fight starts.
    pub fn scaled(mut self, health_multiplier: f32) -> Self {
        self.health = Health::new(self.kind.max_health() * health_multiplier.max(0.0));
        self
    }

    pub fn kind(&self) -> BossKind {
        self.kind
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn is_defeated(&self) -> bool {
        self.attacks.is_defeated()
    }

    pub fn arena(&self) -> &BossArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut BossArena {
        &mut self.arena
    }

    pub fn attacks(&self) -> &BossAttackSystem {
        &self.attacks
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn damage_boss(&mut self, amount: f32, bus: &mut EventBus<GameEvent>) {
        if self.is_defeated() {
            return;
        }
        self.health.take_damage(amount);
        self.attacks.observe_health(&self.health, bus);
    }

    /// Step the arena, roll for a special attack, and resolve pending
    /// attack steps.
    pub fn update(&mut self, time: &Time, bus: &mut EventBus<GameEvent>) {
        if self.is_defeated() {
            return;
        }
        let now = time.now();
        self.arena.update(time, bus);
        if let Some(kind) = self.attacks.should_use_special_attack(self.health.percentage(), now) {
            self.attacks.trigger_special_attack(kind, self.position, now, bus);
        }
        self.attacks.update(time, bus);
    }
}
