//! Boss special attacks: one global cooldown, phase-weighted selection, and
//! timed telegraph/hit/finish steps driven by the scheduler.

use std::time::Duration;

use engine_core::{Cooldown, EventBus, Health, Scheduler, Time, Timestamp};
use glam::Vec3;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::{BossKind, BossPhase};
use crate::events::GameEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossAttackConfig {
    /// Minimum gap between any two special attacks.
    pub cooldown_ms: u64,
}

impl Default for BossAttackConfig {
    fn default() -> Self {
        Self { cooldown_ms: 6000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackKind {
    GroundSlam,
    LaserSweep,
    MissileBarrage,
    ShockwaveRing,
}

impl AttackKind {
    pub fn name(&self) -> &'static str {
        match self {
            AttackKind::GroundSlam => "Ground Slam",
            AttackKind::LaserSweep => "Laser Sweep",
            AttackKind::MissileBarrage => "Missile Barrage",
            AttackKind::ShockwaveRing => "Shockwave Ring",
        }
    }

    pub fn damage(&self) -> f32 {
        match self {
            AttackKind::GroundSlam => 40.0,
            AttackKind::LaserSweep => 25.0,
            AttackKind::MissileBarrage => 30.0,
            AttackKind::ShockwaveRing => 35.0,
        }
    }

    /// Area of effect. Only the slam has one.
    pub fn radius(&self) -> Option<f32> {
        match self {
            AttackKind::GroundSlam => Some(8.0),
            _ => None,
        }
    }

    /// Wind-up before the hit resolves.
    pub fn telegraph(&self) -> Duration {
        Duration::from_millis(match self {
            AttackKind::GroundSlam => 800,
            AttackKind::LaserSweep => 1000,
            AttackKind::MissileBarrage => 1200,
            AttackKind::ShockwaveRing => 900,
        })
    }

    /// Full animation length, telegraph included.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(match self {
            AttackKind::GroundSlam => 1500,
            AttackKind::LaserSweep => 2500,
            AttackKind::MissileBarrage => 3000,
            AttackKind::ShockwaveRing => 2000,
        })
    }
}

struct PhasePlan {
    trigger_chance: f32,
    pool: &'static [(AttackKind, u32)],
}

fn phase_plan(phase: BossPhase) -> PhasePlan {
    use AttackKind::*;
    match phase {
        BossPhase::One => PhasePlan {
            trigger_chance: 0.3,
            pool: &[(GroundSlam, 60), (LaserSweep, 40)],
        },
        BossPhase::Two => PhasePlan {
            trigger_chance: 0.45,
            pool: &[(GroundSlam, 35), (LaserSweep, 35), (MissileBarrage, 30)],
        },
        BossPhase::Three => PhasePlan {
            trigger_chance: 0.6,
            pool: &[(GroundSlam, 25), (LaserSweep, 25), (MissileBarrage, 25), (ShockwaveRing, 25)],
        },
    }
}

/// Attacks that can come up in `phase`.
pub fn attack_pool(phase: BossPhase) -> Vec<AttackKind> {
    phase_plan(phase).pool.iter().map(|(kind, _)| *kind).collect()
}

#[derive(Debug, Clone, Copy)]
enum AttackStep {
    Hit { kind: AttackKind, origin: Vec3 },
    Finish { kind: AttackKind },
}

/// Read-only view for HUD polling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossAttackSnapshot {
    pub phase: Option<BossPhase>,
    pub cooldown_progress: f32,
    pub attacks_in_progress: usize,
    pub defeated: bool,
}

pub struct BossAttackSystem {
    boss: BossKind,
    cooldown: Cooldown,
    steps: Scheduler<AttackStep>,
    in_progress: usize,
    phase: Option<BossPhase>,
    defeated: bool,
    rng: StdRng,
}

impl BossAttackSystem {
    pub fn new(boss: BossKind, config: &BossAttackConfig) -> Self {
        Self::with_rng(boss, config, StdRng::from_entropy())
    }

    pub fn with_seed(boss: BossKind, config: &BossAttackConfig, seed: u64) -> Self {
        Self::with_rng(boss, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(boss: BossKind, config: &BossAttackConfig, rng: StdRng) -> Self {
        Self {
            boss,
            cooldown: Cooldown::new(Duration::from_millis(config.cooldown_ms)),
            steps: Scheduler::new(),
            in_progress: 0,
            phase: None,
            defeated: false,
            rng,
        }
    }

    pub fn boss(&self) -> BossKind {
        self.boss
    }

    pub fn is_ready(&self, now: Timestamp) -> bool {
        !self.defeated && self.cooldown.is_ready(now)
    }

    /// Roll for a special attack this frame. Picks from the pool of the
    /// phase implied by `health_fraction`, or `None` if on cooldown or the
    /// roll misses.
    pub fn should_use_special_attack(&mut self, health_fraction: f32, now: Timestamp) -> Option<AttackKind> {
        if !self.is_ready(now) {
            return None;
        }
        let plan = phase_plan(BossPhase::from_health_fraction(health_fraction));
        if self.rng.gen::<f32>() >= plan.trigger_chance {
            return None;
        }
        let weights = WeightedIndex::new(plan.pool.iter().map(|(_, w)| *w)).ok()?;
        Some(plan.pool[weights.sample(&mut self.rng)].0)
    }

    /// Start an attack. Returns `false` inside the cooldown window or once
    /// the boss is down.
    pub fn trigger_special_attack(
        &mut self,
        kind: AttackKind,
        origin: Vec3,
        now: Timestamp,
        bus: &mut EventBus<GameEvent>,
    ) -> bool {
        if !self.is_ready(now) {
            return false;
        }
        self.cooldown.trigger(now);
        self.steps.schedule(now + kind.telegraph(), AttackStep::Hit { kind, origin });
        self.steps.schedule(now + kind.duration(), AttackStep::Finish { kind });
        self.in_progress += 1;

        log::debug!("{:?} uses {}", self.boss, kind.name());
        bus.publish(GameEvent::BossAttackStarted {
            attack: kind,
            origin,
            telegraph_ms: kind.telegraph().as_millis() as u64,
        });
        true
    }

    /// Fire due hit and finish steps.
    pub fn update(&mut self, time: &Time, bus: &mut EventBus<GameEvent>) {
        for step in self.steps.take_due(time.now()) {
            match step {
                AttackStep::Hit { kind, origin } => bus.publish(GameEvent::BossAttackHit {
                    attack: kind,
                    damage: kind.damage(),
                    radius: kind.radius(),
                    origin,
                }),
                AttackStep::Finish { kind } => {
                    self.in_progress = self.in_progress.saturating_sub(1);
                    bus.publish(GameEvent::BossAttackFinished { attack: kind });
                }
            }
        }
    }

    /// Track the boss's health: announce phase transitions and the kill.
    pub fn observe_health(&mut self, health: &Health, bus: &mut EventBus<GameEvent>) {
        if self.defeated {
            return;
        }
        if health.is_dead() {
            self.defeated = true;
            self.cancel_all();
            log::info!("{:?} defeated", self.boss);
            bus.publish(GameEvent::BossDefeated { boss: self.boss });
            return;
        }
        let phase = BossPhase::from_health_fraction(health.percentage());
        if self.phase != Some(phase) {
            if self.phase.is_some() {
                log::info!("{:?} enters phase {:?}", self.boss, phase);
            }
            self.phase = Some(phase);
            bus.publish(GameEvent::BossPhaseChanged { boss: self.boss, phase });
        }
    }

    /// Drop every pending attack step.
    pub fn cancel_all(&mut self) {
        self.steps.clear();
        self.in_progress = 0;
    }

    pub fn phase(&self) -> Option<BossPhase> {
        self.phase
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    pub fn snapshot(&self, now: Timestamp) -> BossAttackSnapshot {
        BossAttackSnapshot {
            phase: self.phase,
            cooldown_progress: self.cooldown.progress(now),
            attacks_in_progress: self.in_progress,
            defeated: self.defeated,
        }
    }
}
