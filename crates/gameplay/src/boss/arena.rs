//! Boss arenas: a named layout of interactive elements instantiated per fight.
//!
//! Elements live as entities in a private `hecs::World`. Destructible ones
//! carry `Health`; hazards and spawners carry their behaviour state. An
//! element is addressed by its kind plus its ordinal among elements of that
//! kind.

use std::collections::HashMap;
use std::time::Duration;

use engine_core::{EventBus, Health, Time, Timestamp};
use glam::Vec3;
use hecs::{Entity, World};
use rand::prelude::*;

use super::BossKind;
use crate::events::GameEvent;
use crate::survival::EnemyType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaShape {
    Circle,
    Square,
    Hexagon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// Destructible cover.
    Pillar,
    /// Indestructible wall.
    Barrier,
    /// Zone that flares up at random.
    HazardZone,
    /// Nest that releases adds on a cadence.
    Spawner,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementBehavior {
    Cover,
    Hazard {
        /// Expected triggers per second.
        chance_per_sec: f32,
        damage: f32,
        radius: f32,
    },
    Spawner {
        interval: Duration,
        max_active: u32,
        enemy: EnemyType,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementConfig {
    pub kind: ElementKind,
    pub position: Vec3,
    /// `None` for indestructible elements.
    pub max_health: Option<f32>,
    pub behavior: ElementBehavior,
}

impl ElementConfig {
    pub fn pillar(position: Vec3, health: f32) -> Self {
        Self {
            kind: ElementKind::Pillar,
            position,
            max_health: Some(health),
            behavior: ElementBehavior::Cover,
        }
    }

    pub fn barrier(position: Vec3) -> Self {
        Self {
            kind: ElementKind::Barrier,
            position,
            max_health: None,
            behavior: ElementBehavior::Cover,
        }
    }

    pub fn hazard(position: Vec3, chance_per_sec: f32, damage: f32, radius: f32) -> Self {
        Self {
            kind: ElementKind::HazardZone,
            position,
            max_health: None,
            behavior: ElementBehavior::Hazard {
                chance_per_sec,
                damage,
                radius,
            },
        }
    }

    pub fn spawner(position: Vec3, health: f32, interval: Duration, max_active: u32, enemy: EnemyType) -> Self {
        Self {
            kind: ElementKind::Spawner,
            position,
            max_health: Some(health),
            behavior: ElementBehavior::Spawner {
                interval,
                max_active,
                enemy,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    pub name: &'static str,
    /// Radius (circle/hexagon) or half-extent (square).
    pub size: f32,
    pub shape: ArenaShape,
    pub elements: Vec<ElementConfig>,
}

fn ring(count: usize, radius: f32) -> impl Iterator<Item = Vec3> {
    (0..count).map(move |i| {
        let angle = (i as f32 / count as f32) * std::f32::consts::TAU;
        Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
    })
}

/// The arena layout each boss is fought in.
pub fn arena_config(boss: BossKind) -> ArenaConfig {
    match boss {
        BossKind::Colossus => ArenaConfig {
            name: "Shattered Colonnade",
            size: 40.0,
            shape: ArenaShape::Circle,
            elements: ring(6, 25.0)
                .map(|p| ElementConfig::pillar(p, 300.0))
                .chain([ElementConfig::hazard(Vec3::ZERO, 0.1, 15.0, 6.0)])
                .collect(),
        },
        BossKind::HiveQueen => ArenaConfig {
            name: "Brood Chamber",
            size: 35.0,
            shape: ArenaShape::Hexagon,
            elements: ring(3, 28.0)
                .map(|p| ElementConfig::spawner(p, 400.0, Duration::from_secs(8), 4, EnemyType::Fast))
                .chain(ring(2, 12.0).map(|p| ElementConfig::hazard(p, 0.15, 10.0, 4.0)))
                .collect(),
        },
        BossKind::Warden => ArenaConfig {
            name: "Iron Courtyard",
            size: 30.0,
            shape: ArenaShape::Square,
            elements: vec![
                ElementConfig::barrier(Vec3::new(-15.0, 0.0, 0.0)),
                ElementConfig::barrier(Vec3::new(15.0, 0.0, 0.0)),
                ElementConfig::pillar(Vec3::new(0.0, 0.0, -12.0), 500.0),
                ElementConfig::pillar(Vec3::new(0.0, 0.0, 12.0), 500.0),
                ElementConfig::spawner(Vec3::new(0.0, 0.0, -28.0), 600.0, Duration::from_secs(12), 2, EnemyType::Tank),
            ],
        },
    }
}

// ── Element components ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct ArenaElement {
    kind: ElementKind,
    index: usize,
    position: Vec3,
}

/// Marker added when an element's health reaches zero. Never removed.
#[derive(Debug, Clone, Copy)]
struct Destroyed;

#[derive(Debug, Clone, Copy)]
struct HazardZone {
    chance_per_sec: f32,
    damage: f32,
    radius: f32,
}

#[derive(Debug, Clone, Copy)]
struct SpawnerState {
    interval: Duration,
    max_active: u32,
    enemy: EnemyType,
    active: u32,
    last_spawn: Timestamp,
}

/// Result of hitting an arena element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    Unknown,
    Indestructible,
    AlreadyDestroyed,
    Damaged { remaining: f32 },
    Destroyed,
}

/// Read-only view of one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementSnapshot {
    pub kind: ElementKind,
    pub index: usize,
    pub position: Vec3,
    pub health: Option<Health>,
    pub destroyed: bool,
}

pub struct BossArena {
    name: &'static str,
    size: f32,
    shape: ArenaShape,
    world: World,
    lookup: HashMap<(ElementKind, usize), Entity>,
    rng: StdRng,
}

impl BossArena {
    pub fn new(config: &ArenaConfig, now: Timestamp) -> Self {
        Self::with_rng(config, now, StdRng::from_entropy())
    }

    /// Deterministic hazard rolls, for replays and tests.
    pub fn with_seed(config: &ArenaConfig, now: Timestamp, seed: u64) -> Self {
        Self::with_rng(config, now, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &ArenaConfig, now: Timestamp, rng: StdRng) -> Self {
        let mut world = World::new();
        let mut lookup = HashMap::new();
        let mut counts: HashMap<ElementKind, usize> = HashMap::new();

        for element in &config.elements {
            let slot = counts.entry(element.kind).or_insert(0);
            let index = *slot;
            *slot += 1;

            let entity = world.spawn((ArenaElement {
                kind: element.kind,
                index,
                position: element.position,
            },));
            if let Some(max) = element.max_health {
                let _ = world.insert_one(entity, Health::new(max));
            }
            let _ = match element.behavior {
                ElementBehavior::Cover => Ok(()),
                ElementBehavior::Hazard {
                    chance_per_sec,
                    damage,
                    radius,
                } => world.insert_one(
                    entity,
                    HazardZone {
                        chance_per_sec,
                        damage,
                        radius,
                    },
                ),
                ElementBehavior::Spawner {
                    interval,
                    max_active,
                    enemy,
                } => world.insert_one(
                    entity,
                    SpawnerState {
                        interval,
                        max_active,
                        enemy,
                        active: 0,
                        last_spawn: now,
                    },
                ),
            };
            lookup.insert((element.kind, index), entity);
        }

        log::debug!("Arena '{}' built with {} elements", config.name, lookup.len());
        Self {
            name: config.name,
            size: config.size,
            shape: config.shape,
            world,
            lookup,
            rng,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn shape(&self) -> ArenaShape {
        self.shape
    }

    /// Apply damage to one element. Emits a destroyed event the first time
    /// its health reaches zero.
    pub fn damage_element(
        &mut self,
        kind: ElementKind,
        index: usize,
        amount: f32,
        bus: &mut EventBus<GameEvent>,
    ) -> DamageOutcome {
        let Some(&entity) = self.lookup.get(&(kind, index)) else {
            log::warn!("Arena '{}' has no {:?} #{}", self.name, kind, index);
            return DamageOutcome::Unknown;
        };
        let position = {
            let Ok(mut query) =
                self.world.query_one::<(&ArenaElement, Option<&mut Health>, Option<&Destroyed>)>(entity)
            else {
                return DamageOutcome::Unknown;
            };
            let Some((element, health, destroyed)) = query.get() else {
                return DamageOutcome::Unknown;
            };
            if destroyed.is_some() {
                return DamageOutcome::AlreadyDestroyed;
            }
            let Some(health) = health else {
                return DamageOutcome::Indestructible;
            };

            health.take_damage(amount);
            if !health.is_dead() {
                return DamageOutcome::Damaged {
                    remaining: health.current,
                };
            }
            health.current = 0.0;
            element.position
        };

        let _ = self.world.insert_one(entity, Destroyed);
        log::info!("{:?} #{} destroyed in '{}'", kind, index, self.name);
        bus.publish(GameEvent::ArenaElementDestroyed { kind, index, position });
        DamageOutcome::Destroyed
    }

    /// Roll hazards and release adds from spawners that are off cadence and
    /// under their concurrent cap.
    pub fn update(&mut self, time: &Time, bus: &mut EventBus<GameEvent>) {
        let now = time.now();
        let dt = time.delta_seconds();

        for (_, (element, hazard, destroyed)) in
            self.world.query_mut::<(&ArenaElement, &HazardZone, Option<&Destroyed>)>()
        {
            if destroyed.is_some() {
                continue;
            }
            if self.rng.gen::<f32>() < hazard.chance_per_sec * dt {
                bus.publish(GameEvent::HazardTriggered {
                    index: element.index,
                    position: element.position,
                    damage: hazard.damage,
                    radius: hazard.radius,
                });
            }
        }

        for (_, (element, spawner, destroyed)) in
            self.world.query_mut::<(&ArenaElement, &mut SpawnerState, Option<&Destroyed>)>()
        {
            if destroyed.is_some() || spawner.active >= spawner.max_active {
                continue;
            }
            if now.duration_since(spawner.last_spawn) < spawner.interval {
                continue;
            }
            spawner.active += 1;
            spawner.last_spawn = now;
            bus.publish(GameEvent::SpawnerTriggered {
                index: element.index,
                position: element.position,
                enemy: spawner.enemy,
            });
        }
    }

    /// An add from spawner `index` died, freeing a concurrent slot.
    pub fn spawn_cleared(&mut self, index: usize) {
        let Some(&entity) = self.lookup.get(&(ElementKind::Spawner, index)) else {
            log::warn!("Arena '{}' has no spawner #{}", self.name, index);
            return;
        };
        if let Ok(mut spawner) = self.world.get::<&mut SpawnerState>(entity) {
            spawner.active = spawner.active.saturating_sub(1);
        }
    }

    /// Adds currently alive from spawner `index`.
    pub fn spawner_active(&self, index: usize) -> Option<u32> {
        let entity = *self.lookup.get(&(ElementKind::Spawner, index))?;
        self.world.get::<&SpawnerState>(entity).ok().map(|s| s.active)
    }

    pub fn element(&self, kind: ElementKind, index: usize) -> Option<ElementSnapshot> {
        let entity = *self.lookup.get(&(kind, index))?;
        let element = *self.world.get::<&ArenaElement>(entity).ok()?;
        let health = self.world.get::<&Health>(entity).ok().map(|h| *h);
        let destroyed = self.world.get::<&Destroyed>(entity).is_ok();
        Some(ElementSnapshot {
            kind: element.kind,
            index: element.index,
            position: element.position,
            health,
            destroyed,
        })
    }

    /// Every element, ordered by kind then index.
    pub fn elements(&self) -> Vec<ElementSnapshot> {
        let mut keys: Vec<_> = self.lookup.keys().copied().collect();
        keys.sort();
        keys.into_iter().filter_map(|(kind, index)| self.element(kind, index)).collect()
    }

    pub fn destroyed_count(&self) -> usize {
        self.elements().iter().filter(|e| e.destroyed).count()
    }
}
