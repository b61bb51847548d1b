//! Top-level game context. Owns the clock, the event bus, and exactly one
//! instance of every gameplay manager, and is the only place that routes
//! events from one manager into another.

use std::time::Duration;

use engine_core::{EventBus, Store, Time, Timestamp};
use glam::Vec3;

use crate::achievements::{AchievementSystem, StatKind};
use crate::boss::{BossEncounter, BossKind};
use crate::combo::ComboSystem;
use crate::config::GameConfig;
use crate::dodge::{DodgeError, DodgeMotion, DodgeSystem};
use crate::events::GameEvent;
use crate::new_game_plus::NewGamePlusSystem;
use crate::path_choice::{ChoiceId, PathChoiceError, PathKind, PathOption, PathSystem};
use crate::survival::{EndReason, EnemyScaling, EnemyType, SurvivalModeSystem, SurvivalResult};
use crate::time_attack::{LevelResult, Medal, RunSummary, TimeAttackSystem};
use crate::weapons::{FireError, Shot, Weapon, WeaponKind};

/// Routing passes per frame before the rest of the queue is left for the
/// next frame.
const MAX_ROUTING_PASSES: usize = 16;

pub struct GameContext {
    pub config: GameConfig,
    pub time: Time,
    pub bus: EventBus<GameEvent>,
    pub dodge: DodgeSystem,
    pub paths: PathSystem,
    pub survival: SurvivalModeSystem,
    pub time_attack: TimeAttackSystem,
    pub combo: ComboSystem,
    pub achievements: AchievementSystem,
    pub new_game_plus: NewGamePlusSystem,
    pub weapon: Weapon,
    boss: Option<BossEncounter>,
    /// Beating this boss completes the game.
    final_boss: bool,
    encounters_started: u64,
    /// Events routed since the last `tick` returned.
    frame_events: Vec<GameEvent>,
}

impl GameContext {
    /// Build every manager. Each one gets its own handle on `store`.
    pub fn new<S: Store + Clone + 'static>(config: GameConfig, store: &S) -> Self {
        let mut time = Time::new();
        time.set_fixed_rate(config.tick_rate_hz);
        Self {
            dodge: DodgeSystem::new(config.dodge.clone()),
            paths: PathSystem::new(),
            survival: SurvivalModeSystem::new(config.survival.clone(), Box::new(store.clone())),
            time_attack: TimeAttackSystem::new(Box::new(store.clone())),
            combo: ComboSystem::new(&config.combo),
            achievements: AchievementSystem::new(Box::new(store.clone())),
            new_game_plus: NewGamePlusSystem::new(Box::new(store.clone())),
            weapon: Weapon::new(WeaponKind::AssaultRifle),
            boss: None,
            final_boss: false,
            encounters_started: 0,
            frame_events: Vec::new(),
            time,
            bus: EventBus::new(),
            config,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.time.now()
    }

    /// Advance one frame: update every manager, then route what they
    /// published. Returns everything routed since the previous tick.
    pub fn tick(&mut self, dt: Duration) -> Vec<GameEvent> {
        self.time.advance(dt);
        let now = self.time.now();

        self.dodge.update(&self.time, &mut self.bus);
        self.paths.update(&self.time, &mut self.bus);
        self.survival.update(&self.time, &mut self.bus);
        self.combo.update(now, &mut self.bus);
        self.weapon.update(now, &mut self.bus);
        if let Some(boss) = self.boss.as_mut() {
            boss.update(&self.time, &mut self.bus);
        }

        self.route();
        std::mem::take(&mut self.frame_events)
    }

    /// Deliver queued events to the managers that react to them, until the
    /// queue is empty.
    pub fn route(&mut self) {
        for _ in 0..MAX_ROUTING_PASSES {
            let events = self.bus.drain();
            if events.is_empty() {
                return;
            }
            for event in events {
                self.handle(&event);
                self.frame_events.push(event);
            }
        }
        log::warn!("Event routing did not settle, {} events deferred", self.bus.pending_len());
    }

    fn handle(&mut self, event: &GameEvent) {
        let now = self.time.now();
        match *event {
            GameEvent::EnemyKilled { score, spawner, .. } => {
                self.combo.register_hit(now, &mut self.bus);
                let scaled = score as f32 * self.combo.multiplier() * self.new_game_plus.multipliers().rewards;
                self.survival.register_kill(scaled.round() as u32, now, &mut self.bus);
                self.achievements.add_stat(StatKind::Kills, 1, &mut self.bus);
                if let (Some(index), Some(boss)) = (spawner, self.boss.as_mut()) {
                    boss.arena_mut().spawn_cleared(index);
                }
            }
            GameEvent::DodgeStarted { .. } => {
                self.achievements.add_stat(StatKind::Dodges, 1, &mut self.bus);
            }
            GameEvent::PathChoiceResolved { .. } => {
                self.achievements.add_stat(StatKind::PathsChosen, 1, &mut self.bus);
            }
            GameEvent::WaveComplete { wave, .. } => {
                self.achievements.record_max(StatKind::BestSurvivalWave, wave as u64, &mut self.bus);
            }
            GameEvent::LevelCompleted { medal, .. } => {
                self.achievements.add_stat(StatKind::LevelsCompleted, 1, &mut self.bus);
                if medal == Medal::Gold {
                    self.achievements.add_stat(StatKind::GoldMedals, 1, &mut self.bus);
                }
            }
            GameEvent::ComboChanged { count, .. } => {
                self.achievements.record_max(StatKind::BestCombo, count as u64, &mut self.bus);
            }
            GameEvent::BossDefeated { .. } => {
                self.achievements.add_stat(StatKind::BossesDefeated, 1, &mut self.bus);
                if self.final_boss {
                    self.new_game_plus.complete_game();
                }
            }
            GameEvent::NewGamePlusStarted { cycle } => {
                self.achievements.record_max(StatKind::NewGamePlusCycle, cycle as u64, &mut self.bus);
            }
            GameEvent::SurvivalEnded { .. } => {
                self.combo.reset(&mut self.bus);
            }
            _ => {}
        }
    }

    // ── Commands ────────────────────────────────────────────────────────

    pub fn dodge(&mut self, direction: Vec3) -> Result<DodgeMotion, DodgeError> {
        let result = self.dodge.try_dodge(direction, self.time.now(), &mut self.bus);
        self.route();
        result
    }

    pub fn fire(&mut self) -> Result<Shot, FireError> {
        let result = self.weapon.try_fire(self.time.now(), &mut self.bus);
        self.route();
        result
    }

    pub fn reload(&mut self) -> bool {
        self.weapon.start_reload(self.time.now())
    }

    pub fn equip(&mut self, kind: WeaponKind) {
        self.weapon = Weapon::new(kind);
    }

    /// Combat code reports a kill.
    pub fn enemy_killed(&mut self, enemy: EnemyType, score: u32, spawner: Option<usize>) {
        self.bus.publish(GameEvent::EnemyKilled { enemy, score, spawner });
        self.route();
    }

    /// Begin a survival run with enemies scaled for the current NG+ cycle.
    pub fn start_survival(&mut self) {
        let m = self.new_game_plus.multipliers();
        self.survival.set_enemy_scaling(EnemyScaling {
            health: m.enemy_health,
            damage: m.enemy_damage,
        });
        self.survival.start(self.time.now(), &mut self.bus);
        self.route();
    }

    pub fn end_survival(&mut self, reason: EndReason) -> Option<SurvivalResult> {
        let result = self.survival.end(reason, self.time.now(), &mut self.bus);
        self.route();
        result
    }

    pub fn start_time_attack(&mut self, level: u32) {
        self.time_attack.start(level, self.time.now(), &mut self.bus);
        self.route();
    }

    pub fn complete_level(&mut self) -> Option<LevelResult> {
        let result = self.time_attack.complete_level(self.time.now(), &mut self.bus);
        self.route();
        result
    }

    pub fn start_next_level(&mut self) -> bool {
        let started = self.time_attack.start_next_level(self.time.now(), &mut self.bus);
        self.route();
        started
    }

    pub fn end_time_attack(&mut self) -> Option<RunSummary> {
        let summary = self.time_attack.end(self.time.now(), &mut self.bus);
        self.route();
        summary
    }

    /// Create a branch choice and start its countdown straight away.
    pub fn open_path_choice(
        &mut self,
        position: Vec3,
        options: Vec<PathOption>,
        time_limit: Duration,
        auto_select: PathKind,
    ) -> Result<ChoiceId, PathChoiceError> {
        let id = self.paths.create_choice(position, options, time_limit, auto_select)?;
        self.paths.activate(id, self.time.now(), &mut self.bus)?;
        self.route();
        Ok(id)
    }

    pub fn choose_path(&mut self, id: ChoiceId, kind: PathKind) -> Result<bool, PathChoiceError> {
        let resolved = self.paths.resolve(id, kind, self.time.now(), &mut self.bus);
        self.route();
        resolved
    }

    /// Start a boss fight. `final_boss` marks the fight that completes the
    /// game and unlocks New Game+.
    pub fn start_boss(&mut self, kind: BossKind, final_boss: bool) {
        let now = self.time.now();
        self.encounters_started += 1;
        let encounter = match self.config.rng_seed {
            Some(seed) => BossEncounter::with_seed(
                kind,
                &self.config.boss,
                now,
                seed.wrapping_add(self.encounters_started),
                &mut self.bus,
            ),
            None => BossEncounter::new(kind, &self.config.boss, now, &mut self.bus),
        };
        self.boss = Some(encounter.scaled(self.new_game_plus.multipliers().enemy_health));
        self.final_boss = final_boss;
        self.route();
    }

    pub fn damage_boss(&mut self, amount: f32) {
        if let Some(boss) = self.boss.as_mut() {
            boss.damage_boss(amount, &mut self.bus);
        }
        self.route();
    }

    pub fn boss(&self) -> Option<&BossEncounter> {
        self.boss.as_ref()
    }

    /// Leave the arena.
    pub fn end_boss(&mut self) -> Option<BossEncounter> {
        self.final_boss = false;
        self.boss.take()
    }

    pub fn start_new_game_plus(&mut self) -> bool {
        let started = self.new_game_plus.start_cycle(&mut self.bus);
        self.route();
        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survival::enemy_count;
    use engine_core::MemoryStore;

    fn context() -> (GameContext, MemoryStore) {
        let store = MemoryStore::new();
        let config = GameConfig {
            rng_seed: Some(5),
            ..GameConfig::default()
        };
        (GameContext::new(config, &store), store)
    }

    #[test]
    fn kills_feed_survival_combo_and_achievements() {
        let (mut ctx, _) = context();
        ctx.start_survival();
        for _ in 0..3 {
            ctx.enemy_killed(EnemyType::Basic, 10, None);
        }
        assert_eq!(ctx.survival.wave().map(|w| w.killed), Some(3));
        assert_eq!(ctx.combo.count(), 3);
        assert_eq!(ctx.survival.score(), 30);
        assert_eq!(ctx.achievements.stat(StatKind::Kills), 3);
        assert!(ctx.achievements.is_unlocked("first_blood"));
        assert_eq!(ctx.achievements.stat(StatKind::BestCombo), 3);
    }

    #[test]
    fn clearing_a_wave_records_best_wave() {
        let (mut ctx, _) = context();
        ctx.start_survival();
        for _ in 0..enemy_count(1) {
            ctx.enemy_killed(EnemyType::Basic, 1, None);
        }
        let events = ctx.tick(Duration::from_millis(16));
        assert!(events.iter().any(|e| matches!(e, GameEvent::WaveComplete { wave: 1, .. })));
        assert_eq!(ctx.achievements.stat(StatKind::BestSurvivalWave), 1);
    }

    #[test]
    fn dodge_counts_toward_achievements() {
        let (mut ctx, _) = context();
        assert!(ctx.dodge(Vec3::X).is_ok());
        assert!(ctx.dodge(Vec3::X).is_err());
        assert_eq!(ctx.achievements.stat(StatKind::Dodges), 1);
    }

    #[test]
    fn final_boss_unlocks_new_game_plus() {
        let (mut ctx, store) = context();
        ctx.start_boss(BossKind::Colossus, true);
        ctx.damage_boss(1_000_000.0);
        assert!(ctx.boss().is_some_and(|b| b.is_defeated()));
        assert!(ctx.new_game_plus.is_unlocked());
        assert!(ctx.achievements.is_unlocked("giant_slayer"));

        assert!(ctx.start_new_game_plus());
        assert!(ctx.achievements.is_unlocked("cycle_breaker"));

        // A fresh session sees the unlock.
        let ctx = GameContext::new(GameConfig::default(), &store);
        assert_eq!(ctx.new_game_plus.cycle(), 1);
    }

    #[test]
    fn new_game_plus_scales_survival_waves() {
        let (mut ctx, _) = context();
        ctx.start_boss(BossKind::Warden, true);
        ctx.damage_boss(1_000_000.0);
        ctx.end_boss();
        assert!(ctx.start_new_game_plus());

        ctx.start_survival();
        let wave = ctx.survival.wave().map(|w| w.config.clone()).unwrap();
        assert!((wave.health_multiplier - 1.5).abs() < 1e-5);
        assert!((wave.damage_multiplier - 1.25).abs() < 1e-5);
        assert!((wave.speed_multiplier - 1.0).abs() < 1e-5);
        assert_eq!(wave.enemy_count, enemy_count(1));
    }

    #[test]
    fn path_timeout_surfaces_in_tick_events() {
        let (mut ctx, _) = context();
        ctx.open_path_choice(
            Vec3::ZERO,
            vec![PathOption::new(PathKind::Left, "Caves"), PathOption::new(PathKind::Center, "Bridge")],
            Duration::from_millis(100),
            PathKind::Center,
        )
        .unwrap();
        ctx.tick(Duration::from_millis(50));
        let events = ctx.tick(Duration::from_millis(50));
        let resolved = events
            .iter()
            .filter(|e| matches!(e, GameEvent::PathChoiceResolved { selected: PathKind::Center, .. }))
            .count();
        assert_eq!(resolved, 1);
        assert_eq!(ctx.achievements.stat(StatKind::PathsChosen), 1);
    }

    #[test]
    fn gold_medal_levels_feed_achievements() {
        let (mut ctx, _) = context();
        ctx.start_time_attack(1);
        ctx.tick(Duration::from_secs(30));
        let result = ctx.complete_level().unwrap();
        assert_eq!(result.medal, Medal::Gold);
        assert!(ctx.achievements.is_unlocked("speed_demon"));
        assert_eq!(ctx.achievements.stat(StatKind::LevelsCompleted), 1);
        assert!(ctx.end_time_attack().is_some());
    }

    #[test]
    fn spawner_adds_free_their_slot_when_killed() {
        let (mut ctx, _) = context();
        ctx.start_boss(BossKind::HiveQueen, false);
        for _ in 0..(8000 / 16 + 1) {
            ctx.tick(Duration::from_millis(16));
        }
        let active = ctx.boss().and_then(|b| b.arena().spawner_active(0));
        assert_eq!(active, Some(1));
        ctx.enemy_killed(EnemyType::Fast, 5, Some(0));
        assert_eq!(ctx.boss().and_then(|b| b.arena().spawner_active(0)), Some(0));
    }
}
