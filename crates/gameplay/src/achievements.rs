//! Achievements: stat counters checked against a static threshold table.
//!
//! Unlocks are monotonic. Once an id is in the unlocked set it stays there,
//! and its event fires only on the call that first crossed the threshold.

use std::collections::{BTreeMap, BTreeSet};

use engine_core::{load_or_default, save_record, EventBus, Store};
use serde::{Deserialize, Serialize};

use crate::events::GameEvent;

pub const ACHIEVEMENTS_KEY: &str = "achievements";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatKind {
    Kills,
    Dodges,
    BossesDefeated,
    LevelsCompleted,
    GoldMedals,
    PathsChosen,
    /// Best-of
    BestCombo,
    /// Best-of
    BestSurvivalWave,
    /// Best-of
    NewGamePlusCycle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub stat: StatKind,
    pub threshold: u64,
}

const fn def(id: &'static str, name: &'static str, description: &'static str, stat: StatKind, threshold: u64) -> AchievementDef {
    AchievementDef {
        id,
        name,
        description,
        stat,
        threshold,
    }
}

pub static ACHIEVEMENTS: &[AchievementDef] = &[
    def("first_blood", "First Blood", "Defeat your first enemy", StatKind::Kills, 1),
    def("exterminator", "Exterminator", "Defeat 100 enemies", StatKind::Kills, 100),
    def("massacre", "Massacre", "Defeat 1000 enemies", StatKind::Kills, 1000),
    def("nimble", "Nimble", "Dodge 50 times", StatKind::Dodges, 50),
    def("untouchable", "Untouchable", "Dodge 500 times", StatKind::Dodges, 500),
    def("giant_slayer", "Giant Slayer", "Defeat a boss", StatKind::BossesDefeated, 1),
    def("boss_hunter", "Boss Hunter", "Defeat 3 bosses", StatKind::BossesDefeated, 3),
    def("marathon", "Marathon", "Complete 25 time attack levels", StatKind::LevelsCompleted, 25),
    def("speed_demon", "Speed Demon", "Earn a gold medal", StatKind::GoldMedals, 1),
    def("golden", "Golden", "Earn 8 gold medals", StatKind::GoldMedals, 8),
    def("pathfinder", "Pathfinder", "Choose 10 branching paths", StatKind::PathsChosen, 10),
    def("combo_novice", "Combo Novice", "Reach a 10 hit combo", StatKind::BestCombo, 10),
    def("combo_master", "Combo Master", "Reach a 50 hit combo", StatKind::BestCombo, 50),
    def("wave_rider", "Wave Rider", "Reach survival wave 10", StatKind::BestSurvivalWave, 10),
    def("last_stand", "Last Stand", "Reach survival wave 30", StatKind::BestSurvivalWave, 30),
    def("cycle_breaker", "Cycle Breaker", "Start New Game+", StatKind::NewGamePlusCycle, 1),
];

pub fn find_achievement(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementProgress {
    pub stats: BTreeMap<StatKind, u64>,
    pub unlocked: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AchievementSnapshot {
    pub unlocked: usize,
    pub total: usize,
}

pub struct AchievementSystem {
    progress: AchievementProgress,
    store: Box<dyn Store>,
}

impl AchievementSystem {
    pub fn new(store: Box<dyn Store>) -> Self {
        let progress: AchievementProgress = load_or_default(store.as_ref(), ACHIEVEMENTS_KEY);
        log::debug!("Loaded {} unlocked achievements", progress.unlocked.len());
        Self { progress, store }
    }

    /// Increase a counter stat.
    pub fn add_stat(&mut self, stat: StatKind, amount: u64, bus: &mut EventBus<GameEvent>) -> Vec<&'static AchievementDef> {
        if amount == 0 {
            return Vec::new();
        }
        let value = self.progress.stats.entry(stat).or_insert(0);
        *value = value.saturating_add(amount);
        self.after_change(stat, bus)
    }

    /// Raise a best-of stat. Lower values are ignored.
    pub fn record_max(&mut self, stat: StatKind, value: u64, bus: &mut EventBus<GameEvent>) -> Vec<&'static AchievementDef> {
        let current = self.progress.stats.entry(stat).or_insert(0);
        if value <= *current {
            return Vec::new();
        }
        *current = value;
        self.after_change(stat, bus)
    }

    fn after_change(&mut self, stat: StatKind, bus: &mut EventBus<GameEvent>) -> Vec<&'static AchievementDef> {
        let value = self.stat(stat);
        let mut unlocked = Vec::new();
        for def in ACHIEVEMENTS.iter().filter(|a| a.stat == stat && value >= a.threshold) {
            if self.progress.unlocked.insert(def.id.to_string()) {
                log::info!("Achievement unlocked: {}", def.name);
                bus.publish(GameEvent::AchievementUnlocked {
                    id: def.id,
                    name: def.name,
                });
                unlocked.push(def);
            }
        }
        save_record(self.store.as_mut(), ACHIEVEMENTS_KEY, &self.progress);
        unlocked
    }

    pub fn stat(&self, stat: StatKind) -> u64 {
        self.progress.stats.get(&stat).copied().unwrap_or(0)
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.progress.unlocked.contains(id)
    }

    pub fn unlocked(&self) -> impl Iterator<Item = &str> {
        self.progress.unlocked.iter().map(String::as_str)
    }

    /// Progress toward `id` in `0..=1`. `None` for an unknown id.
    pub fn progress(&self, id: &str) -> Option<f32> {
        let Some(def) = find_achievement(id) else {
            log::warn!("Unknown achievement '{}'", id);
            return None;
        };
        if self.is_unlocked(id) || def.threshold == 0 {
            return Some(1.0);
        }
        Some((self.stat(def.stat) as f32 / def.threshold as f32).min(1.0))
    }

    pub fn snapshot(&self) -> AchievementSnapshot {
        AchievementSnapshot {
            unlocked: self.progress.unlocked.len(),
            total: ACHIEVEMENTS.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::MemoryStore;

    fn unlock_events(bus: &mut EventBus<GameEvent>) -> Vec<&'static str> {
        bus.drain()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::AchievementUnlocked { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn ids_are_unique() {
        let ids: BTreeSet<_> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn unlocks_once_when_threshold_crossed() {
        let mut achievements = AchievementSystem::new(Box::new(MemoryStore::new()));
        let mut bus = EventBus::new();

        achievements.add_stat(StatKind::Kills, 1, &mut bus);
        achievements.add_stat(StatKind::Kills, 1, &mut bus);
        assert_eq!(unlock_events(&mut bus), vec!["first_blood"]);

        achievements.add_stat(StatKind::Kills, 200, &mut bus);
        assert_eq!(unlock_events(&mut bus), vec!["exterminator"]);
        assert_eq!(achievements.stat(StatKind::Kills), 202);
    }

    #[test]
    fn unlocked_set_never_shrinks() {
        let mut achievements = AchievementSystem::new(Box::new(MemoryStore::new()));
        let mut bus = EventBus::new();
        let mut last = 0;
        for (stat, value) in [
            (StatKind::BestCombo, 12),
            (StatKind::BestCombo, 3),
            (StatKind::Dodges, 60),
            (StatKind::BestCombo, 0),
            (StatKind::Kills, 1),
        ] {
            achievements.record_max(stat, value, &mut bus);
            let now = achievements.snapshot().unlocked;
            assert!(now >= last);
            last = now;
        }
        assert_eq!(achievements.stat(StatKind::BestCombo), 12);
        assert!(achievements.is_unlocked("combo_novice"));
    }

    #[test]
    fn progress_survives_reload() {
        let store = MemoryStore::new();
        let mut bus = EventBus::new();
        {
            let mut achievements = AchievementSystem::new(Box::new(store.clone()));
            achievements.add_stat(StatKind::BossesDefeated, 1, &mut bus);
            achievements.add_stat(StatKind::Dodges, 25, &mut bus);
        }
        let reloaded = AchievementSystem::new(Box::new(store));
        assert!(reloaded.is_unlocked("giant_slayer"));
        assert_eq!(reloaded.progress("nimble"), Some(0.5));
        assert_eq!(reloaded.progress("no_such_thing"), None);
    }

    #[test]
    fn storage_failure_keeps_state_in_memory() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let mut achievements = AchievementSystem::new(Box::new(store));
        let mut bus = EventBus::new();
        achievements.add_stat(StatKind::Kills, 1, &mut bus);
        assert!(achievements.is_unlocked("first_blood"));
    }
}
