//! Time attack: a run clock across consecutive levels with medals, penalties,
//! bonuses and persisted personal bests.

use std::collections::BTreeMap;
use std::time::Duration;

use engine_core::{load_or_default, save_record, EventBus, Store, Timestamp};
use serde::{Deserialize, Serialize};

use crate::events::GameEvent;

pub const RECORDS_KEY: &str = "time_attack_records";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
    None,
}

/// Medal thresholds for one level, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParTimes {
    pub gold: f64,
    pub silver: f64,
    pub bronze: f64,
}

impl ParTimes {
    /// Strictest threshold first; the first one met wins.
    pub fn medal_for(&self, seconds: f64) -> Medal {
        if seconds <= self.gold {
            Medal::Gold
        } else if seconds <= self.silver {
            Medal::Silver
        } else if seconds <= self.bronze {
            Medal::Bronze
        } else {
            Medal::None
        }
    }
}

/// Static per-level par table.
const PAR_TABLE: [ParTimes; 8] = [
    ParTimes { gold: 60.0, silver: 75.0, bronze: 90.0 },
    ParTimes { gold: 90.0, silver: 110.0, bronze: 130.0 },
    ParTimes { gold: 120.0, silver: 150.0, bronze: 180.0 },
    ParTimes { gold: 150.0, silver: 180.0, bronze: 210.0 },
    ParTimes { gold: 180.0, silver: 220.0, bronze: 260.0 },
    ParTimes { gold: 200.0, silver: 240.0, bronze: 290.0 },
    ParTimes { gold: 240.0, silver: 290.0, bronze: 340.0 },
    ParTimes { gold: 300.0, silver: 360.0, bronze: 420.0 },
];

/// Par times for a 1-based level number. Levels past the table have none.
pub fn par_times(level: u32) -> Option<ParTimes> {
    let idx = usize::try_from(level.checked_sub(1)?).ok()?;
    PAR_TABLE.get(idx).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentKind {
    Penalty,
    Bonus,
}

/// A timestamped change to the run clock.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAdjustment {
    pub kind: AdjustmentKind,
    pub seconds: f64,
    pub reason: String,
    pub at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelResult {
    pub level: u32,
    pub seconds: f64,
    pub medal: Medal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MedalTally {
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
    pub none: u32,
}

impl MedalTally {
    fn count(&mut self, medal: Medal) {
        match medal {
            Medal::Gold => self.gold += 1,
            Medal::Silver => self.silver += 1,
            Medal::Bronze => self.bronze += 1,
            Medal::None => self.none += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub levels: Vec<LevelResult>,
    pub raw_seconds: f64,
    pub penalty_seconds: f64,
    pub bonus_seconds: f64,
    /// `raw + penalties - bonuses`, never below zero.
    pub total_seconds: f64,
    pub medals: MedalTally,
    pub new_personal_best: bool,
}

/// Persisted bests: fastest adjusted run time keyed by levels completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeAttackRecords {
    pub best_times: BTreeMap<u32, f64>,
    pub runs_completed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAttackState {
    Inactive,
    Running { level: u32 },
    LevelComplete { level: u32 },
    Ended,
}

/// Read-only view for HUD polling.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAttackSnapshot {
    pub state: TimeAttackState,
    pub level_seconds: f64,
    pub total_seconds: f64,
    pub par: Option<ParTimes>,
    pub levels_completed: u32,
}

pub struct TimeAttackSystem {
    state: TimeAttackState,
    run_started: Timestamp,
    level_started: Timestamp,
    results: Vec<LevelResult>,
    adjustments: Vec<TimeAdjustment>,
    records: TimeAttackRecords,
    store: Box<dyn Store>,
}

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}

impl TimeAttackSystem {
    pub fn new(store: Box<dyn Store>) -> Self {
        let records = load_or_default(store.as_ref(), RECORDS_KEY);
        Self {
            state: TimeAttackState::Inactive,
            run_started: Timestamp::ZERO,
            level_started: Timestamp::ZERO,
            results: Vec::new(),
            adjustments: Vec::new(),
            records,
            store,
        }
    }

    pub fn state(&self) -> TimeAttackState {
        self.state
    }

    fn run_in_progress(&self) -> bool {
        matches!(
            self.state,
            TimeAttackState::Running { .. } | TimeAttackState::LevelComplete { .. }
        )
    }

    /// Begin a fresh run at `level`.
    pub fn start(&mut self, level: u32, now: Timestamp, bus: &mut EventBus<GameEvent>) {
        let level = level.max(1);
        self.results.clear();
        self.adjustments.clear();
        self.run_started = now;
        self.level_started = now;
        self.state = TimeAttackState::Running { level };
        log::info!("Time attack started at level {}", level);
        bus.publish(GameEvent::TimeAttackStarted { level });
    }

    /// Stop the level clock and grade the level. `None` unless a level is
    /// being played.
    pub fn complete_level(&mut self, now: Timestamp, bus: &mut EventBus<GameEvent>) -> Option<LevelResult> {
        let TimeAttackState::Running { level } = self.state else {
            return None;
        };
        let seconds = secs(now.duration_since(self.level_started));
        let medal = par_times(level).map_or(Medal::None, |par| par.medal_for(seconds));
        let result = LevelResult { level, seconds, medal };
        self.results.push(result);
        self.state = TimeAttackState::LevelComplete { level };

        log::info!("Level {} done in {:.2}s ({:?})", level, seconds, medal);
        bus.publish(GameEvent::LevelCompleted { level, seconds, medal });
        Some(result)
    }

    /// Move on after a completed level and restart the level clock.
    pub fn start_next_level(&mut self, now: Timestamp, bus: &mut EventBus<GameEvent>) -> bool {
        let TimeAttackState::LevelComplete { level } = self.state else {
            return false;
        };
        let next = level + 1;
        self.level_started = now;
        self.state = TimeAttackState::Running { level: next };
        bus.publish(GameEvent::LevelStarted { level: next });
        true
    }

    pub fn add_penalty(&mut self, seconds: f64, reason: impl Into<String>, now: Timestamp, bus: &mut EventBus<GameEvent>) -> bool {
        self.adjust(AdjustmentKind::Penalty, seconds, reason.into(), now, bus)
    }

    pub fn add_bonus(&mut self, seconds: f64, reason: impl Into<String>, now: Timestamp, bus: &mut EventBus<GameEvent>) -> bool {
        self.adjust(AdjustmentKind::Bonus, seconds, reason.into(), now, bus)
    }

    fn adjust(
        &mut self,
        kind: AdjustmentKind,
        seconds: f64,
        reason: String,
        now: Timestamp,
        bus: &mut EventBus<GameEvent>,
    ) -> bool {
        if !self.run_in_progress() || !seconds.is_finite() || seconds < 0.0 {
            return false;
        }
        bus.publish(GameEvent::TimeAdjusted {
            kind,
            seconds,
            reason: reason.clone(),
        });
        self.adjustments.push(TimeAdjustment {
            kind,
            seconds,
            reason,
            at: now,
        });
        true
    }

    fn adjustment_total(&self, kind: AdjustmentKind) -> f64 {
        self.adjustments.iter().filter(|a| a.kind == kind).map(|a| a.seconds).sum()
    }

    fn adjusted_total(&self, now: Timestamp) -> f64 {
        let raw = secs(now.duration_since(self.run_started));
        (raw + self.adjustment_total(AdjustmentKind::Penalty) - self.adjustment_total(AdjustmentKind::Bonus)).max(0.0)
    }

    /// Close the run, tally medals, and store a personal best if this run
    /// beat the record for its level count.
    pub fn end(&mut self, now: Timestamp, bus: &mut EventBus<GameEvent>) -> Option<RunSummary> {
        if !self.run_in_progress() {
            return None;
        }
        self.state = TimeAttackState::Ended;

        let raw_seconds = secs(now.duration_since(self.run_started));
        let penalty_seconds = self.adjustment_total(AdjustmentKind::Penalty);
        let bonus_seconds = self.adjustment_total(AdjustmentKind::Bonus);
        let total_seconds = (raw_seconds + penalty_seconds - bonus_seconds).max(0.0);

        let mut medals = MedalTally::default();
        for r in &self.results {
            medals.count(r.medal);
        }

        let levels_completed = self.results.len() as u32;
        let mut new_personal_best = false;
        if levels_completed > 0 {
            let best = self.records.best_times.get(&levels_completed).copied();
            if best.is_none_or(|b| total_seconds < b) {
                self.records.best_times.insert(levels_completed, total_seconds);
                new_personal_best = true;
                log::info!("New personal best for {} levels: {:.2}s", levels_completed, total_seconds);
            }
            self.records.runs_completed += 1;
            save_record(self.store.as_mut(), RECORDS_KEY, &self.records);
        }

        bus.publish(GameEvent::TimeAttackEnded {
            levels_completed,
            total_seconds,
            new_personal_best,
        });

        Some(RunSummary {
            levels: self.results.clone(),
            raw_seconds,
            penalty_seconds,
            bonus_seconds,
            total_seconds,
            medals,
            new_personal_best,
        })
    }

    pub fn results(&self) -> &[LevelResult] {
        &self.results
    }

    pub fn adjustments(&self) -> &[TimeAdjustment] {
        &self.adjustments
    }

    pub fn personal_best(&self, levels: u32) -> Option<f64> {
        self.records.best_times.get(&levels).copied()
    }

    pub fn records(&self) -> &TimeAttackRecords {
        &self.records
    }

    pub fn snapshot(&self, now: Timestamp) -> TimeAttackSnapshot {
        let (level_seconds, par) = match self.state {
            TimeAttackState::Running { level } => (secs(now.duration_since(self.level_started)), par_times(level)),
            TimeAttackState::LevelComplete { level } => (
                self.results.last().map_or(0.0, |r| r.seconds),
                par_times(level),
            ),
            _ => (0.0, None),
        };
        TimeAttackSnapshot {
            state: self.state,
            level_seconds,
            total_seconds: if self.run_in_progress() { self.adjusted_total(now) } else { 0.0 },
            par,
            levels_completed: self.results.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::MemoryStore;

    fn at(secs: f32) -> Timestamp {
        Timestamp::from_secs_f32(secs)
    }

    #[test]
    fn medal_thresholds_first_match_wins() {
        let par = ParTimes { gold: 120.0, silver: 150.0, bronze: 180.0 };
        assert_eq!(par.medal_for(145.0), Medal::Silver);
        assert_eq!(par.medal_for(119.0), Medal::Gold);
        assert_eq!(par.medal_for(200.0), Medal::None);
        assert_eq!(par.medal_for(180.0), Medal::Bronze);
    }

    #[test]
    fn par_table_lookup() {
        assert_eq!(par_times(0), None);
        assert_eq!(par_times(3).map(|p| p.silver), Some(150.0));
        assert_eq!(par_times(9), None);
    }

    #[test]
    fn run_with_levels_penalties_and_bonuses() {
        let mut ta = TimeAttackSystem::new(Box::new(MemoryStore::new()));
        let mut bus = EventBus::new();
        ta.start(3, at(0.0), &mut bus);
        let first = ta.complete_level(at(145.0), &mut bus).unwrap();
        assert_eq!(first.medal, Medal::Silver);
        assert!(ta.start_next_level(at(150.0), &mut bus));
        assert!(ta.add_penalty(10.0, "hit by hazard", at(160.0), &mut bus));
        assert!(ta.add_bonus(4.0, "secret found", at(170.0), &mut bus));
        let second = ta.complete_level(at(240.0), &mut bus).unwrap();
        assert_eq!(second.level, 4);
        assert!((second.seconds - 90.0).abs() < 1e-3);
        assert_eq!(second.medal, Medal::Gold);

        let summary = ta.end(at(240.0), &mut bus).unwrap();
        assert!((summary.total_seconds - 246.0).abs() < 1e-3);
        assert_eq!(summary.medals, MedalTally { gold: 1, silver: 1, bronze: 0, none: 0 });
        assert!(summary.new_personal_best);
    }

    #[test]
    fn total_never_goes_negative() {
        let mut ta = TimeAttackSystem::new(Box::new(MemoryStore::new()));
        let mut bus = EventBus::new();
        ta.start(1, at(0.0), &mut bus);
        ta.add_bonus(500.0, "cheat", at(1.0), &mut bus);
        ta.complete_level(at(10.0), &mut bus);
        assert_eq!(ta.snapshot(at(10.0)).total_seconds, 0.0);
        assert_eq!(ta.end(at(10.0), &mut bus).unwrap().total_seconds, 0.0);
    }

    #[test]
    fn personal_best_only_replaced_by_faster_run() {
        let store = MemoryStore::new();
        let mut bus = EventBus::new();

        let mut ta = TimeAttackSystem::new(Box::new(store.clone()));
        ta.start(1, at(0.0), &mut bus);
        ta.complete_level(at(70.0), &mut bus);
        assert!(ta.end(at(70.0), &mut bus).unwrap().new_personal_best);

        let mut ta = TimeAttackSystem::new(Box::new(store.clone()));
        assert!((ta.personal_best(1).unwrap() - 70.0).abs() < 1e-3);
        ta.start(1, at(0.0), &mut bus);
        ta.complete_level(at(70.0), &mut bus);
        assert!(!ta.end(at(70.0), &mut bus).unwrap().new_personal_best);

        ta.start(1, at(100.0), &mut bus);
        ta.complete_level(at(160.0), &mut bus);
        assert!(ta.end(at(160.0), &mut bus).unwrap().new_personal_best);

        let reloaded = TimeAttackSystem::new(Box::new(store));
        assert!((reloaded.personal_best(1).unwrap() - 60.0).abs() < 1e-3);
        assert_eq!(reloaded.records().runs_completed, 3);
    }

    #[test]
    fn actions_outside_a_run_are_ignored() {
        let mut ta = TimeAttackSystem::new(Box::new(MemoryStore::new()));
        let mut bus = EventBus::new();
        assert!(ta.complete_level(at(1.0), &mut bus).is_none());
        assert!(!ta.start_next_level(at(1.0), &mut bus));
        assert!(!ta.add_penalty(5.0, "late", at(1.0), &mut bus));
        assert!(ta.end(at(1.0), &mut bus).is_none());
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn level_must_be_completed_before_advancing() {
        let mut ta = TimeAttackSystem::new(Box::new(MemoryStore::new()));
        let mut bus = EventBus::new();
        ta.start(1, at(0.0), &mut bus);
        assert!(!ta.start_next_level(at(5.0), &mut bus));
        ta.complete_level(at(5.0), &mut bus);
        assert!(ta.complete_level(at(6.0), &mut bus).is_none());
        assert_eq!(ta.results().len(), 1);
    }

    #[test]
    fn empty_run_is_not_recorded() {
        let store = MemoryStore::new();
        let mut ta = TimeAttackSystem::new(Box::new(store.clone()));
        let mut bus = EventBus::new();
        ta.start(1, at(0.0), &mut bus);
        let summary = ta.end(at(30.0), &mut bus).unwrap();
        assert!(!summary.new_personal_best);
        assert!(store.get(RECORDS_KEY).is_none());
    }
}
