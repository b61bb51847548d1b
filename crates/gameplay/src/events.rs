//! Everything the gameplay managers announce on the bus.

use engine_core::BusEvent;
use glam::Vec3;

use crate::boss::{AttackKind, BossKind, BossPhase, ElementKind};
use crate::path_choice::{ChoiceId, PathKind, Resolution};
use crate::survival::{EndReason, EnemyType};
use crate::time_attack::{AdjustmentKind, Medal};
use crate::weapons::WeaponKind;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A dodge roll began. `direction` is normalised.
    DodgeStarted {
        direction: Vec3,
        distance: f32,
        duration_ms: u64,
    },
    DodgeEnded,

    /// A branch choice started its countdown.
    PathChoiceActivated {
        choice: ChoiceId,
        options: Vec<PathKind>,
        time_limit_ms: u64,
    },
    PathChoiceResolved {
        choice: ChoiceId,
        selected: PathKind,
        resolution: Resolution,
    },

    SurvivalStarted,
    WaveStarted {
        wave: u32,
        enemy_count: u32,
        is_boss_wave: bool,
        is_elite_wave: bool,
    },
    /// Every enemy of the wave is dead. `kills` and `score` are run totals.
    WaveComplete {
        wave: u32,
        kills: u32,
        score: u64,
        duration_ms: u64,
    },
    SurvivalEnded {
        reason: EndReason,
        wave: u32,
        score: u64,
        kills: u32,
        new_best_wave: bool,
        new_best_score: bool,
    },

    TimeAttackStarted {
        level: u32,
    },
    LevelCompleted {
        level: u32,
        seconds: f64,
        medal: Medal,
    },
    LevelStarted {
        level: u32,
    },
    TimeAdjusted {
        kind: AdjustmentKind,
        seconds: f64,
        reason: String,
    },
    TimeAttackEnded {
        levels_completed: u32,
        total_seconds: f64,
        new_personal_best: bool,
    },

    ArenaElementDestroyed {
        kind: ElementKind,
        index: usize,
        position: Vec3,
    },
    HazardTriggered {
        index: usize,
        position: Vec3,
        damage: f32,
        radius: f32,
    },
    SpawnerTriggered {
        index: usize,
        position: Vec3,
        enemy: EnemyType,
    },
    BossPhaseChanged {
        boss: BossKind,
        phase: BossPhase,
    },
    BossAttackStarted {
        attack: AttackKind,
        origin: Vec3,
        telegraph_ms: u64,
    },
    /// Damage resolution point of an attack. Nobody tracks whether it landed.
    BossAttackHit {
        attack: AttackKind,
        damage: f32,
        radius: Option<f32>,
        origin: Vec3,
    },
    BossAttackFinished {
        attack: AttackKind,
    },
    BossDefeated {
        boss: BossKind,
    },

    /// Raised by combat code. `spawner` is set for adds released by an
    /// arena spawner.
    EnemyKilled {
        enemy: EnemyType,
        score: u32,
        spawner: Option<usize>,
    },
    ComboChanged {
        count: u32,
        multiplier: f32,
    },
    ComboBroken {
        final_count: u32,
    },
    AchievementUnlocked {
        id: &'static str,
        name: &'static str,
    },
    NewGamePlusStarted {
        cycle: u32,
    },
    WeaponFired {
        weapon: WeaponKind,
        pellets: u32,
    },
    WeaponReloaded {
        weapon: WeaponKind,
    },
}

/// Payload-free mirror of [`GameEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DodgeStarted,
    DodgeEnded,
    PathChoiceActivated,
    PathChoiceResolved,
    SurvivalStarted,
    WaveStarted,
    WaveComplete,
    SurvivalEnded,
    TimeAttackStarted,
    LevelCompleted,
    LevelStarted,
    TimeAdjusted,
    TimeAttackEnded,
    ArenaElementDestroyed,
    HazardTriggered,
    SpawnerTriggered,
    BossPhaseChanged,
    BossAttackStarted,
    BossAttackHit,
    BossAttackFinished,
    BossDefeated,
    EnemyKilled,
    ComboChanged,
    ComboBroken,
    AchievementUnlocked,
    NewGamePlusStarted,
    WeaponFired,
    WeaponReloaded,
}

impl BusEvent for GameEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            GameEvent::DodgeStarted { .. } => EventKind::DodgeStarted,
            GameEvent::DodgeEnded => EventKind::DodgeEnded,
            GameEvent::PathChoiceActivated { .. } => EventKind::PathChoiceActivated,
            GameEvent::PathChoiceResolved { .. } => EventKind::PathChoiceResolved,
            GameEvent::SurvivalStarted => EventKind::SurvivalStarted,
            GameEvent::WaveStarted { .. } => EventKind::WaveStarted,
            GameEvent::WaveComplete { .. } => EventKind::WaveComplete,
            GameEvent::SurvivalEnded { .. } => EventKind::SurvivalEnded,
            GameEvent::TimeAttackStarted { .. } => EventKind::TimeAttackStarted,
            GameEvent::LevelCompleted { .. } => EventKind::LevelCompleted,
            GameEvent::LevelStarted { .. } => EventKind::LevelStarted,
            GameEvent::TimeAdjusted { .. } => EventKind::TimeAdjusted,
            GameEvent::TimeAttackEnded { .. } => EventKind::TimeAttackEnded,
            GameEvent::ArenaElementDestroyed { .. } => EventKind::ArenaElementDestroyed,
            GameEvent::HazardTriggered { .. } => EventKind::HazardTriggered,
            GameEvent::SpawnerTriggered { .. } => EventKind::SpawnerTriggered,
            GameEvent::BossPhaseChanged { .. } => EventKind::BossPhaseChanged,
            GameEvent::BossAttackStarted { .. } => EventKind::BossAttackStarted,
            GameEvent::BossAttackHit { .. } => EventKind::BossAttackHit,
            GameEvent::BossAttackFinished { .. } => EventKind::BossAttackFinished,
            GameEvent::BossDefeated { .. } => EventKind::BossDefeated,
            GameEvent::EnemyKilled { .. } => EventKind::EnemyKilled,
            GameEvent::ComboChanged { .. } => EventKind::ComboChanged,
            GameEvent::ComboBroken { .. } => EventKind::ComboBroken,
            GameEvent::AchievementUnlocked { .. } => EventKind::AchievementUnlocked,
            GameEvent::NewGamePlusStarted { .. } => EventKind::NewGamePlusStarted,
            GameEvent::WeaponFired { .. } => EventKind::WeaponFired,
            GameEvent::WeaponReloaded { .. } => EventKind::WeaponReloaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::EventBus;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribers_only_see_their_kind() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(EventKind::ComboBroken, move |e: &GameEvent| sink.borrow_mut().push(e.clone()));

        bus.publish(GameEvent::ComboChanged {
            count: 3,
            multiplier: 1.0,
        });
        bus.publish(GameEvent::ComboBroken { final_count: 3 });

        assert_eq!(*seen.borrow(), vec![GameEvent::ComboBroken { final_count: 3 }]);
        assert_eq!(bus.pending_len(), 2);
    }
}
