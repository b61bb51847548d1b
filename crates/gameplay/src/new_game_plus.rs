//! New Game+: replay cycles with scaled enemy and reward stats.

use engine_core::{load_or_default, save_record, EventBus, Store};
use serde::{Deserialize, Serialize};

use crate::events::GameEvent;

pub const NEW_GAME_PLUS_KEY: &str = "new_game_plus";
pub const MAX_CYCLE: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewGamePlusState {
    /// 0 is the base game.
    pub cycle: u32,
    pub unlocked: bool,
    pub highest_cycle_completed: Option<u32>,
}

/// Stat scaling for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Multipliers {
    pub enemy_health: f32,
    pub enemy_damage: f32,
    pub rewards: f32,
}

impl Multipliers {
    pub fn for_cycle(cycle: u32) -> Self {
        let c = cycle.min(MAX_CYCLE) as f32;
        Self {
            enemy_health: 1.0 + 0.5 * c,
            enemy_damage: 1.0 + 0.25 * c,
            rewards: 1.0 + 0.25 * c,
        }
    }
}

pub struct NewGamePlusSystem {
    state: NewGamePlusState,
    store: Box<dyn Store>,
}

impl NewGamePlusSystem {
    pub fn new(store: Box<dyn Store>) -> Self {
        let mut state: NewGamePlusState = load_or_default(store.as_ref(), NEW_GAME_PLUS_KEY);
        state.cycle = state.cycle.min(MAX_CYCLE);
        Self { state, store }
    }

    fn save(&mut self) {
        save_record(self.store.as_mut(), NEW_GAME_PLUS_KEY, &self.state);
    }

    /// The final boss of the current cycle went down.
    pub fn complete_game(&mut self) {
        let cycle = self.state.cycle;
        self.state.unlocked = true;
        self.state.highest_cycle_completed = Some(self.state.highest_cycle_completed.map_or(cycle, |h| h.max(cycle)));
        log::info!("Game completed on cycle {}, New Game+ available", cycle);
        self.save();
    }

    /// Move to the next cycle. `false` while locked or at the cap.
    pub fn start_cycle(&mut self, bus: &mut EventBus<GameEvent>) -> bool {
        if !self.state.unlocked {
            log::warn!("New Game+ is locked");
            return false;
        }
        if self.state.cycle >= MAX_CYCLE {
            return false;
        }
        self.state.cycle += 1;
        log::info!("Starting New Game+ cycle {}", self.state.cycle);
        bus.publish(GameEvent::NewGamePlusStarted { cycle: self.state.cycle });
        self.save();
        true
    }

    /// Back to the base game. The unlock is kept.
    pub fn reset(&mut self) {
        self.state.cycle = 0;
        self.save();
    }

    pub fn cycle(&self) -> u32 {
        self.state.cycle
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.unlocked
    }

    pub fn multipliers(&self) -> Multipliers {
        Multipliers::for_cycle(self.state.cycle)
    }

    pub fn state(&self) -> &NewGamePlusState {
        &self.state
    }
}
