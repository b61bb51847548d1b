//! Arcade shooter meta-systems: dodge, branching paths, survival waves, time
//! attack, boss fights, combos, achievements and New Game+, wired together
//! by [`GameContext`] over a typed event bus.

pub mod achievements;
pub mod boss;
pub mod combo;
pub mod config;
pub mod context;
pub mod dodge;
pub mod events;
pub mod new_game_plus;
pub mod path_choice;
pub mod survival;
pub mod time_attack;
pub mod weapons;

pub use config::GameConfig;
pub use context::GameContext;
pub use events::{EventKind, GameEvent};
