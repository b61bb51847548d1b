//! Core engine types shared by the gameplay meta-systems.
//!
//! This crate provides the foundational, game-agnostic pieces:
//! - Simulation time and cooldown timers
//! - Regenerating resources and health
//! - A typed publish/subscribe event bus and a deadline scheduler
//! - A key/value persistence port with memory and RON-file backends

pub mod components;
pub mod cooldown;
pub mod event_bus;
pub mod persistence;
pub mod scheduler;
pub mod time;

pub use components::*;
pub use cooldown::*;
pub use event_bus::{BusEvent, EventBus, SubscriptionId};
pub use persistence::{
    load_or_default, load_record, save_record, MemoryStore, PersistenceError, RonFileStore, Store,
};
pub use scheduler::{Scheduler, TaskId};
pub use time::*;

// Re-export commonly used types
pub use glam::Vec3;
pub use hecs::{Entity, World};
