//! Timed branching-path choices.
//!
//! A choice goes `Inactive -> Active -> Resolved` and never back. While it is
//! active a timeout is pending in the scheduler. Whichever of player input or
//! timeout arrives first resolves the choice; the other then finds it no
//! longer active and does nothing.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use engine_core::{EventBus, Scheduler, TaskId, Time, Timestamp};
use glam::Vec3;
use thiserror::Error;

use crate::events::GameEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChoiceId(pub u32);

impl fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "choice#{}", self.0)
    }
}

/// Which branch an option leads down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathKind {
    Left,
    Center,
    Right,
    Upper,
    Lower,
    Secret,
}

impl PathKind {
    pub fn name(&self) -> &'static str {
        match self {
            PathKind::Left => "left",
            PathKind::Center => "center",
            PathKind::Right => "right",
            PathKind::Upper => "upper",
            PathKind::Lower => "lower",
            PathKind::Secret => "secret",
        }
    }
}

/// One selectable branch.
#[derive(Debug, Clone, PartialEq)]
pub struct PathOption {
    pub kind: PathKind,
    pub label: String,
    /// Enemy density multiplier on this branch.
    pub difficulty: f32,
    /// Score multiplier on this branch.
    pub reward: f32,
}

impl PathOption {
    pub fn new(kind: PathKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            difficulty: 1.0,
            reward: 1.0,
        }
    }

    pub fn with_modifiers(mut self, difficulty: f32, reward: f32) -> Self {
        self.difficulty = difficulty;
        self.reward = reward;
        self
    }
}

/// How a choice was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Player,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceStatus {
    Inactive,
    Active { started: Timestamp, timeout: TaskId },
    Resolved { selected: PathKind, resolution: Resolution, at: Timestamp },
}

#[derive(Debug, Clone)]
pub struct PathChoice {
    pub id: ChoiceId,
    pub position: Vec3,
    pub options: Vec<PathOption>,
    pub time_limit: Duration,
    pub auto_select: PathKind,
    pub status: ChoiceStatus,
}

impl PathChoice {
    pub fn option(&self, kind: PathKind) -> Option<&PathOption> {
        self.options.iter().find(|o| o.kind == kind)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ChoiceStatus::Active { .. })
    }

    pub fn selected(&self) -> Option<PathKind> {
        match self.status {
            ChoiceStatus::Resolved { selected, .. } => Some(selected),
            _ => None,
        }
    }
}

/// One settled choice, kept for analytics and branching narrative.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSelection {
    pub choice: ChoiceId,
    pub selected: PathKind,
    pub resolution: Resolution,
    pub at: Timestamp,
    /// Time the player spent deciding.
    pub decision_time: Duration,
}

/// What is wrong with a choice handed to `create_choice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationIssue {
    #[error("a path choice needs at least 2 options, got {0}")]
    TooFewOptions(usize),
    #[error("path option {0:?} is listed more than once")]
    DuplicateOption(PathKind),
    #[error("auto-select option {0:?} is not one of the offered options")]
    AutoSelectNotOffered(PathKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathChoiceError {
    #[error("invalid path choice: {0}")]
    InvalidConfiguration(#[from] ConfigurationIssue),
    #[error("no path choice with id {0}")]
    UnknownChoice(ChoiceId),
    #[error("{choice} does not offer {kind:?}")]
    UnknownOptionType { choice: ChoiceId, kind: PathKind },
}

#[derive(Default)]
pub struct PathSystem {
    choices: BTreeMap<ChoiceId, PathChoice>,
    next_id: u32,
    timeouts: Scheduler<ChoiceId>,
    history: Vec<PathSelection>,
}

impl PathSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_choice(
        &mut self,
        position: Vec3,
        options: Vec<PathOption>,
        time_limit: Duration,
        auto_select: PathKind,
    ) -> Result<ChoiceId, PathChoiceError> {
        if options.len() < 2 {
            return Err(ConfigurationIssue::TooFewOptions(options.len()).into());
        }
        for (i, opt) in options.iter().enumerate() {
            if options[..i].iter().any(|o| o.kind == opt.kind) {
                return Err(ConfigurationIssue::DuplicateOption(opt.kind).into());
            }
        }
        if !options.iter().any(|o| o.kind == auto_select) {
            return Err(ConfigurationIssue::AutoSelectNotOffered(auto_select).into());
        }

        let id = ChoiceId(self.next_id);
        self.next_id += 1;
        self.choices.insert(
            id,
            PathChoice {
                id,
                position,
                options,
                time_limit,
                auto_select,
                status: ChoiceStatus::Inactive,
            },
        );
        log::debug!("Created {} at {:?}", id, position);
        Ok(id)
    }

    /// Start the countdown. Does nothing if the choice is already active or
    /// already resolved.
    pub fn activate(
        &mut self,
        id: ChoiceId,
        now: Timestamp,
        bus: &mut EventBus<GameEvent>,
    ) -> Result<(), PathChoiceError> {
        let choice = self.choices.get_mut(&id).ok_or(PathChoiceError::UnknownChoice(id))?;
        if choice.status != ChoiceStatus::Inactive {
            log::debug!("{} already activated, ignoring", id);
            return Ok(());
        }

        let timeout = self.timeouts.schedule(now + choice.time_limit, id);
        choice.status = ChoiceStatus::Active { started: now, timeout };

        bus.publish(GameEvent::PathChoiceActivated {
            choice: id,
            options: choice.options.iter().map(|o| o.kind).collect(),
            time_limit_ms: choice.time_limit.as_millis() as u64,
        });
        Ok(())
    }

    /// Player picks a branch. Returns `Ok(false)` if the choice was not
    /// active, in which case nothing changes.
    pub fn resolve(
        &mut self,
        id: ChoiceId,
        kind: PathKind,
        now: Timestamp,
        bus: &mut EventBus<GameEvent>,
    ) -> Result<bool, PathChoiceError> {
        self.settle(id, kind, Resolution::Player, now, bus)
    }

    fn settle(
        &mut self,
        id: ChoiceId,
        kind: PathKind,
        resolution: Resolution,
        now: Timestamp,
        bus: &mut EventBus<GameEvent>,
    ) -> Result<bool, PathChoiceError> {
        let choice = self.choices.get_mut(&id).ok_or(PathChoiceError::UnknownChoice(id))?;
        let ChoiceStatus::Active { started, timeout } = choice.status else {
            return Ok(false);
        };
        if choice.option(kind).is_none() {
            return Err(PathChoiceError::UnknownOptionType { choice: id, kind });
        }

        self.timeouts.cancel(timeout);
        choice.status = ChoiceStatus::Resolved {
            selected: kind,
            resolution,
            at: now,
        };
        self.history.push(PathSelection {
            choice: id,
            selected: kind,
            resolution,
            at: now,
            decision_time: now.duration_since(started),
        });

        log::info!("{} resolved to {} ({:?})", id, kind.name(), resolution);
        bus.publish(GameEvent::PathChoiceResolved {
            choice: id,
            selected: kind,
            resolution,
        });
        Ok(true)
    }

    /// Resolve every choice whose countdown has expired to its auto-select
    /// option.
    pub fn update(&mut self, time: &Time, bus: &mut EventBus<GameEvent>) {
        let now = time.now();
        for id in self.timeouts.take_due(now) {
            let Some(auto) = self.choices.get(&id).map(|c| c.auto_select) else {
                continue;
            };
            if let Err(e) = self.settle(id, auto, Resolution::Timeout, now, bus) {
                log::warn!("Timed-out {} could not auto-resolve: {}", id, e);
            }
        }
    }

    /// Forget a choice on level exit, cancelling any pending countdown.
    pub fn remove_choice(&mut self, id: ChoiceId) -> Option<PathChoice> {
        let choice = self.choices.remove(&id)?;
        if let ChoiceStatus::Active { timeout, .. } = choice.status {
            self.timeouts.cancel(timeout);
        }
        Some(choice)
    }

    /// Drop every choice, e.g. when the level unloads. History is kept.
    pub fn clear(&mut self) {
        self.choices.clear();
        self.timeouts.clear();
    }

    pub fn choice(&self, id: ChoiceId) -> Option<&PathChoice> {
        self.choices.get(&id)
    }

    /// Countdown left on an active choice.
    pub fn remaining(&self, id: ChoiceId, now: Timestamp) -> Option<Duration> {
        let choice = self.choices.get(&id)?;
        match choice.status {
            ChoiceStatus::Active { started, .. } => {
                Some(choice.time_limit.saturating_sub(now.duration_since(started)))
            }
            _ => None,
        }
    }

    pub fn active_choices(&self) -> impl Iterator<Item = &PathChoice> {
        self.choices.values().filter(|c| c.is_active())
    }

    pub fn history(&self) -> &[PathSelection] {
        &self.history
    }

    /// How often each branch kind has been taken.
    pub fn selection_counts(&self) -> BTreeMap<PathKind, u32> {
        let mut counts = BTreeMap::new();
        for entry in &self.history {
            *counts.entry(entry.selected).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_way() -> Vec<PathOption> {
        vec![
            PathOption::new(PathKind::Left, "Canyon"),
            PathOption::new(PathKind::Center, "Highway"),
            PathOption::new(PathKind::Right, "Ridge").with_modifiers(1.5, 2.0),
        ]
    }

    fn resolved_events(bus: &mut EventBus<GameEvent>) -> usize {
        bus.drain()
            .iter()
            .filter(|e| matches!(e, GameEvent::PathChoiceResolved { .. }))
            .count()
    }

    #[test]
    fn fewer_than_two_options_is_rejected() {
        let mut paths = PathSystem::new();
        let err = paths
            .create_choice(
                Vec3::ZERO,
                vec![PathOption::new(PathKind::Left, "Only")],
                Duration::from_secs(5),
                PathKind::Left,
            )
            .unwrap_err();
        assert_eq!(
            err,
            PathChoiceError::InvalidConfiguration(ConfigurationIssue::TooFewOptions(1))
        );
    }

    #[test]
    fn auto_select_must_be_offered() {
        let mut paths = PathSystem::new();
        let err = paths
            .create_choice(Vec3::ZERO, three_way(), Duration::from_secs(5), PathKind::Secret)
            .unwrap_err();
        assert_eq!(
            err,
            PathChoiceError::InvalidConfiguration(ConfigurationIssue::AutoSelectNotOffered(PathKind::Secret))
        );
    }

    #[test]
    fn duplicate_options_are_invalid() {
        let mut paths = PathSystem::new();
        let options = vec![
            PathOption::new(PathKind::Left, "Caves"),
            PathOption::new(PathKind::Right, "Cliffs"),
            PathOption::new(PathKind::Left, "Caves again"),
        ];
        let err = paths
            .create_choice(Vec3::ZERO, options, Duration::from_secs(5), PathKind::Right)
            .unwrap_err();
        assert_eq!(
            err,
            PathChoiceError::InvalidConfiguration(ConfigurationIssue::DuplicateOption(PathKind::Left))
        );
        assert!(paths.history().is_empty());
    }

    #[test]
    fn timeout_auto_resolves_exactly_once() {
        let mut paths = PathSystem::new();
        let mut bus = EventBus::new();
        let mut time = Time::new();
        let id = paths
            .create_choice(Vec3::ZERO, three_way(), Duration::from_millis(8000), PathKind::Center)
            .unwrap();
        paths.activate(id, time.now(), &mut bus).unwrap();

        time.advance(Duration::from_millis(7999));
        paths.update(&time, &mut bus);
        assert!(paths.choice(id).unwrap().is_active());

        time.advance(Duration::from_millis(1));
        paths.update(&time, &mut bus);
        time.advance(Duration::from_millis(5000));
        paths.update(&time, &mut bus);

        assert_eq!(paths.choice(id).unwrap().selected(), Some(PathKind::Center));
        assert_eq!(resolved_events(&mut bus), 1);
        assert_eq!(paths.history()[0].resolution, Resolution::Timeout);
        assert_eq!(paths.history()[0].at, Timestamp::from_millis(8000));
    }

    #[test]
    fn player_resolution_cancels_timeout() {
        let mut paths = PathSystem::new();
        let mut bus = EventBus::new();
        let mut time = Time::new();
        let id = paths
            .create_choice(Vec3::ZERO, three_way(), Duration::from_secs(8), PathKind::Center)
            .unwrap();
        paths.activate(id, time.now(), &mut bus).unwrap();
        time.advance(Duration::from_secs(3));
        assert_eq!(paths.resolve(id, PathKind::Right, time.now(), &mut bus), Ok(true));

        time.advance(Duration::from_secs(10));
        paths.update(&time, &mut bus);

        assert_eq!(paths.choice(id).unwrap().selected(), Some(PathKind::Right));
        assert_eq!(paths.history().len(), 1);
        assert_eq!(paths.history()[0].decision_time, Duration::from_secs(3));
        assert_eq!(resolved_events(&mut bus), 1);
    }

    #[test]
    fn second_resolution_is_inert() {
        let mut paths = PathSystem::new();
        let mut bus = EventBus::new();
        let id = paths
            .create_choice(Vec3::ZERO, three_way(), Duration::from_secs(8), PathKind::Center)
            .unwrap();
        paths.activate(id, Timestamp::ZERO, &mut bus).unwrap();
        paths.resolve(id, PathKind::Left, Timestamp::from_millis(10), &mut bus).unwrap();
        bus.drain();

        assert_eq!(paths.resolve(id, PathKind::Right, Timestamp::from_millis(20), &mut bus), Ok(false));
        assert_eq!(paths.choice(id).unwrap().selected(), Some(PathKind::Left));
        assert_eq!(paths.history().len(), 1);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn unknown_option_leaves_choice_active() {
        let mut paths = PathSystem::new();
        let mut bus = EventBus::new();
        let id = paths
            .create_choice(Vec3::ZERO, three_way(), Duration::from_secs(8), PathKind::Center)
            .unwrap();
        paths.activate(id, Timestamp::ZERO, &mut bus).unwrap();
        assert_eq!(
            paths.resolve(id, PathKind::Upper, Timestamp::from_millis(5), &mut bus),
            Err(PathChoiceError::UnknownOptionType {
                choice: id,
                kind: PathKind::Upper
            })
        );
        assert!(paths.choice(id).unwrap().is_active());
        assert_eq!(paths.remaining(id, Timestamp::from_millis(5)), Some(Duration::from_millis(7995)));
    }

    #[test]
    fn resolving_inactive_choice_is_a_no_op() {
        let mut paths = PathSystem::new();
        let mut bus = EventBus::new();
        let id = paths
            .create_choice(Vec3::ZERO, three_way(), Duration::from_secs(8), PathKind::Center)
            .unwrap();
        assert_eq!(paths.resolve(id, PathKind::Left, Timestamp::ZERO, &mut bus), Ok(false));
        assert!(paths.history().is_empty());
    }

    #[test]
    fn activation_is_idempotent() {
        let mut paths = PathSystem::new();
        let mut bus = EventBus::new();
        let id = paths
            .create_choice(Vec3::ZERO, three_way(), Duration::from_secs(8), PathKind::Center)
            .unwrap();
        paths.activate(id, Timestamp::ZERO, &mut bus).unwrap();
        paths.activate(id, Timestamp::from_millis(4000), &mut bus).unwrap();
        assert_eq!(bus.drain().len(), 1);
        assert_eq!(paths.remaining(id, Timestamp::from_millis(4000)), Some(Duration::from_secs(4)));
    }

    #[test]
    fn removed_choice_never_times_out() {
        let mut paths = PathSystem::new();
        let mut bus = EventBus::new();
        let mut time = Time::new();
        let id = paths
            .create_choice(Vec3::ZERO, three_way(), Duration::from_secs(1), PathKind::Center)
            .unwrap();
        paths.activate(id, time.now(), &mut bus).unwrap();
        assert!(paths.remove_choice(id).is_some());
        time.advance(Duration::from_secs(2));
        paths.update(&time, &mut bus);
        assert!(paths.history().is_empty());
        assert_eq!(paths.activate(id, time.now(), &mut bus), Err(PathChoiceError::UnknownChoice(id)));
    }

    #[test]
    fn selection_counts_tally_history() {
        let mut paths = PathSystem::new();
        let mut bus = EventBus::new();
        for _ in 0..2 {
            let id = paths
                .create_choice(Vec3::ZERO, three_way(), Duration::from_secs(8), PathKind::Center)
                .unwrap();
            paths.activate(id, Timestamp::ZERO, &mut bus).unwrap();
            paths.resolve(id, PathKind::Left, Timestamp::ZERO, &mut bus).unwrap();
        }
        assert_eq!(paths.selection_counts().get(&PathKind::Left), Some(&2));
    }
}
