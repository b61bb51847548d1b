//! Endless survival mode: escalating waves with a rest between them.
//!
//! `Inactive -> WaveActive -> WaveCleared -> WaveActive -> ... -> Ended`.
//! A wave clears exactly when every spawned enemy is dead; the next wave
//! starts once the inter-wave delay has passed.

use std::time::Duration;

use engine_core::{load_or_default, save_record, EventBus, Store, Time, Timestamp};
use serde::{Deserialize, Serialize};

use crate::events::GameEvent;

pub const HIGH_SCORE_KEY: &str = "survival_high_scores";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    /// Rest between a cleared wave and the next one.
    pub inter_wave_delay_ms: u64,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            inter_wave_delay_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnemyType {
    Basic,
    Fast,
    Tank,
    Ranged,
    Elite,
}

/// Difficulty tier shown on the HUD, derived from the wave number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Difficulty {
    /// Waves 1-5
    Easy,
    /// Waves 6-10
    Medium,
    /// Waves 11-20
    Hard,
    /// Waves 21-30
    Extreme,
    /// Wave 31 onward
    Nightmare,
}

impl Difficulty {
    pub fn for_wave(wave: u32) -> Self {
        match wave {
            0..=5 => Difficulty::Easy,
            6..=10 => Difficulty::Medium,
            11..=20 => Difficulty::Hard,
            21..=30 => Difficulty::Extreme,
            _ => Difficulty::Nightmare,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
            Difficulty::Extreme => "EXTREME",
            Difficulty::Nightmare => "NIGHTMARE",
        }
    }
}

/// Everything a spawner needs to build one wave.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveConfig {
    pub wave: u32,
    pub enemy_count: u32,
    pub health_multiplier: f32,
    pub damage_multiplier: f32,
    pub speed_multiplier: f32,
    /// Spawn weights, summing to 1.
    pub enemy_mix: Vec<(EnemyType, f32)>,
    pub is_boss_wave: bool,
    pub is_elite_wave: bool,
}

impl WaveConfig {
    pub fn for_wave(wave: u32) -> Self {
        let wave = wave.max(1);
        let step = (wave - 1) as f32;
        Self {
            wave,
            enemy_count: enemy_count(wave),
            health_multiplier: 1.0 + step * 0.1,
            damage_multiplier: 1.0 + step * 0.05,
            speed_multiplier: (1.0 + step * 0.02).min(1.5),
            enemy_mix: enemy_mix(wave),
            is_boss_wave: is_boss_wave(wave),
            is_elite_wave: is_elite_wave(wave),
        }
    }

    /// Stack an outside scale (New Game+) on top of the per-wave ramp.
    pub fn scaled(mut self, scaling: EnemyScaling) -> Self {
        self.health_multiplier *= scaling.health;
        self.damage_multiplier *= scaling.damage;
        self
    }
}

/// Extra enemy stat scale applied to every wave of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyScaling {
    pub health: f32,
    pub damage: f32,
}

impl Default for EnemyScaling {
    fn default() -> Self {
        Self {
            health: 1.0,
            damage: 1.0,
        }
    }
}

pub fn enemy_count(wave: u32) -> u32 {
    5 + (wave as f32 * 1.5).floor() as u32
}

pub fn is_boss_wave(wave: u32) -> bool {
    wave > 0 && wave % 5 == 0
}

pub fn is_elite_wave(wave: u32) -> bool {
    wave > 0 && wave % 3 == 0
}

fn enemy_mix(wave: u32) -> Vec<(EnemyType, f32)> {
    use EnemyType::*;
    match wave {
        0..=5 => vec![(Basic, 1.0)],
        6..=10 => vec![(Basic, 0.7), (Fast, 0.3)],
        11..=15 => vec![(Basic, 0.5), (Fast, 0.3), (Tank, 0.2)],
        _ => vec![(Basic, 0.3), (Fast, 0.25), (Tank, 0.2), (Ranged, 0.15), (Elite, 0.1)],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    PlayerDied,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurvivalState {
    Inactive,
    WaveActive,
    WaveCleared { next_wave_at: Timestamp },
    Ended { reason: EndReason },
}

/// The wave currently being fought.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    pub config: WaveConfig,
    pub killed: u32,
    pub started: Timestamp,
}

impl Wave {
    pub fn remaining(&self) -> u32 {
        self.config.enemy_count - self.killed
    }
}

/// Persisted best results. Wave and score records update independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalHighScores {
    pub best_wave: u32,
    pub best_score: u64,
    pub best_kills: u32,
    pub runs_played: u32,
}

/// Final numbers of an ended run.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalResult {
    pub reason: EndReason,
    pub wave_reached: u32,
    pub total_kills: u32,
    pub score: u64,
    pub duration: Duration,
    pub new_best_wave: bool,
    pub new_best_score: bool,
}

/// Read-only view for HUD polling.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalSnapshot {
    pub state: SurvivalState,
    pub wave: u32,
    pub enemies_remaining: u32,
    pub total_kills: u32,
    pub score: u64,
    pub difficulty: Difficulty,
    /// Time left before the next wave, while resting.
    pub next_wave_in: Option<Duration>,
}

pub struct SurvivalModeSystem {
    config: SurvivalConfig,
    state: SurvivalState,
    wave: Option<Wave>,
    total_kills: u32,
    score: u64,
    run_started: Timestamp,
    scaling: EnemyScaling,
    high_scores: SurvivalHighScores,
    store: Box<dyn Store>,
}

impl SurvivalModeSystem {
    pub fn new(config: SurvivalConfig, store: Box<dyn Store>) -> Self {
        let high_scores = load_or_default(store.as_ref(), HIGH_SCORE_KEY);
        Self {
            config,
            state: SurvivalState::Inactive,
            wave: None,
            total_kills: 0,
            score: 0,
            run_started: Timestamp::ZERO,
            scaling: EnemyScaling::default(),
            high_scores,
            store,
        }
    }

    pub fn state(&self) -> SurvivalState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SurvivalState::WaveActive | SurvivalState::WaveCleared { .. })
    }

    /// Scale for waves started from now on.
    pub fn set_enemy_scaling(&mut self, scaling: EnemyScaling) {
        self.scaling = scaling;
    }

    pub fn enemy_scaling(&self) -> EnemyScaling {
        self.scaling
    }

    /// Reset counters and begin wave 1. Restarts a run in progress.
    pub fn start(&mut self, now: Timestamp, bus: &mut EventBus<GameEvent>) {
        self.total_kills = 0;
        self.score = 0;
        self.run_started = now;
        self.wave = None;
        log::info!("Survival run started");
        bus.publish(GameEvent::SurvivalStarted);
        self.start_wave(1, now, bus);
    }

    fn start_wave(&mut self, number: u32, now: Timestamp, bus: &mut EventBus<GameEvent>) {
        let config = WaveConfig::for_wave(number).scaled(self.scaling);
        log::debug!(
            "Wave {} ({}): {} enemies, boss={}, elite={}",
            number,
            Difficulty::for_wave(number).name(),
            config.enemy_count,
            config.is_boss_wave,
            config.is_elite_wave
        );
        bus.publish(GameEvent::WaveStarted {
            wave: number,
            enemy_count: config.enemy_count,
            is_boss_wave: config.is_boss_wave,
            is_elite_wave: config.is_elite_wave,
        });
        self.wave = Some(Wave {
            config,
            killed: 0,
            started: now,
        });
        self.state = SurvivalState::WaveActive;
    }

    /// Count a kill. Ignored unless a wave is being fought.
    pub fn register_kill(&mut self, score_value: u32, now: Timestamp, bus: &mut EventBus<GameEvent>) {
        if self.state != SurvivalState::WaveActive {
            return;
        }
        let Some(wave) = self.wave.as_mut() else {
            return;
        };

        wave.killed += 1;
        self.total_kills += 1;
        self.score += u64::from(score_value);

        if wave.killed >= wave.config.enemy_count {
            let number = wave.config.wave;
            let duration = now.duration_since(wave.started);
            self.state = SurvivalState::WaveCleared {
                next_wave_at: now + Duration::from_millis(self.config.inter_wave_delay_ms),
            };
            log::info!("Wave {} cleared in {:.1}s", number, duration.as_secs_f32());
            bus.publish(GameEvent::WaveComplete {
                wave: number,
                kills: self.total_kills,
                score: self.score,
                duration_ms: duration.as_millis() as u64,
            });
        }
    }

    /// Start the next wave once the rest period is over.
    pub fn update(&mut self, time: &Time, bus: &mut EventBus<GameEvent>) {
        let now = time.now();
        if let SurvivalState::WaveCleared { next_wave_at } = self.state {
            if now >= next_wave_at {
                let next = self.current_wave() + 1;
                self.start_wave(next, now, bus);
            }
        }
    }

    /// Finish the run and record any new bests. Returns `None` if no run was
    /// in progress.
    pub fn end(&mut self, reason: EndReason, now: Timestamp, bus: &mut EventBus<GameEvent>) -> Option<SurvivalResult> {
        if !self.is_running() {
            return None;
        }
        self.state = SurvivalState::Ended { reason };

        let wave_reached = self.current_wave();
        let new_best_wave = wave_reached > self.high_scores.best_wave;
        let new_best_score = self.score > self.high_scores.best_score;
        if new_best_wave {
            self.high_scores.best_wave = wave_reached;
        }
        if new_best_score {
            self.high_scores.best_score = self.score;
        }
        self.high_scores.best_kills = self.high_scores.best_kills.max(self.total_kills);
        self.high_scores.runs_played += 1;
        save_record(self.store.as_mut(), HIGH_SCORE_KEY, &self.high_scores);

        let result = SurvivalResult {
            reason,
            wave_reached,
            total_kills: self.total_kills,
            score: self.score,
            duration: now.duration_since(self.run_started),
            new_best_wave,
            new_best_score,
        };
        log::info!(
            "Survival ended ({:?}) at wave {} with {} points{}",
            reason,
            wave_reached,
            self.score,
            if new_best_wave || new_best_score { " - new record!" } else { "" }
        );
        bus.publish(GameEvent::SurvivalEnded {
            reason,
            wave: wave_reached,
            score: self.score,
            kills: self.total_kills,
            new_best_wave,
            new_best_score,
        });
        Some(result)
    }

    pub fn current_wave(&self) -> u32 {
        self.wave.as_ref().map_or(0, |w| w.config.wave)
    }

    pub fn wave(&self) -> Option<&Wave> {
        self.wave.as_ref()
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn high_scores(&self) -> &SurvivalHighScores {
        &self.high_scores
    }

    pub fn snapshot(&self, now: Timestamp) -> SurvivalSnapshot {
        let wave = self.current_wave();
        SurvivalSnapshot {
            state: self.state,
            wave,
            enemies_remaining: self.wave.as_ref().map_or(0, Wave::remaining),
            total_kills: self.total_kills,
            score: self.score,
            difficulty: Difficulty::for_wave(wave),
            next_wave_in: match self.state {
                SurvivalState::WaveCleared { next_wave_at } => Some(next_wave_at.duration_since(now)),
                _ => None,
            },
        }
    }
}
