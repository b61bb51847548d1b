//! Arcade - headless driver for the gameplay meta-systems.
//!
//! Runs a scripted session (survival waves, a time attack run with a path
//! choice, and a final boss) on the fixed-step simulation clock and logs
//! what happened. Progress persists under the configured save directory.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_core::{BusEvent, RonFileStore};
use gameplay::boss::BossKind;
use gameplay::config::{config_path, GameConfig};
use gameplay::path_choice::{PathKind, PathOption};
use gameplay::survival::{EndReason, EnemyType, SurvivalState};
use gameplay::{EventKind, GameContext, GameEvent};
use glam::Vec3;

/// Upper bound on simulated time for any one scripted phase.
const PHASE_LIMIT: Duration = Duration::from_secs(600);

#[derive(Default)]
struct SessionLog {
    counts: BTreeMap<String, usize>,
}

impl SessionLog {
    fn record(&mut self, events: &[GameEvent]) {
        for event in events {
            *self.counts.entry(format!("{:?}", event.kind())).or_insert(0) += 1;
            match event {
                GameEvent::WaveStarted { wave, enemy_count, .. } => {
                    log::info!("Wave {} incoming: {} enemies", wave, enemy_count)
                }
                GameEvent::LevelCompleted { level, seconds, medal } => {
                    log::info!("Level {} done in {:.1}s ({:?})", level, seconds, medal)
                }
                GameEvent::BossPhaseChanged { boss, phase } => log::info!("{:?} now in {:?}", boss, phase),
                GameEvent::AchievementUnlocked { name, .. } => log::info!("Achievement: {}", name),
                _ => {}
            }
        }
    }
}

/// Tick until `done` holds or `limit` of simulated time has passed.
fn run_until(
    ctx: &mut GameContext,
    log: &mut SessionLog,
    limit: Duration,
    mut done: impl FnMut(&GameContext, &[GameEvent]) -> bool,
) -> bool {
    let dt = ctx.time.fixed_timestep();
    let deadline = ctx.now() + limit;
    while ctx.now() < deadline {
        let events = ctx.tick(dt);
        log.record(&events);
        if done(ctx, &events) {
            return true;
        }
    }
    false
}

fn run_survival(ctx: &mut GameContext, log: &mut SessionLog, waves: u32) {
    ctx.start_survival();
    while ctx.survival.current_wave() <= waves {
        let Some(remaining) = ctx.survival.wave().map(|w| w.remaining()) else {
            break;
        };
        for i in 0..remaining {
            if ctx.fire().is_err() && !ctx.weapon.is_reloading() {
                ctx.reload();
            }
            if i % 4 == 0 && ctx.dodge(Vec3::X).is_err() {
                log::debug!("Dodge not ready");
            }
            let enemy = if i % 5 == 4 { EnemyType::Fast } else { EnemyType::Basic };
            ctx.enemy_killed(enemy, 100, None);
            run_until(ctx, log, Duration::from_millis(300), |_, _| false);
        }
        if ctx.survival.current_wave() == waves {
            break;
        }
        // Rest period until the next wave begins.
        run_until(ctx, log, PHASE_LIMIT, |c, _| c.survival.state() == SurvivalState::WaveActive);
    }
    if let Some(result) = ctx.end_survival(EndReason::Quit) {
        log::info!(
            "Survival over at wave {}: {} kills, score {}",
            result.wave_reached,
            result.total_kills,
            result.score
        );
    }
}

fn run_time_attack(ctx: &mut GameContext, log: &mut SessionLog) {
    ctx.start_time_attack(1);
    run_until(ctx, log, Duration::from_secs(55), |_, _| false);
    ctx.complete_level();
    ctx.start_next_level();

    let options = vec![
        PathOption::new(PathKind::Left, "Flooded tunnels").with_modifiers(1.3, 1.5),
        PathOption::new(PathKind::Center, "Main road"),
        PathOption::new(PathKind::Right, "Rooftops").with_modifiers(0.8, 0.8),
    ];
    match ctx.open_path_choice(Vec3::new(0.0, 0.0, -40.0), options, Duration::from_secs(8), PathKind::Center) {
        Ok(_) => {
            run_until(ctx, log, Duration::from_secs(10), |_, events| {
                events.iter().any(|e| e.kind() == EventKind::PathChoiceResolved)
            });
        }
        Err(e) => log::warn!("Path choice rejected: {}", e),
    }

    ctx.time_attack
        .add_bonus(5.0, "secret found", ctx.time.now(), &mut ctx.bus);
    run_until(ctx, log, Duration::from_secs(100), |_, _| false);
    ctx.complete_level();
    if let Some(summary) = ctx.end_time_attack() {
        log::info!(
            "Time attack: {} levels in {:.1}s (gold {}, silver {}, bronze {}){}",
            summary.levels.len(),
            summary.total_seconds,
            summary.medals.gold,
            summary.medals.silver,
            summary.medals.bronze,
            if summary.new_personal_best { ", new personal best" } else { "" }
        );
    }
}

fn run_boss(ctx: &mut GameContext, log: &mut SessionLog) {
    ctx.start_boss(BossKind::Colossus, true);
    let deadline = ctx.now() + PHASE_LIMIT;
    while ctx.boss().is_some_and(|b| !b.is_defeated()) && ctx.now() < deadline {
        ctx.damage_boss(250.0);
        let telegraphed = run_until(ctx, log, Duration::from_millis(500), |_, events| {
            events.iter().any(|e| e.kind() == EventKind::BossAttackStarted)
        });
        if telegraphed {
            if let Err(e) = ctx.dodge(Vec3::NEG_X) {
                log::debug!("Could not dodge boss attack: {}", e);
            }
        }
    }
    let destroyed = ctx.boss().map_or(0, |b| b.arena().destroyed_count());
    log::info!("Boss fight over, arena elements destroyed: {}", destroyed);
    ctx.end_boss();
}

fn main() -> Result<()> {
    let path = config_path();
    let loaded = GameConfig::read(&path);
    let config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => GameConfig::default(),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter.as_str())).init();

    match loaded {
        Ok(Some(_)) => log::info!("Loaded config from {:?}", path),
        Ok(None) => log::info!("No config at {:?}, using defaults", path),
        Err(e) => log::warn!("{}, using defaults", e),
    }

    std::fs::create_dir_all(&config.save_dir)
        .with_context(|| format!("creating save directory {:?}", config.save_dir))?;
    let store = RonFileStore::new(&config.save_dir);

    log::info!("Starting arcade session at {} Hz", config.tick_rate_hz);
    let mut ctx = GameContext::new(config, &store);
    let mut session = SessionLog::default();

    run_survival(&mut ctx, &mut session, 3);
    run_time_attack(&mut ctx, &mut session);
    run_boss(&mut ctx, &mut session);

    if ctx.new_game_plus.is_unlocked() && ctx.start_new_game_plus() {
        let m = ctx.new_game_plus.multipliers();
        log::info!(
            "New Game+ cycle {}: enemy health x{:.2}, damage x{:.2}, rewards x{:.2}",
            ctx.new_game_plus.cycle(),
            m.enemy_health,
            m.enemy_damage,
            m.rewards
        );
    }

    let scores = ctx.survival.high_scores();
    log::info!(
        "Best survival wave {}, best score {} over {} runs",
        scores.best_wave,
        scores.best_score,
        scores.runs_played
    );
    let achievements = ctx.achievements.snapshot();
    log::info!("Achievements: {}/{}", achievements.unlocked, achievements.total);
    log::info!("Best combo this session: {}", ctx.combo.best());
    for (kind, count) in &session.counts {
        log::debug!("{:>24}: {}", kind, count);
    }
    Ok(())
}
