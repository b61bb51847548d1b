//! Game configuration (save location, logging, loop rate, tuning). Loaded
//! from config.ron at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::boss::BossAttackConfig;
use crate::combo::ComboConfig;
use crate::dodge::DodgeConfig;
use crate::survival::SurvivalConfig;

pub const CONFIG_FILE: &str = "config.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Persistent game settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Directory holding one `<key>.ron` file per persisted record.
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    /// Default `env_logger` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Fixed simulation rate.
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: f64,
    /// Seed for arena hazards and boss attack rolls. Random when unset.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub dodge: DodgeConfig,
    #[serde(default)]
    pub survival: SurvivalConfig,
    #[serde(default)]
    pub combo: ComboConfig,
    #[serde(default)]
    pub boss: BossAttackConfig,
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("saves")
}
fn default_log_filter() -> String {
    "info".to_string()
}
fn default_tick_rate() -> f64 {
    60.0
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
            log_filter: default_log_filter(),
            tick_rate_hz: default_tick_rate(),
            rng_seed: None,
            dodge: DodgeConfig::default(),
            survival: SurvivalConfig::default(),
            combo: ComboConfig::default(),
            boss: BossAttackConfig::default(),
        }
    }
}

impl GameConfig {
    /// Read a config file. `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&data).map(Some).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from `path`. If the file is missing or invalid, returns default config.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                log::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save current config to `path`. Logs on error.
    pub fn save(&self, path: &Path) {
        match ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            Ok(s) => {
                if let Err(e) = std::fs::write(path, s) {
                    log::warn!("Could not write config to {:?}: {}", path, e);
                }
            }
            Err(e) => log::warn!("Could not serialize config: {}", e),
        }
    }
}

/// `config.ron` in the current directory.
pub fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: GameConfig = ron::from_str("(tick_rate_hz: 30.0, combo: (window_ms: 1500))").unwrap();
        assert_eq!(config.tick_rate_hz, 30.0);
        assert_eq!(config.combo.window_ms, 1500);
        assert_eq!(config.save_dir, PathBuf::from("saves"));
        assert_eq!(config.dodge, DodgeConfig::default());
        assert_eq!(config.boss.cooldown_ms, 6000);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("arcade_config_that_does_not_exist.ron");
        assert!(matches!(GameConfig::read(&path), Ok(None)));
        assert_eq!(GameConfig::load(&path), GameConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("arcade_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);

        let mut config = GameConfig::default();
        config.rng_seed = Some(77);
        config.survival.inter_wave_delay_ms = 2500;
        config.save(&path);
        assert_eq!(GameConfig::load(&path), config);

        std::fs::write(&path, "(tick_rate_hz: \"fast\")").unwrap();
        assert!(matches!(GameConfig::read(&path), Err(ConfigError::Parse { .. })));
        std::fs::remove_dir_all(&dir).ok();
    }
}
