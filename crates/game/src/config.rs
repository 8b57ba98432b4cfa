use std::fs;
use std::io;
use std::path::Path;

use scene2d::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Demo tunables plus the embedded engine configuration. Every field has a
/// default, so a config file only needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub window_title: String,
    pub engine: EngineConfig,
    pub avatar_speed: f32,
    pub bullet_speed: f32,
    pub mob_speed: f32,
    pub bullet_damage: i32,
    pub bullet_angle_noise: f32,
    pub mob_life: i32,
    /// Minimum time between shots while the trigger is held.
    pub bullet_delay_ms: u64,
    pub initial_mobs: u32,
    pub max_alive_mobs: u32,
    pub mob_spawn_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_title: "scene2d demo".to_string(),
            engine: EngineConfig::default(),
            avatar_speed: 2.0,
            bullet_speed: 5.0,
            mob_speed: 1.0,
            bullet_damage: 34,
            bullet_angle_noise: 0.1,
            mob_life: 100,
            bullet_delay_ms: 100,
            initial_mobs: 20,
            max_alive_mobs: 30,
            mob_spawn_interval_ms: 1000,
        }
    }
}

/// Read the config file if present; fall back to defaults on a missing,
/// unreadable, or malformed file (with the failure logged, never fatal).
pub fn load_or_default(path: impl AsRef<Path>) -> GameConfig {
    let path = path.as_ref();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "config_missing_using_defaults");
            return GameConfig::default();
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "config_unreadable_using_defaults");
            return GameConfig::default();
        }
    };
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(config) => {
            info!(path = %path.display(), "config_loaded");
            config
        }
        Err(error) => {
            warn!(
                path = %path.display(),
                at = %error.path(),
                error = %error,
                "config_parse_failed_using_defaults"
            );
            GameConfig::default()
        }
    }
}
