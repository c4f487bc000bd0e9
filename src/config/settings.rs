use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const PHYSICS_CONFIG_FILE: &str = "physics.toml";

/// Overrides the per-user config directory when set
pub const CONFIG_DIR_ENV: &str = "TRACK_PHYSICS_CONFIG_DIR";

/// Errors raised while reading designer-facing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown shape type: {value}")]
    UnknownShape { value: String },

    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    #[error("Invalid value for attribute '{attribute}': {reason}")]
    InvalidAttribute { attribute: String, reason: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Physics Configuration
// =============================================================================

/// World-wide tuning shared by every physical object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity vector in m/s^2 (Y is up)
    pub gravity: [f32; 3],
    /// Fixed simulation tick length in seconds
    pub tick_length: f32,
    /// Impulse applied to explosive objects hit by an explosion
    pub explosion_impulse_objects: f32,
    /// A soccer ball touching a push-soccer surface gets normal * mass * this
    pub soccer_push_factor: f32,
    /// Angular damping of every object body, keeps cones from rolling forever
    pub angular_damping: f32,
    /// Apply the reset-when-too-low check to static and kinematic objects too
    pub reset_static_when_too_low: bool,
    /// Default hit points of destructible objects when the record gives none
    pub destructible_hit_points: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            tick_length: 1.0 / 120.0,
            explosion_impulse_objects: 500.0,
            soccer_push_factor: 5.0,
            angular_damping: 0.5,
            reset_static_when_too_low: false,
            destructible_hit_points: 3,
        }
    }
}

impl PhysicsConfig {
    pub fn from_toml_str(data: &str) -> ConfigResult<Self> {
        Ok(toml::from_str::<PhysicsConfig>(data)?)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let data = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&data)?;
        debug!("Loaded physics config from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

fn physics_config_path() -> Option<PathBuf> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir).join(PHYSICS_CONFIG_FILE));
    }
    ProjectDirs::from("com", "track-physics", "track-physics")
        .map(|proj| proj.config_dir().join(PHYSICS_CONFIG_FILE))
}

pub fn save_physics_config(config: &PhysicsConfig) -> ConfigResult<()> {
    if let Some(path) = physics_config_path() {
        config.save_to(&path)?;
    }
    Ok(())
}

/// Loads the user's physics config, falling back to defaults when it is
/// missing or unreadable
pub fn load_physics_config() -> PhysicsConfig {
    let Some(path) = physics_config_path() else {
        return PhysicsConfig::default();
    };
    if !path.exists() {
        return PhysicsConfig::default();
    }
    match PhysicsConfig::load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring unreadable physics config {}: {}", path.display(), e);
            PhysicsConfig::default()
        }
    }
}
