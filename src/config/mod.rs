pub mod settings;

// Re-export commonly used types
pub use settings::{
    ConfigError, ConfigResult, PhysicsConfig,
    load_physics_config, save_physics_config, CONFIG_DIR_ENV,
};
