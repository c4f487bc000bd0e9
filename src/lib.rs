// Track physics: physical objects of a kart racing track
// Shapes from a few attributes, bodies kept in sync with the scene

pub mod utils;
pub mod config;
pub mod assets;
pub mod world;
pub mod physics;

// Re-export commonly used types for convenience
pub use config::{load_physics_config, ConfigError, PhysicsConfig};
pub use physics::{
    BodyType, ObjectId, ObjectSettings, PhysicalObject, PhysicalObjectManager, PhysicsError, PhysicsResult,
};
pub use world::{PhysicsEvent, PhysicsWorld, SceneObject, TrackObject, TrackObjectRef};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
