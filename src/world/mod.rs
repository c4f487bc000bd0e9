pub mod events;
pub mod physics;
pub mod track_object;

// Re-export all event types for easier access
pub use events::*;
pub use physics::{ContactReport, PhysicsWorld, WorldRayHit};
pub use track_object::{SceneObject, TrackObject, TrackObjectRef};
