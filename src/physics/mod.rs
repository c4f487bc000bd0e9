//! Physical objects of a track
//!
//! Bridges designer-declared track objects with the rigid-body simulation:
//! shape derivation, body lifecycle, per-tick transform sync, too-low
//! recovery and collision-driven reactions.

pub mod body_type;
pub mod manager;
pub mod object_settings;
pub mod physical_object;
pub mod reaction;
pub mod shape;
pub mod triangle_mesh;
pub mod user_pointer;

// Re-export main types for convenience
pub use body_type::{Axis, BodyType};
pub use manager::{PhysicalObjectManager, SceneRayHit};
pub use object_settings::ObjectSettings;
pub use physical_object::{InteractionFlags, ObjectState, PhysicalObject, RayHit};
pub use reaction::{ObjectReaction, ReactionContext, ReactionEffect, ReactionKind};
pub use shape::{CollisionShape, ShapeFactory};
pub use triangle_mesh::TriangleMesh;
pub use user_pointer::{ObjectId, UserPointer, UserPointerKind};

// Error types
use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Object '{id}' has an exact shape but no mesh data")]
    MissingMeshData { id: String },

    #[error("Invalid collision mesh '{name}': {reason}")]
    InvalidMesh { name: String, reason: String },

    #[error("Track object of '{id}' no longer exists")]
    TrackObjectGone { id: String },

    #[error("Unknown physical object: {id}")]
    UnknownObject { id: ObjectId },
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;

impl From<roxmltree::Error> for PhysicsError {
    fn from(err: roxmltree::Error) -> Self {
        PhysicsError::Config(ConfigError::Xml(err))
    }
}
