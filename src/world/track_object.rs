//! Scene-graph side of a physical object
//!
//! The physics layer reads the placement and geometry of a track object once,
//! then writes the simulated transform back every tick. Rendering itself lives
//! elsewhere; `SceneObject` is the plain implementation used by tools and tests.

use crate::assets::mesh::RenderMesh;
use crate::utils::math::BoundingBox;
use glam::{Quat, Vec3};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Shared handle to a track object. Physical objects only keep a weak reference.
pub type TrackObjectRef = Rc<RefCell<dyn TrackObject>>;

/// Interface of the scene-graph counterpart of a physical object
pub trait TrackObject {
    fn id(&self) -> &str;

    /// Absolute position of the object's origin
    fn position(&self) -> Vec3;

    fn rotation(&self) -> Quat;

    fn scale(&self) -> Vec3;

    /// Unscaled bounding box of the visual mesh in its local space
    fn bounding_box(&self) -> BoundingBox;

    /// Render geometry, needed for exact collision shapes
    fn render_mesh(&self) -> Option<Arc<RenderMesh>>;

    fn is_soccer_ball(&self) -> bool {
        false
    }

    /// Receives the simulated transform
    fn move_to(&mut self, position: Vec3, rotation: Quat, scale: Vec3);
}

/// Minimal scene node carrying a transform and optional render geometry
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub bounding_box: BoundingBox,
    pub mesh: Option<Arc<RenderMesh>>,
    pub soccer_ball: bool,
    /// Number of transforms received through `move_to`
    pub move_count: u64,
}

impl SceneObject {
    /// Object whose visual is a box of the given half extents around the origin
    pub fn new(id: impl Into<String>, half_extents: Vec3) -> Self {
        Self {
            id: id.into(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            bounding_box: BoundingBox::from_half_extents(half_extents),
            mesh: None,
            soccer_ball: false,
            move_count: 0,
        }
    }

    /// Object whose bounding box is taken from its render mesh
    pub fn with_mesh(id: impl Into<String>, mesh: Arc<RenderMesh>) -> Self {
        let mut object = Self::new(id, Vec3::ZERO);
        object.bounding_box = mesh.bounding_box();
        object.mesh = Some(mesh);
        object
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotated(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scaled(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn soccer_ball(mut self) -> Self {
        self.soccer_ball = true;
        self
    }

    pub fn into_shared(self) -> Rc<RefCell<SceneObject>> {
        Rc::new(RefCell::new(self))
    }
}

impl TrackObject for SceneObject {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn scale(&self) -> Vec3 {
        self.scale
    }

    fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    fn render_mesh(&self) -> Option<Arc<RenderMesh>> {
        self.mesh.clone()
    }

    fn is_soccer_ball(&self) -> bool {
        self.soccer_ball
    }

    fn move_to(&mut self, position: Vec3, rotation: Quat, scale: Vec3) {
        self.position = position;
        self.rotation = rotation;
        self.scale = scale;
        self.move_count += 1;
    }
}
