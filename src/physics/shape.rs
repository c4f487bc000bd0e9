//! Collision shape derivation
//!
//! Turns a body type plus a radius and the (scaled) bounding box of the
//! visual mesh into an engine shape, its pose inside the body, and the
//! principal inertia used for dynamic bodies.

use crate::physics::body_type::{Axis, BodyType};
use crate::physics::triangle_mesh::TriangleMesh;
use crate::utils::math::{to_isometry, BoundingBox};
use glam::{Quat, Vec3};
use rapier3d::prelude::{Isometry, Real, SharedShape};
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use tracing::{debug, warn};

/// A shape ready to be attached to a rigid body
#[derive(Clone)]
pub struct CollisionShape {
    pub shape: SharedShape,
    /// Pose of the shape relative to the body origin
    pub local_pose: Isometry<Real>,
    pub body_type: BodyType,
    /// Effective radius of cones, cylinders and spheres, 0 otherwise
    pub radius: f32,
    /// Half the height of cones and cylinders, 0 otherwise
    pub half_height: f32,
    /// Size of the shape's bounding box in body space
    pub extent: Vec3,
    /// Body origin to visual origin, in body space
    pub graphical_offset: Vec3,
    pub triangle_mesh: Option<Arc<TriangleMesh>>,
}

impl std::fmt::Debug for CollisionShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionShape")
            .field("body_type", &self.body_type)
            .field("radius", &self.radius)
            .field("half_height", &self.half_height)
            .field("extent", &self.extent)
            .field("graphical_offset", &self.graphical_offset)
            .finish_non_exhaustive()
    }
}

impl CollisionShape {
    /// Principal moments of inertia in body space for a body of `mass`
    pub fn local_inertia(&self, mass: f32) -> Vec3 {
        if mass <= 0.0 {
            return Vec3::ZERO;
        }
        match self.body_type {
            BodyType::Sphere => Vec3::splat(0.4 * mass * self.radius * self.radius),
            BodyType::Cylinder(axis) => {
                let r2 = self.radius * self.radius;
                let h = 2.0 * self.half_height;
                along_axis(axis, 0.5 * mass * r2, mass * (3.0 * r2 + h * h) / 12.0)
            }
            BodyType::Cone(axis) => {
                let r2 = self.radius * self.radius;
                let h = 2.0 * self.half_height;
                along_axis(
                    axis,
                    0.3 * mass * r2,
                    mass * (3.0 * r2 / 20.0 + 3.0 * h * h / 80.0),
                )
            }
            // Exact meshes use their bounding box
            BodyType::Box | BodyType::None | BodyType::Exact => {
                let l2 = self.extent * self.extent;
                Vec3::new(l2.y + l2.z, l2.x + l2.z, l2.x + l2.y) * (mass / 12.0)
            }
        }
    }

    /// Radius of a sphere around the body origin enclosing the shape
    pub fn bounding_radius(&self) -> f32 {
        match self.body_type {
            BodyType::Sphere => self.radius,
            BodyType::Cone(_) | BodyType::Cylinder(_) => self.radius.hypot(self.half_height),
            BodyType::Exact => match &self.triangle_mesh {
                Some(mesh) => {
                    let bbox = mesh.bounding_box();
                    bbox.min.abs().max(bbox.max.abs()).length()
                }
                None => (0.5 * self.extent).length(),
            },
            BodyType::Box | BodyType::None => (0.5 * self.extent).length(),
        }
    }
}

/// `axis_value` on the primitive axis, `other` on the two remaining ones
fn along_axis(axis: Axis, axis_value: f32, other: f32) -> Vec3 {
    let mut v = Vec3::splat(other);
    v[axis.index()] = axis_value;
    v
}

/// Rotation taking the Y-aligned engine primitive onto `axis`
fn axis_rotation(axis: Axis) -> Quat {
    match axis {
        Axis::X => Quat::from_rotation_z(-FRAC_PI_2),
        Axis::Y => Quat::IDENTITY,
        Axis::Z => Quat::from_rotation_x(FRAC_PI_2),
    }
}

/// Height along `axis` and the two perpendicular extents
fn split_extent(extent: Vec3, axis: Axis) -> (f32, f32, f32) {
    match axis {
        Axis::X => (extent.x, extent.y, extent.z),
        Axis::Y => (extent.y, extent.x, extent.z),
        Axis::Z => (extent.z, extent.x, extent.y),
    }
}

pub struct ShapeFactory;

impl ShapeFactory {
    /// Builds the shape for `body_type`.
    ///
    /// `bounds` is the scaled bounding box of the visual mesh in object space;
    /// primitives are centred on it. A `radius` <= 0 is derived from the
    /// bounds, which only approximates the mesh. Exact shapes need `mesh`
    /// with its collision shape created, `None` is returned otherwise.
    pub fn build(
        body_type: BodyType,
        radius: f32,
        bounds: &BoundingBox,
        mesh: Option<Arc<TriangleMesh>>,
    ) -> Option<CollisionShape> {
        let extent = bounds.extent();
        let centre = bounds.center();

        let (shape, local_rotation, radius, half_height) = match body_type {
            BodyType::Cone(axis) | BodyType::Cylinder(axis) => {
                let (height, a, b) = split_extent(extent, axis);
                let radius = if radius > 0.0 {
                    radius
                } else {
                    auto_radius(body_type, 0.5 * a.hypot(b))
                };
                let half_height = 0.5 * height;
                let shape = if matches!(body_type, BodyType::Cone(_)) {
                    SharedShape::cone(half_height, radius)
                } else {
                    SharedShape::cylinder(half_height, radius)
                };
                (shape, axis_rotation(axis), radius, half_height)
            }
            BodyType::Sphere => {
                let radius = if radius > 0.0 {
                    radius
                } else {
                    auto_radius(body_type, 0.5 * extent.max_element())
                };
                (SharedShape::ball(radius), Quat::IDENTITY, radius, 0.0)
            }
            BodyType::Box | BodyType::None => {
                if body_type == BodyType::None {
                    warn!("Physical object without a shape, using a box");
                }
                let half = 0.5 * extent;
                (SharedShape::cuboid(half.x, half.y, half.z), Quat::IDENTITY, 0.0, 0.0)
            }
            BodyType::Exact => return Self::build_exact(mesh?),
        };

        Some(CollisionShape {
            shape,
            local_pose: to_isometry(Vec3::ZERO, local_rotation),
            body_type: if body_type == BodyType::None { BodyType::Box } else { body_type },
            radius,
            half_height,
            extent: extent_in_body_space(body_type, extent, radius, half_height),
            graphical_offset: -centre,
            triangle_mesh: None,
        })
    }

    /// Exact shape of a triangle mesh. The mesh is already in object space,
    /// so the body origin is the visual origin.
    pub fn build_exact(mesh: Arc<TriangleMesh>) -> Option<CollisionShape> {
        let shape = mesh.collision_shape()?.clone();
        Some(CollisionShape {
            shape,
            local_pose: Isometry::identity(),
            body_type: BodyType::Exact,
            radius: 0.0,
            half_height: 0.0,
            extent: mesh.bounding_box().extent(),
            graphical_offset: Vec3::ZERO,
            triangle_mesh: Some(mesh),
        })
    }
}

fn auto_radius(body_type: BodyType, radius: f32) -> f32 {
    if radius <= f32::EPSILON {
        debug!("Derived {} radius is degenerate ({})", body_type, radius);
    }
    radius
}

fn extent_in_body_space(body_type: BodyType, extent: Vec3, radius: f32, half_height: f32) -> Vec3 {
    match body_type {
        BodyType::Sphere => Vec3::splat(2.0 * radius),
        BodyType::Cone(axis) | BodyType::Cylinder(axis) => along_axis(axis, 2.0 * half_height, 2.0 * radius),
        _ => extent,
    }
}
