//! Dynamics world backed by rapier3d
//!
//! The world stores every rigid body and collider. Physical objects hold
//! handles into it and register/unregister their body through `add_body` and
//! `remove_body`, which enable or disable the body rather than destroying it.

use crate::config::PhysicsConfig;
use crate::utils::math::{from_point, from_vector, to_point, to_vector};
use glam::Vec3;
use rapier3d::prelude::*;
use tracing::{debug, trace};

/// A contact between two colliders reported after a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactReport {
    pub collider1: ColliderHandle,
    pub collider2: ColliderHandle,
    /// World-space normal pointing from collider1 towards collider2
    pub normal: Vec3,
}

/// First intersection of a world ray cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRayHit {
    pub collider: ColliderHandle,
    pub point: Vec3,
    pub normal: Vec3,
    /// Fraction of the from..to segment at which the hit occurred
    pub fraction: f32,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    step_count: u64,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let [gx, gy, gz] = config.gravity;
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.tick_length;

        Self {
            gravity: Vector::new(gx, gy, gz),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            step_count: 0,
        }
    }

    /// Creates a body with its single collider. The body starts registered.
    pub fn insert_body(&mut self, body: RigidBody, collider: Collider) -> (RigidBodyHandle, ColliderHandle) {
        let body_handle = self.rigid_body_set.insert(body);
        let collider_handle = self
            .collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);
        trace!("Inserted body {:?} with collider {:?}", body_handle, collider_handle);
        (body_handle, collider_handle)
    }

    /// Adds a parentless collider, e.g. static track geometry
    pub fn insert_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.collider_set.insert(collider)
    }

    /// Registers a previously inserted body with the simulation.
    /// Returns false if it already was registered or does not exist.
    pub fn add_body(&mut self, handle: RigidBodyHandle) -> bool {
        match self.rigid_body_set.get_mut(handle) {
            Some(body) if !body.is_enabled() => {
                body.set_enabled(true);
                body.wake_up(true);
                debug!("Body {:?} added to world", handle);
                true
            }
            _ => false,
        }
    }

    /// Takes a body out of the simulation without destroying it.
    /// Returns false if it was not registered or does not exist.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        match self.rigid_body_set.get_mut(handle) {
            Some(body) if body.is_enabled() => {
                body.set_enabled(false);
                debug!("Body {:?} removed from world", handle);
                true
            }
            _ => false,
        }
    }

    pub fn is_registered(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .get(handle)
            .map(|body| body.is_enabled())
            .unwrap_or(false)
    }

    /// Frees a body together with its colliders
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.collider_set.get(handle)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Advances the simulation by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        self.step_count += 1;
    }

    /// Contacts touching at the end of the last step
    pub fn contacts(&self) -> Vec<ContactReport> {
        let mut reports = Vec::new();
        for pair in self.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            if let Some(manifold) = pair.manifolds.iter().find(|m| !m.points.is_empty()) {
                reports.push(ContactReport {
                    collider1: pair.collider1,
                    collider2: pair.collider2,
                    normal: from_vector(&manifold.data.normal),
                });
            }
        }
        reports
    }

    /// Casts a ray against every enabled collider; returns the closest hit
    pub fn cast_ray(&self, from: Vec3, to: Vec3) -> Option<WorldRayHit> {
        let dir = to - from;
        if dir.length_squared() <= f32::EPSILON {
            return None;
        }
        let ray = Ray::new(to_point(from), to_vector(dir));

        let mut best: Option<WorldRayHit> = None;
        for (handle, collider) in self.collider_set.iter() {
            if !collider.is_enabled() {
                continue;
            }
            if let Some(parent) = collider.parent() {
                if !self.is_registered(parent) {
                    continue;
                }
            }
            let pose = self.collider_pose(handle).unwrap_or(*collider.position());
            let Some(hit) = collider.shape().cast_ray_and_get_normal(&pose, &ray, 1.0, true) else {
                continue;
            };
            if best.map_or(true, |b| hit.time_of_impact < b.fraction) {
                best = Some(WorldRayHit {
                    collider: handle,
                    point: from_point(&ray.point_at(hit.time_of_impact)),
                    normal: from_vector(&hit.normal).normalize_or_zero(),
                    fraction: hit.time_of_impact,
                });
            }
        }
        best
    }

    /// World pose of a collider derived from its parent body. Unlike
    /// `Collider::position`, this is current even before the next step.
    pub fn collider_pose(&self, handle: ColliderHandle) -> Option<Isometry<Real>> {
        let collider = self.collider_set.get(handle)?;
        match (collider.parent(), collider.position_wrt_parent()) {
            (Some(parent), Some(local)) => Some(self.rigid_body_set.get(parent)?.position() * local),
            _ => Some(*collider.position()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn falling_ball(world: &mut PhysicsWorld) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic().translation(Vector::new(0.0, 10.0, 0.0)).build();
        let collider = ColliderBuilder::ball(0.5).build();
        world.insert_body(body, collider).0
    }

    #[test]
    fn test_ball_falls() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let handle = falling_ball(&mut world);
        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }
        assert!(world.body(handle).unwrap().translation().y < 10.0);
        assert_eq!(world.step_count(), 30);
    }

    #[test]
    fn test_add_remove_are_idempotent() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let handle = falling_ball(&mut world);

        assert!(world.is_registered(handle));
        assert!(!world.add_body(handle));
        assert!(world.remove_body(handle));
        assert!(!world.remove_body(handle));
        assert!(!world.is_registered(handle));
        assert!(world.add_body(handle));
        assert!(world.is_registered(handle));
    }

    #[test]
    fn test_removed_body_does_not_move() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let handle = falling_ball(&mut world);
        world.remove_body(handle);
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(world.body(handle).unwrap().translation().y, 10.0);
    }

    #[test]
    fn test_world_ray_hits_static_collider() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let ground = world.insert_static_collider(
            ColliderBuilder::cuboid(10.0, 0.5, 10.0).translation(Vector::new(0.0, -0.5, 0.0)).build(),
        );
        let hit = world.cast_ray(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -5.0, 0.0)).unwrap();
        assert_eq!(hit.collider, ground);
        assert!((hit.point.y - 0.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::Y).length() < 1e-4);
        assert!((hit.fraction - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_ray_miss() {
        let world = PhysicsWorld::new(&PhysicsConfig::default());
        assert!(world.cast_ray(Vec3::ZERO, Vec3::X).is_none());
    }

    #[test]
    fn test_destroy_body() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let handle = falling_ball(&mut world);
        assert!(world.destroy_body(handle));
        assert!(world.body(handle).is_none());
        assert_eq!(world.collider_set.len(), 0);
        assert!(!world.destroy_body(handle));
    }
}
