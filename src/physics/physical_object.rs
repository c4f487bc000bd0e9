//! A track object taking part in the rigid-body simulation
//!
//! `PhysicalObject` owns the collision shape and the handle of its rigid body.
//! The track object (scene-graph side) is only referenced weakly; every tick
//! the simulated transform of dynamic objects is pushed to it.
//!
//! The body origin is placed at the centre of the visual bounding box, so a
//! primitive shape is centred on what the player sees. `graphical_offset`
//! maps the body origin back to the origin of the track object.

use crate::assets::cache::AssetCache;
use crate::assets::material::Material;
use crate::config::PhysicsConfig;
use crate::physics::body_type::BodyType;
use crate::physics::object_settings::ObjectSettings;
use crate::physics::reaction::{reaction_for, ObjectReaction, ReactionContext, ReactionEffect, ReactionKind};
use crate::physics::shape::{CollisionShape, ShapeFactory};
use crate::physics::triangle_mesh::TriangleMesh;
use crate::physics::user_pointer::UserPointer;
use crate::physics::{PhysicsError, PhysicsResult};
use crate::utils::math::{from_isometry, from_point, from_rotation, from_vector, to_isometry, to_point, to_vector};
use crate::world::physics::PhysicsWorld;
use crate::world::track_object::{TrackObject, TrackObjectRef};
use glam::{Quat, Vec3};
use rapier3d::parry::shape::FeatureId;
use rapier3d::prelude::*;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::{debug, trace, warn};

bitflags::bitflags! {
    /// What an object does to a kart touching it
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InteractionFlags: u8 {
        const CRASH_RESET = 0x01;
        const EXPLODE_KART = 0x02;
        const FLATTEN_KART = 0x04;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// Constructed, no shape or body yet
    Uninitialized,
    /// Body exists and is registered with the world
    Active,
    /// Body exists but was removed from the world
    Suspended,
    /// Body freed
    Destroyed,
}

/// Result of a ray cast against a single object
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    /// Surface material, known for exact shapes only
    pub material: Option<Arc<Material>>,
}

pub struct PhysicalObject {
    id: String,
    settings: ObjectSettings,
    is_dynamic: bool,
    flags: InteractionFlags,

    // Pose of the track object when this object was created
    init_position: Vec3,
    init_rotation: Quat,
    init_scale: Vec3,

    graphical_offset: Vec3,
    rest_origin: Vec3,

    shape: Option<CollisionShape>,
    body: Option<RigidBodyHandle>,
    collider: Option<ColliderHandle>,
    user_pointer: UserPointer,
    track_object: Weak<RefCell<dyn TrackObject>>,

    reaction: Box<dyn ObjectReaction>,
    custom_reaction: bool,
    state: ObjectState,

    reset_static_when_too_low: bool,
    explosion_impulse: f32,
    soccer_push_factor: f32,
}

impl PhysicalObject {
    /// Creates the object for `track_object`. Nothing is simulated until `init`.
    /// `is_dynamic` tells whether the simulation may move the object at all.
    pub fn new(is_dynamic: bool, settings: &ObjectSettings, track_object: &TrackObjectRef) -> Self {
        let track = track_object.borrow();
        let id = if settings.id.is_empty() {
            track.id().to_string()
        } else {
            settings.id.clone()
        };

        let mut flags = InteractionFlags::empty();
        flags.set(InteractionFlags::CRASH_RESET, settings.crash_reset);
        flags.set(InteractionFlags::EXPLODE_KART, settings.knock_kart);
        flags.set(InteractionFlags::FLATTEN_KART, settings.flatten_kart);

        Self {
            id,
            settings: settings.clone(),
            is_dynamic,
            flags,
            init_position: track.position(),
            init_rotation: track.rotation(),
            init_scale: track.scale(),
            graphical_offset: Vec3::ZERO,
            rest_origin: track.position(),
            shape: None,
            body: None,
            collider: None,
            user_pointer: UserPointer::UNDEFINED,
            track_object: Rc::downgrade(track_object),
            reaction: reaction_for(settings.reaction, settings.hit_points.unwrap_or(0)),
            custom_reaction: false,
            state: ObjectState::Uninitialized,
            reset_static_when_too_low: false,
            explosion_impulse: 0.0,
            soccer_push_factor: 0.0,
        }
    }

    /// Creates the object from the physics attributes of a scene element
    pub fn from_xml(
        is_dynamic: bool,
        node: roxmltree::Node<'_, '_>,
        track_object: &TrackObjectRef,
    ) -> PhysicsResult<Self> {
        let settings = ObjectSettings::from_xml(node)?;
        Ok(Self::new(is_dynamic, &settings, track_object))
    }

    /// Replaces the reaction derived from the settings
    pub fn with_reaction(mut self, reaction: Box<dyn ObjectReaction>) -> Self {
        self.reaction = reaction;
        self.custom_reaction = true;
        self
    }

    /// Builds the collision shape and the rigid body and registers the body
    /// with `world`. `pointer` is stored in the body and collider so that
    /// contacts can be traced back to this object.
    ///
    /// Panics if the object was already initialised.
    pub fn init(
        &mut self,
        world: &mut PhysicsWorld,
        meshes: &mut AssetCache<String, Arc<TriangleMesh>>,
        pointer: UserPointer,
        config: &PhysicsConfig,
    ) -> PhysicsResult<()> {
        assert_eq!(
            self.state,
            ObjectState::Uninitialized,
            "physical object '{}' initialised twice",
            self.id
        );

        let track = self
            .track_object
            .upgrade()
            .ok_or_else(|| PhysicsError::TrackObjectGone { id: self.id.clone() })?;

        let mesh = if self.settings.body_type == BodyType::Exact {
            Some(self.exact_mesh(&*track.borrow(), meshes)?)
        } else {
            None
        };
        let bounds = track.borrow().bounding_box().scaled(self.init_scale);
        let shape = ShapeFactory::build(self.settings.body_type, self.settings.radius, &bounds, mesh)
            .ok_or_else(|| PhysicsError::MissingMeshData { id: self.id.clone() })?;

        self.graphical_offset = shape.graphical_offset;
        self.rest_origin = self.init_position - self.init_rotation * self.graphical_offset;

        let mass = self.settings.mass;
        let builder = if !self.is_dynamic {
            RigidBodyBuilder::kinematic_position_based().can_sleep(false)
        } else if mass > 0.0 {
            let inertia = shape.local_inertia(mass);
            RigidBodyBuilder::dynamic()
                .additional_mass_properties(MassProperties::new(Point::origin(), mass, to_vector(inertia)))
        } else {
            RigidBodyBuilder::fixed()
        };
        let body = builder
            .position(to_isometry(self.rest_origin, self.init_rotation))
            .angular_damping(config.angular_damping)
            .user_data(pointer.to_user_data())
            .build();
        let collider = ColliderBuilder::new(shape.shape.clone())
            .position(shape.local_pose)
            .density(0.0)
            .user_data(pointer.to_user_data())
            .build();

        let (body_handle, collider_handle) = world.insert_body(body, collider);
        self.body = Some(body_handle);
        self.collider = Some(collider_handle);
        self.user_pointer = pointer;
        self.shape = Some(shape);

        if !self.custom_reaction
            && self.settings.reaction == ReactionKind::Destructible
            && self.settings.hit_points.is_none()
        {
            self.reaction = reaction_for(ReactionKind::Destructible, config.destructible_hit_points);
        }
        self.reset_static_when_too_low = config.reset_static_when_too_low;
        self.explosion_impulse = config.explosion_impulse_objects;
        self.soccer_push_factor = config.soccer_push_factor;
        self.state = ObjectState::Active;

        debug!(
            "Physical object '{}' initialised: {} mass={} radius={} dynamic={}",
            self.id,
            self.settings.body_type,
            mass,
            self.radius(),
            self.is_dynamic
        );
        Ok(())
    }

    /// Triangle mesh of the track object at the current scale, shared through `meshes`
    fn exact_mesh(
        &self,
        track: &dyn TrackObject,
        meshes: &mut AssetCache<String, Arc<TriangleMesh>>,
    ) -> PhysicsResult<Arc<TriangleMesh>> {
        let render_mesh = track
            .render_mesh()
            .ok_or_else(|| PhysicsError::MissingMeshData { id: self.id.clone() })?;
        let scale = self.init_scale;
        let key = format!("{}@{}", render_mesh.name, scale);

        let mesh = meshes.get_or_try_insert_with(key, || -> PhysicsResult<_> {
            let mut mesh = TriangleMesh::from_render_mesh(&render_mesh, scale);
            mesh.create_collision_shape()?;
            Ok(Arc::new(mesh))
        })?;
        Ok(mesh.clone())
    }

    /// Puts the object back to its rest pose and stops it
    pub fn reset(&mut self, world: &mut PhysicsWorld) {
        self.expect_initialized("reset");
        let Some(body) = self.body.and_then(|h| world.body_mut(h)) else {
            return;
        };

        let rest = to_isometry(self.rest_origin, self.init_rotation);
        body.set_position(rest, true);
        if body.is_kinematic() {
            body.set_next_kinematic_position(rest);
        }
        body.set_linvel(Vector::zeros(), true);
        body.set_angvel(Vector::zeros(), true);
        body.reset_forces(true);
        body.reset_torques(true);
        body.wake_up(true);

        self.push_to_track_object(self.init_position, self.init_rotation);
        self.reaction.on_reset();
        debug!("Physical object '{}' reset", self.id);
    }

    /// Pulls the simulated transform into the track object and applies the
    /// too-low recovery. Returns true if the object was reset.
    pub fn update(&mut self, world: &mut PhysicsWorld, _dt: f32) -> bool {
        self.expect_initialized("update");
        if self.state == ObjectState::Suspended {
            return false;
        }
        let Some(body) = self.body.and_then(|h| world.body(h)) else {
            return false;
        };
        let (position, rotation) = from_isometry(body.position());
        let moved_by_simulation = body.is_dynamic();

        if !moved_by_simulation {
            if self.reset_static_when_too_low && self.is_too_low(position) {
                self.reset(world);
                return true;
            }
            return false;
        }

        if self.is_too_low(position) {
            trace!("Physical object '{}' fell below {}", self.id, self.settings.reset_height);
            self.reset(world);
            return true;
        }

        self.push_to_track_object(position + rotation * self.graphical_offset, rotation);
        false
    }

    fn is_too_low(&self, body_position: Vec3) -> bool {
        self.settings.reset_when_too_low && body_position.y < self.settings.reset_height
    }

    fn push_to_track_object(&self, position: Vec3, rotation: Quat) {
        match self.track_object.upgrade() {
            Some(track) => track.borrow_mut().move_to(position, rotation, self.init_scale),
            None => trace!("Track object of '{}' is gone", self.id),
        }
    }

    /// Moves the body so that the visual ends up at `position`/`rotation`.
    /// The rest pose is not changed.
    pub fn move_to(&mut self, world: &mut PhysicsWorld, position: Vec3, rotation: Quat) {
        self.expect_initialized("move_to");
        let Some(body) = self.body.and_then(|h| world.body_mut(h)) else {
            return;
        };
        let pose = to_isometry(position - rotation * self.graphical_offset, rotation);
        body.set_position(pose, true);
        if body.is_kinematic() {
            body.set_next_kinematic_position(pose);
        }
    }

    /// Called when the object was struck; `normal` points towards the object
    pub fn hit(&mut self, world: &mut PhysicsWorld, material: Option<&Material>, normal: Vec3) -> ReactionEffect {
        self.expect_initialized("hit");
        let ctx = self.reaction_context(world);
        let effect = self.reaction.on_hit(&ctx, material, normal);
        self.apply_effect(world, effect);
        effect
    }

    /// Called for every explosion close to the object
    pub fn handle_explosion(&mut self, world: &mut PhysicsWorld, position: Vec3, direct_hit: bool) -> ReactionEffect {
        self.expect_initialized("handle_explosion");
        let ctx = self.reaction_context(world);
        let effect = self.reaction.on_explosion(&ctx, position, direct_hit);
        self.apply_effect(world, effect);
        effect
    }

    fn reaction_context(&self, world: &PhysicsWorld) -> ReactionContext {
        let position = self
            .body
            .and_then(|h| world.body(h))
            .map(|body| from_vector(body.translation()))
            .unwrap_or(self.rest_origin);
        ReactionContext {
            position,
            mass: self.settings.mass,
            is_soccer_ball: self.is_soccer_ball(),
            explosion_impulse: self.explosion_impulse,
            soccer_push_factor: self.soccer_push_factor,
        }
    }

    fn apply_effect(&self, world: &mut PhysicsWorld, effect: ReactionEffect) {
        match effect {
            ReactionEffect::Impulse(impulse) => {
                if let Some(body) = self.body.and_then(|h| world.body_mut(h)) {
                    if body.is_dynamic() {
                        body.apply_impulse(to_vector(impulse), true);
                        trace!("Impulse {} applied to '{}'", impulse, self.id);
                    }
                }
            }
            ReactionEffect::Break => debug!("Physical object '{}' broke", self.id),
            ReactionEffect::None => {}
        }
    }

    pub fn is_soccer_ball(&self) -> bool {
        self.track_object
            .upgrade()
            .map(|track| track.borrow().is_soccer_ball())
            .unwrap_or(false)
    }

    pub fn is_crash_reset(&self) -> bool {
        self.flags.contains(InteractionFlags::CRASH_RESET)
    }

    pub fn is_explode_kart_object(&self) -> bool {
        self.flags.contains(InteractionFlags::EXPLODE_KART)
    }

    pub fn is_flatten_kart_object(&self) -> bool {
        self.flags.contains(InteractionFlags::FLATTEN_KART)
    }

    /// Casts the segment `from..to` against this object only.
    ///
    /// With `interpolate_normal`, hits on exact shapes report the normal
    /// blended from the vertex normals instead of the face normal.
    pub fn cast_ray(&self, world: &PhysicsWorld, from: Vec3, to: Vec3, interpolate_normal: bool) -> Option<RayHit> {
        self.expect_initialized("cast_ray");
        let shape = self.shape.as_ref()?;
        let body = self.body.and_then(|h| world.body(h))?;
        let pose = body.position() * shape.local_pose;

        let ray = Ray::new(to_point(from), to_vector(to - from));
        let hit = shape.shape.cast_ray_and_get_normal(&pose, &ray, 1.0, true)?;
        let point = from_point(&ray.point_at(hit.time_of_impact));
        let mut normal = from_vector(&hit.normal).normalize_or_zero();
        let mut material = None;

        if let (Some(mesh), FeatureId::Face(face)) = (&shape.triangle_mesh, hit.feature) {
            let triangle_count = mesh.triangle_count().max(1);
            // Back faces are reported after the front faces
            let triangle = face as usize % triangle_count;
            material = mesh.material(triangle).cloned();

            if interpolate_normal {
                let local_point = from_point(&pose.inverse_transform_point(&to_point(point)));
                if let Some(local_normal) = mesh.interpolated_normal(triangle, local_point) {
                    normal = from_rotation(&pose.rotation) * local_normal;
                }
            }
        }

        Some(RayHit { point, normal, material })
    }

    /// Replaces the kart interaction by the one named `name`:
    /// "flatten", "explode" (or "knock") and "reset" (or "crash-reset").
    /// Any other name leaves the object without interaction.
    pub fn set_interaction(&mut self, name: &str) {
        self.flags = InteractionFlags::empty();
        match name {
            "flatten" => self.flags.insert(InteractionFlags::FLATTEN_KART),
            "explode" | "knock" => self.flags.insert(InteractionFlags::EXPLODE_KART),
            "reset" | "crash-reset" => self.flags.insert(InteractionFlags::CRASH_RESET),
            other => warn!("Unknown interaction '{}' for '{}'", other, self.id),
        }
    }

    /// Registers the body with the world again. Does nothing if registered.
    pub fn add_body(&mut self, world: &mut PhysicsWorld) {
        self.expect_initialized("add_body");
        if self.state == ObjectState::Suspended {
            if let Some(handle) = self.body {
                world.add_body(handle);
            }
            self.state = ObjectState::Active;
        }
    }

    /// Takes the body out of the world, keeping it for a later `add_body`.
    /// Does nothing if not registered.
    pub fn remove_body(&mut self, world: &mut PhysicsWorld) {
        self.expect_initialized("remove_body");
        if self.state == ObjectState::Active {
            if let Some(handle) = self.body {
                world.remove_body(handle);
            }
            self.state = ObjectState::Suspended;
        }
    }

    /// Frees the body and its collider
    pub fn destroy(mut self, world: &mut PhysicsWorld) {
        if let Some(handle) = self.body.take() {
            world.destroy_body(handle);
            debug!("Physical object '{}' destroyed", self.id);
        }
        self.collider = None;
        self.state = ObjectState::Destroyed;
    }

    fn expect_initialized(&self, operation: &str) {
        match self.state {
            ObjectState::Active | ObjectState::Suspended => {}
            state => panic!(
                "{} called on physical object '{}' in state {:?}",
                operation, self.id, state
            ),
        }
    }

    /// Graphical transform derived from the current body pose
    pub fn graphical_pose(&self, world: &PhysicsWorld) -> Option<(Vec3, Quat)> {
        let body = self.body.and_then(|h| world.body(h))?;
        let (position, rotation) = from_isometry(body.position());
        Some((position + rotation * self.graphical_offset, rotation))
    }

    pub fn linear_velocity(&self, world: &PhysicsWorld) -> Option<Vec3> {
        let body = self.body.and_then(|h| world.body(h))?;
        Some(from_vector(body.linvel()))
    }

    pub fn angular_velocity(&self, world: &PhysicsWorld) -> Option<Vec3> {
        let body = self.body.and_then(|h| world.body(h))?;
        Some(from_vector(body.angvel()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ObjectState {
        self.state
    }

    pub fn settings(&self) -> &ObjectSettings {
        &self.settings
    }

    pub fn body_type(&self) -> BodyType {
        self.settings.body_type
    }

    pub fn mass(&self) -> f32 {
        self.settings.mass
    }

    /// Effective radius of the shape; the declared one before `init`
    pub fn radius(&self) -> f32 {
        self.shape.as_ref().map(|s| s.radius).unwrap_or(self.settings.radius)
    }

    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    pub fn interaction_flags(&self) -> InteractionFlags {
        self.flags
    }

    pub fn graphical_offset(&self) -> Vec3 {
        self.graphical_offset
    }

    /// Track-object position and rotation the object resets to
    pub fn rest_pose(&self) -> (Vec3, Quat) {
        (self.init_position, self.init_rotation)
    }

    /// Position of the body origin in the rest pose
    pub fn rest_origin(&self) -> Vec3 {
        self.rest_origin
    }

    pub fn init_scale(&self) -> Vec3 {
        self.init_scale
    }

    pub fn shape(&self) -> Option<&CollisionShape> {
        self.shape.as_ref()
    }

    pub fn triangle_mesh(&self) -> Option<&Arc<TriangleMesh>> {
        self.shape.as_ref()?.triangle_mesh.as_ref()
    }

    pub fn reaction(&self) -> &dyn ObjectReaction {
        self.reaction.as_ref()
    }

    pub fn body_handle(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    pub fn collider_handle(&self) -> Option<ColliderHandle> {
        self.collider
    }

    pub fn user_pointer(&self) -> UserPointer {
        self.user_pointer
    }

    pub fn track_object(&self) -> Option<TrackObjectRef> {
        self.track_object.upgrade()
    }
}

impl std::fmt::Debug for PhysicalObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalObject")
            .field("id", &self.id)
            .field("body_type", &self.settings.body_type)
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl Drop for PhysicalObject {
    fn drop(&mut self) {
        if self.body.is_some() {
            warn!("Physical object '{}' dropped without destroying its body", self.id);
        }
    }
}
