//! Owner of every physical object of a track
//!
//! The manager owns the world, a generational slot table of objects and the
//! shared mesh cache. Each `step` advances the world, dispatches the new
//! contacts to the objects involved, updates the objects and finally applies
//! the changes requested during the tick (suspending broken objects,
//! removals). Gameplay code reads the outcome through `drain_events`.

use crate::assets::cache::AssetCache;
use crate::assets::material::Material;
use crate::config::PhysicsConfig;
use crate::physics::physical_object::{PhysicalObject, RayHit};
use crate::physics::reaction::ReactionEffect;
use crate::physics::triangle_mesh::TriangleMesh;
use crate::physics::user_pointer::{ObjectId, UserPointer, UserPointerKind};
use crate::physics::{PhysicsError, PhysicsResult};
use crate::world::events::{KartEffect, PhysicsEvent, ResetReason};
use crate::world::physics::{ContactReport, PhysicsWorld, WorldRayHit};
use crate::world::track_object::TrackObjectRef;
use glam::{Quat, Vec3};
use rapier3d::prelude::{Collider, ColliderHandle, RigidBody, RigidBodyHandle};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

struct Slot {
    generation: u32,
    object: Option<PhysicalObject>,
}

/// Change applied at the end of the tick in which it was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingChange {
    Suspend(ObjectId),
    Remove(ObjectId),
}

/// First hit of a world ray cast, with the object it belongs to if any
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRayHit {
    pub hit: WorldRayHit,
    pub object: Option<ObjectId>,
    /// Material of the hit surface, for track geometry and exact objects
    pub material: Option<Arc<Material>>,
}

pub struct PhysicalObjectManager {
    world: PhysicsWorld,
    config: PhysicsConfig,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    meshes: AssetCache<String, Arc<TriangleMesh>>,
    track_materials: Vec<Option<Arc<Material>>>,
    touching: HashSet<(ColliderHandle, ColliderHandle)>,
    pending: Vec<PendingChange>,
    events: Vec<PhysicsEvent>,
    tick: u64,
}

impl PhysicalObjectManager {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            world: PhysicsWorld::new(&config),
            config,
            slots: Vec::new(),
            free_slots: Vec::new(),
            meshes: AssetCache::new(),
            track_materials: Vec::new(),
            touching: HashSet::new(),
            pending: Vec::new(),
            events: Vec::new(),
            tick: 0,
        }
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Initialises `object` and takes ownership of it
    pub fn add_object(&mut self, mut object: PhysicalObject) -> PhysicsResult<ObjectId> {
        let id = self.allocate_slot();
        let pointer = UserPointer::physical_object(id);

        if let Err(err) = object.init(&mut self.world, &mut self.meshes, pointer, &self.config) {
            warn!("Could not add physical object '{}': {}", object.id(), err);
            self.free_slots.push(id.index);
            return Err(err);
        }

        debug!("Physical object '{}' added as {}", object.id(), id);
        self.slots[id.index as usize].object = Some(object);
        Ok(id)
    }

    /// Parses the root element of `xml` as physics settings and adds the
    /// object for `track_object`
    pub fn add_object_from_xml(
        &mut self,
        is_dynamic: bool,
        xml: &str,
        track_object: &TrackObjectRef,
    ) -> PhysicsResult<ObjectId> {
        let doc = roxmltree::Document::parse(xml)?;
        let object = PhysicalObject::from_xml(is_dynamic, doc.root_element(), track_object)?;
        self.add_object(object)
    }

    fn allocate_slot(&mut self) -> ObjectId {
        match self.free_slots.pop() {
            Some(index) => ObjectId::new(index, self.slots[index as usize].generation),
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    object: None,
                });
                ObjectId::new(self.slots.len() as u32 - 1, 0)
            }
        }
    }

    /// Destroys the object right away. Stale ids resolve to nothing afterwards.
    pub fn remove_object(&mut self, id: ObjectId) -> PhysicsResult<()> {
        let object = self.take(id).ok_or(PhysicsError::UnknownObject { id })?;
        debug!("Removing physical object '{}' ({})", object.id(), id);
        object.destroy(&mut self.world);
        Ok(())
    }

    /// Destroys the object at the end of the next tick
    pub fn request_removal(&mut self, id: ObjectId) {
        self.pending.push(PendingChange::Remove(id));
    }

    fn take(&mut self, id: ObjectId) -> Option<PhysicalObject> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let object = slot.object.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index);
        Some(object)
    }

    pub fn get(&self, id: ObjectId) -> Option<&PhysicalObject> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.object.as_ref()
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut PhysicalObject> {
        live_object(&mut self.slots, id)
    }

    /// Object a back-reference points to, if it is still alive
    pub fn resolve(&self, pointer: UserPointer) -> Option<ObjectId> {
        let id = pointer.as_physical_object()?;
        self.get(id).map(|_| id)
    }

    pub fn object_for_collider(&self, collider: ColliderHandle) -> Option<ObjectId> {
        self.resolve(self.pointer_of(collider))
    }

    fn pointer_of(&self, collider: ColliderHandle) -> UserPointer {
        self.world
            .collider(collider)
            .map(|c| UserPointer::from_user_data(c.user_data))
            .unwrap_or(UserPointer::UNDEFINED)
    }

    /// Moves the object so that its visual ends up at `position`
    pub fn move_object(&mut self, id: ObjectId, position: Vec3, rotation: Quat) -> PhysicsResult<()> {
        let object = live_object(&mut self.slots, id).ok_or(PhysicsError::UnknownObject { id })?;
        object.move_to(&mut self.world, position, rotation);
        Ok(())
    }

    /// Puts a single object back to its rest pose
    pub fn reset_object(&mut self, id: ObjectId) -> PhysicsResult<()> {
        let object = live_object(&mut self.slots, id).ok_or(PhysicsError::UnknownObject { id })?;
        object.reset(&mut self.world);
        self.events.push(PhysicsEvent::ObjectReset {
            object: id,
            reason: ResetReason::Requested,
            tick: self.tick,
        });
        Ok(())
    }

    /// Ids of all live objects
    pub fn ids(&self) -> Vec<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.object.is_some())
            .map(|(index, slot)| ObjectId::new(index as u32, slot.generation))
            .collect()
    }

    pub fn object_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.object.is_some()).count()
    }

    /// Adds static track geometry whose surface is `material`
    pub fn insert_track_collider(&mut self, mut collider: Collider, material: Option<Arc<Material>>) -> ColliderHandle {
        let pointer = UserPointer::track(self.track_materials.len() as u32);
        self.track_materials.push(material);
        collider.user_data = pointer.to_user_data();
        self.world.insert_static_collider(collider)
    }

    /// Adds the body of kart `kart_index`
    pub fn insert_kart(
        &mut self,
        mut body: RigidBody,
        mut collider: Collider,
        kart_index: u32,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let pointer = UserPointer::kart(kart_index).to_user_data();
        body.user_data = pointer;
        collider.user_data = pointer;
        self.world.insert_body(body, collider)
    }

    /// Advances the simulation by one tick of `dt` seconds
    pub fn step(&mut self, dt: f32) {
        self.world.step(dt);
        self.tick += 1;

        self.dispatch_contacts();

        for id in self.ids() {
            let Some(object) = live_object(&mut self.slots, id) else {
                continue;
            };
            if object.update(&mut self.world, dt) {
                self.events.push(PhysicsEvent::ObjectReset {
                    object: id,
                    reason: ResetReason::TooLow,
                    tick: self.tick,
                });
            }
        }

        self.apply_pending();
    }

    /// Reports contacts that started in the last step
    fn dispatch_contacts(&mut self) {
        let contacts = self.world.contacts();
        let mut touching = HashSet::with_capacity(contacts.len());

        for contact in contacts {
            let pair = (contact.collider1, contact.collider2);
            touching.insert(pair);
            if self.touching.contains(&pair) {
                continue;
            }
            self.dispatch_contact(&contact);
        }

        self.touching = touching;
    }

    fn dispatch_contact(&mut self, contact: &ContactReport) {
        let p1 = self.pointer_of(contact.collider1);
        let p2 = self.pointer_of(contact.collider2);

        // The contact normal points from collider1 to collider2. Objects
        // receive it pointing towards themselves.
        let (object, other, normal) = match (self.resolve(p1), self.resolve(p2)) {
            (Some(id), None) => (id, p2, -contact.normal),
            (None, Some(id)) => (id, p1, contact.normal),
            _ => return,
        };

        match other.kind {
            UserPointerKind::Track => {
                let material = self.track_materials.get(other.index as usize).cloned().flatten();
                self.hit_object(object, material.as_deref(), normal);
            }
            UserPointerKind::Kart => self.kart_touched(other.index, object),
            _ => {}
        }
    }

    fn hit_object(&mut self, id: ObjectId, material: Option<&Material>, normal: Vec3) {
        let Some(object) = live_object(&mut self.slots, id) else {
            return;
        };
        let effect = object.hit(&mut self.world, material, normal);
        trace!("Object {} hit, normal {}", id, normal);
        self.events.push(PhysicsEvent::ObjectHit {
            object: id,
            normal,
            tick: self.tick,
        });
        self.handle_effect(id, effect);
    }

    fn kart_touched(&mut self, kart: u32, id: ObjectId) {
        let Some(object) = self.get(id) else {
            return;
        };

        let effect = if object.is_crash_reset() {
            Some(KartEffect::Rescue)
        } else if object.is_explode_kart_object() {
            Some(KartEffect::Explode)
        } else if object.is_flatten_kart_object() {
            Some(KartEffect::Flatten)
        } else {
            None
        };
        let soccer_ball = object.is_soccer_ball();

        if let Some(effect) = effect {
            debug!("Kart {} touched {} ({:?})", kart, id, effect);
            self.events.push(PhysicsEvent::KartInteraction {
                kart,
                object: id,
                effect,
                tick: self.tick,
            });
        }
        if soccer_ball {
            self.events.push(PhysicsEvent::SoccerBallTouched {
                kart,
                object: id,
                tick: self.tick,
            });
        }
    }

    fn handle_effect(&mut self, id: ObjectId, effect: ReactionEffect) {
        if effect == ReactionEffect::Break {
            self.events.push(PhysicsEvent::ObjectBroken {
                object: id,
                tick: self.tick,
            });
            self.pending.push(PendingChange::Suspend(id));
        }
    }

    fn apply_pending(&mut self) {
        for change in std::mem::take(&mut self.pending) {
            match change {
                PendingChange::Suspend(id) => {
                    // The object may have been removed, and its slot reused, since
                    // the request
                    match live_object(&mut self.slots, id) {
                        Some(object) => object.remove_body(&mut self.world),
                        None => trace!("Object {} gone before suspension", id),
                    }
                }
                PendingChange::Remove(id) => {
                    if self.remove_object(id).is_err() {
                        trace!("Object {} already gone", id);
                    }
                }
            }
        }
    }

    /// Lets every object within `radius` of `position` react to an explosion.
    /// `direct_hit` is the object the explosion hit, if any.
    pub fn handle_explosion(&mut self, position: Vec3, radius: f32, direct_hit: Option<ObjectId>) {
        for id in self.ids() {
            let Some(object) = live_object(&mut self.slots, id) else {
                continue;
            };
            let direct = direct_hit == Some(id);
            if !direct {
                let Some((centre, _)) = object.graphical_pose(&self.world) else {
                    continue;
                };
                let reach = object.shape().map(|s| s.bounding_radius()).unwrap_or(0.0);
                if centre.distance(position) - reach > radius {
                    continue;
                }
            }
            let effect = object.handle_explosion(&mut self.world, position, direct);
            self.handle_effect(id, effect);
        }
    }

    /// First hit along `from..to` among track geometry, karts and objects
    pub fn cast_ray(&self, from: Vec3, to: Vec3) -> Option<SceneRayHit> {
        let hit = self.world.cast_ray(from, to)?;
        let pointer = self.pointer_of(hit.collider);

        let (object, material) = match self.resolve(pointer) {
            Some(id) => {
                let material = self
                    .get(id)
                    .and_then(|o| o.cast_ray(&self.world, from, to, false))
                    .and_then(|RayHit { material, .. }| material);
                (Some(id), material)
            }
            None if pointer.is(UserPointerKind::Track) => {
                (None, self.track_materials.get(pointer.index as usize).cloned().flatten())
            }
            None => (None, None),
        };
        Some(SceneRayHit { hit, object, material })
    }

    /// Puts every object back to its rest pose (race restart)
    pub fn reset_all(&mut self) {
        let ids = self.ids();
        for id in &ids {
            if let Some(object) = live_object(&mut self.slots, *id) {
                object.reset(&mut self.world);
                object.add_body(&mut self.world);
                self.events.push(PhysicsEvent::ObjectReset {
                    object: *id,
                    reason: ResetReason::Requested,
                    tick: self.tick,
                });
            }
        }
        self.touching.clear();
        info!("Reset {} physical objects", ids.len());
    }

    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.events)
    }

    /// Destroys every object
    pub fn clear(&mut self) {
        for id in self.ids() {
            if let Some(object) = self.take(id) {
                object.destroy(&mut self.world);
            }
        }
        self.pending.clear();
        self.touching.clear();
    }
}

/// Object in the slot `id` points to, unless the slot moved on to a newer generation
fn live_object(slots: &mut [Slot], id: ObjectId) -> Option<&mut PhysicalObject> {
    let slot = slots.get_mut(id.index as usize)?;
    if slot.generation != id.generation {
        return None;
    }
    slot.object.as_mut()
}

impl Drop for PhysicalObjectManager {
    fn drop(&mut self) {
        self.clear();
    }
}
