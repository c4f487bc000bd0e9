use crate::physics::user_pointer::ObjectId;
use glam::Vec3;

/// Events produced by the physics layer for gameplay code
/// These are plain data; the kart and race layers decide what to do with them

/// Effect a physical object has on a kart touching it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KartEffect {
    /// The kart is rescued (put back on the track)
    Rescue,
    /// The kart explodes / is knocked around
    Explode,
    /// The kart is squashed flat
    Flatten,
}

/// Why an object went back to its rest pose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// Fell below its reset height
    TooLow,
    /// Requested by game code (e.g. race restart)
    Requested,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsEvent {
    /// A kart touched an object that affects karts
    KartInteraction {
        kart: u32,
        object: ObjectId,
        effect: KartEffect,
        tick: u64,
    },
    /// A kart touched the soccer ball
    SoccerBallTouched {
        kart: u32,
        object: ObjectId,
        tick: u64,
    },
    /// An object was struck by non-kart geometry
    ObjectHit {
        object: ObjectId,
        normal: Vec3,
        tick: u64,
    },
    ObjectReset {
        object: ObjectId,
        reason: ResetReason,
        tick: u64,
    },
    /// A destructible object broke and left the world
    ObjectBroken {
        object: ObjectId,
        tick: u64,
    },
}

impl PhysicsEvent {
    pub fn tick(&self) -> u64 {
        match self {
            PhysicsEvent::KartInteraction { tick, .. }
            | PhysicsEvent::SoccerBallTouched { tick, .. }
            | PhysicsEvent::ObjectHit { tick, .. }
            | PhysicsEvent::ObjectReset { tick, .. }
            | PhysicsEvent::ObjectBroken { tick, .. } => *tick,
        }
    }
}
