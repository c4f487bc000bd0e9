//! Per-kind reactions of physical objects to hits and explosions
//!
//! The collision dispatch only ever talks to `ObjectReaction`; what actually
//! happens (nothing, an impulse, losing hit points) depends on the kind of
//! object. Reactions never touch the world themselves, they return an effect
//! that the owning object applies.

use crate::assets::material::{CollisionReaction, Material};
use crate::config::ConfigError;
use glam::Vec3;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionKind {
    /// Plain scenery
    #[default]
    Scenery,
    /// Pushed around by explosions
    Explosive,
    /// Breaks after enough hits
    Destructible,
}

impl FromStr for ReactionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "scenery" => Ok(ReactionKind::Scenery),
            "explosive" => Ok(ReactionKind::Explosive),
            "destructible" => Ok(ReactionKind::Destructible),
            other => Err(ConfigError::InvalidAttribute {
                attribute: "reaction".to_string(),
                reason: format!("unknown reaction kind '{}'", other),
            }),
        }
    }
}

/// State of the reacting object at the time of the event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionContext {
    /// Current position of the body
    pub position: Vec3,
    pub mass: f32,
    pub is_soccer_ball: bool,
    pub explosion_impulse: f32,
    pub soccer_push_factor: f32,
}

/// What the object has to do in response to an event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReactionEffect {
    None,
    /// Apply this impulse at the centre of mass
    Impulse(Vec3),
    /// The object is destroyed and must leave the world at the end of the tick
    Break,
}

pub trait ObjectReaction: fmt::Debug {
    fn kind(&self) -> ReactionKind;

    /// The object was struck; `normal` points from the other surface towards the object
    fn on_hit(&mut self, _ctx: &ReactionContext, _material: Option<&Material>, _normal: Vec3) -> ReactionEffect {
        ReactionEffect::None
    }

    fn on_explosion(&mut self, _ctx: &ReactionContext, _position: Vec3, _direct_hit: bool) -> ReactionEffect {
        ReactionEffect::None
    }

    /// The object went back to its rest pose
    fn on_reset(&mut self) {}
}

/// Creates the reaction for `kind`
pub fn reaction_for(kind: ReactionKind, hit_points: u32) -> Box<dyn ObjectReaction> {
    match kind {
        ReactionKind::Scenery => Box::new(Scenery),
        ReactionKind::Explosive => Box::new(Explosive),
        ReactionKind::Destructible => Box::new(Destructible::new(hit_points)),
    }
}

#[derive(Debug, Default)]
pub struct Scenery;

impl ObjectReaction for Scenery {
    fn kind(&self) -> ReactionKind {
        ReactionKind::Scenery
    }

    /// Soccer balls bounce off push-soccer surfaces
    fn on_hit(&mut self, ctx: &ReactionContext, material: Option<&Material>, normal: Vec3) -> ReactionEffect {
        match material {
            Some(m) if ctx.is_soccer_ball && m.collision_reaction == CollisionReaction::PushSoccer => {
                ReactionEffect::Impulse(normal * ctx.mass * ctx.soccer_push_factor)
            }
            _ => ReactionEffect::None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Explosive;

impl ObjectReaction for Explosive {
    fn kind(&self) -> ReactionKind {
        ReactionKind::Explosive
    }

    fn on_explosion(&mut self, ctx: &ReactionContext, position: Vec3, direct_hit: bool) -> ReactionEffect {
        if direct_hit {
            return ReactionEffect::Impulse(Vec3::Y * ctx.explosion_impulse);
        }

        // diff * impulse / |diff|^2, a 1/r falloff
        let diff = ctx.position - position;
        let len2 = diff.length_squared();
        if len2 <= f32::EPSILON {
            return ReactionEffect::Impulse(Vec3::Y * ctx.explosion_impulse);
        }
        ReactionEffect::Impulse(diff * ctx.explosion_impulse / len2)
    }
}

#[derive(Debug)]
pub struct Destructible {
    max_hit_points: u32,
    hit_points: u32,
}

impl Destructible {
    pub fn new(hit_points: u32) -> Self {
        let hit_points = hit_points.max(1);
        Self {
            max_hit_points: hit_points,
            hit_points,
        }
    }

    pub fn hit_points(&self) -> u32 {
        self.hit_points
    }

    fn damage(&mut self, amount: u32) -> ReactionEffect {
        if self.hit_points == 0 {
            return ReactionEffect::None;
        }
        self.hit_points = self.hit_points.saturating_sub(amount);
        debug!("Destructible object damaged, {} hit points left", self.hit_points);
        if self.hit_points == 0 {
            ReactionEffect::Break
        } else {
            ReactionEffect::None
        }
    }
}

impl ObjectReaction for Destructible {
    fn kind(&self) -> ReactionKind {
        ReactionKind::Destructible
    }

    fn on_hit(&mut self, _ctx: &ReactionContext, _material: Option<&Material>, _normal: Vec3) -> ReactionEffect {
        self.damage(1)
    }

    fn on_explosion(&mut self, _ctx: &ReactionContext, _position: Vec3, direct_hit: bool) -> ReactionEffect {
        if direct_hit {
            self.damage(self.hit_points)
        } else {
            self.damage(1)
        }
    }

    fn on_reset(&mut self) {
        self.hit_points = self.max_hit_points;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ReactionContext {
        ReactionContext {
            position: Vec3::new(0.0, 1.0, 0.0),
            mass: 2.0,
            is_soccer_ball: false,
            explosion_impulse: 100.0,
            soccer_push_factor: 5.0,
        }
    }

    #[test]
    fn test_scenery_ignores_explosions() {
        let mut scenery = Scenery;
        assert_eq!(scenery.on_explosion(&context(), Vec3::ZERO, true), ReactionEffect::None);
    }

    #[test]
    fn test_soccer_ball_pushed_by_goal_wall() {
        let wall = Material::new("goal").with_collision_reaction(CollisionReaction::PushSoccer);
        let mut scenery = Scenery;
        let mut ctx = context();

        assert_eq!(scenery.on_hit(&ctx, Some(&wall), Vec3::X), ReactionEffect::None);

        ctx.is_soccer_ball = true;
        assert_eq!(
            scenery.on_hit(&ctx, Some(&wall), Vec3::X),
            ReactionEffect::Impulse(Vec3::new(10.0, 0.0, 0.0))
        );
        assert_eq!(scenery.on_hit(&ctx, Some(&Material::new("grass")), Vec3::X), ReactionEffect::None);
        assert_eq!(scenery.on_hit(&ctx, None, Vec3::X), ReactionEffect::None);
    }

    #[test]
    fn test_explosive_impulses() {
        let mut explosive = Explosive;
        let ctx = context();
        assert_eq!(
            explosive.on_explosion(&ctx, Vec3::ZERO, true),
            ReactionEffect::Impulse(Vec3::new(0.0, 100.0, 0.0))
        );
        // 2 units away: diff (0, 2, 0) * 100 / 4
        assert_eq!(
            explosive.on_explosion(&ctx, Vec3::new(0.0, -1.0, 0.0), false),
            ReactionEffect::Impulse(Vec3::new(0.0, 50.0, 0.0))
        );
    }

    #[test]
    fn test_destructible_breaks_and_recovers() {
        let mut crate_ = Destructible::new(2);
        let ctx = context();
        assert_eq!(crate_.on_hit(&ctx, None, Vec3::Y), ReactionEffect::None);
        assert_eq!(crate_.on_hit(&ctx, None, Vec3::Y), ReactionEffect::Break);
        // Already broken
        assert_eq!(crate_.on_hit(&ctx, None, Vec3::Y), ReactionEffect::None);

        crate_.on_reset();
        assert_eq!(crate_.hit_points(), 2);
        assert_eq!(crate_.on_explosion(&ctx, Vec3::ZERO, true), ReactionEffect::Break);
    }

    #[test]
    fn test_reaction_kind_parsing() {
        assert_eq!("explosive".parse::<ReactionKind>().unwrap(), ReactionKind::Explosive);
        assert!("wobbly".parse::<ReactionKind>().is_err());
        assert_eq!(reaction_for(ReactionKind::Destructible, 3).kind(), ReactionKind::Destructible);
    }
}
