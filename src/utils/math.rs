use glam::{EulerRot, Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::{Isometry, Point, Real, Vector};
use std::fmt;

/// Axis-aligned bounding box in the local space of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any point will grow
    pub fn empty() -> Self {
        Self::new(Vec3::splat(f32::MAX), Vec3::splat(f32::MIN))
    }

    /// Box centred on the origin
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self::new(-half_extents, half_extents)
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.grow(p);
        }
        bbox
    }

    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Full size along each axis
    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            0.5 * (self.max + self.min)
        }
    }

    /// Component-wise scale. Negative factors keep min <= max.
    pub fn scaled(&self, scale: Vec3) -> Self {
        if self.is_empty() {
            return *self;
        }
        let a = self.min * scale;
        let b = self.max * scale;
        Self::new(a.min(b), a.max(b))
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.min, self.max)
    }
}

// -----------------------------------------------------------------------------
// glam <-> rapier (nalgebra) conversions
// -----------------------------------------------------------------------------

pub fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub fn to_point(v: Vec3) -> Point<Real> {
    Point::new(v.x, v.y, v.z)
}

pub fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn from_point(p: &Point<Real>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub fn to_rotation(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn from_rotation(q: &UnitQuaternion<Real>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

pub fn to_isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    Isometry::from_parts(Translation3::new(position.x, position.y, position.z), to_rotation(rotation))
}

/// Splits an engine transform into (translation, rotation)
pub fn from_isometry(iso: &Isometry<Real>) -> (Vec3, Quat) {
    (from_vector(&iso.translation.vector), from_rotation(&iso.rotation))
}

/// Heading/pitch/roll in degrees (rotation about X, Y, Z, applied X first) to a quaternion
pub fn hpr_degrees_to_quat(hpr: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        hpr.z.to_radians(),
        hpr.y.to_radians(),
        hpr.x.to_radians(),
    )
}

pub fn quat_to_hpr_degrees(q: Quat) -> Vec3 {
    let (z, y, x) = q.to_euler(EulerRot::ZYX);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// Utility functions for parsing attribute values of scene records
pub mod parsing {
    use super::*;

    /// Parse a boolean value
    pub fn parse_bool(value: &str) -> Result<bool, String> {
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(true),
            "false" | "0" | "no" | "n" => Ok(false),
            _ => Err(format!("Invalid boolean value: {}", value)),
        }
    }

    /// Parse a float value
    pub fn parse_f32(value: &str) -> Result<f32, String> {
        value
            .trim()
            .parse::<f32>()
            .map_err(|e| format!("Invalid number: {} - {}", value, e))
    }

    /// Parse a vector from "x y z" or "x, y, z"
    pub fn parse_vec3(value: &str) -> Result<Vec3, String> {
        let coords: Result<Vec<f32>, _> = value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f32>())
            .collect();

        match coords {
            Ok(coords) if coords.len() == 3 => Ok(Vec3::new(coords[0], coords[1], coords[2])),
            _ => Err(format!("Invalid vector format: {}", value)),
        }
    }
}
