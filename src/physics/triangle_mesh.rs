use crate::assets::material::Material;
use crate::assets::mesh::RenderMesh;
use crate::physics::{PhysicsError, PhysicsResult};
use crate::utils::math::{to_point, BoundingBox};
use glam::Vec3;
use rapier3d::prelude::SharedShape;
use std::sync::Arc;
use tracing::{debug, warn};

/// Exact collision geometry of an object
///
/// Triangles are stored unshared, three vertices each, so that triangle `i`
/// of the collision shape is triangle `i` here. This keeps the per-triangle
/// material and the per-vertex normals addressable from a ray hit.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    name: String,
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    materials: Vec<Option<Arc<Material>>>,
    bounding_box: BoundingBox,
    shape: Option<SharedShape>,
}

impl TriangleMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            normals: Vec::new(),
            materials: Vec::new(),
            bounding_box: BoundingBox::empty(),
            shape: None,
        }
    }

    /// Adds a triangle. Has no effect on an already created collision shape.
    pub fn add_triangle(&mut self, vertices: [Vec3; 3], normals: [Vec3; 3], material: Option<Arc<Material>>) {
        for v in vertices {
            self.bounding_box.grow(v);
        }
        self.vertices.extend_from_slice(&vertices);
        self.normals.extend_from_slice(&normals);
        self.materials.push(material);
    }

    /// Collects the triangles of all buffers of `mesh`, scaled by `scale`
    pub fn from_render_mesh(mesh: &RenderMesh, scale: Vec3) -> Self {
        let mut triangle_mesh = Self::new(mesh.name.clone());
        // Normals transform with the inverse scale
        let inv_scale = Vec3::ONE / scale;

        for buffer in &mesh.buffers {
            for i in 0..buffer.triangle_count() {
                let Some((v, n)) = buffer.triangle(i) else {
                    warn!("Mesh '{}': triangle {} references missing vertices, skipped", mesh.name, i);
                    continue;
                };
                triangle_mesh.add_triangle(
                    v.map(|p| p * scale),
                    n.map(|n| (n * inv_scale).normalize_or_zero()),
                    buffer.material.clone(),
                );
            }
        }
        debug!(
            "Collected {} triangles from mesh '{}'",
            triangle_mesh.triangle_count(),
            mesh.name
        );
        triangle_mesh
    }

    /// Builds the engine shape from the triangles collected so far
    pub fn create_collision_shape(&mut self) -> PhysicsResult<&SharedShape> {
        if self.vertices.is_empty() {
            return Err(PhysicsError::MissingMeshData { id: self.name.clone() });
        }

        let points = self.vertices.iter().map(|v| to_point(*v)).collect();
        let indices = (0..self.triangle_count() as u32)
            .map(|t| [3 * t, 3 * t + 1, 3 * t + 2])
            .collect();
        let shape = SharedShape::trimesh(points, indices).map_err(|e| PhysicsError::InvalidMesh {
            name: self.name.clone(),
            reason: format!("{:?}", e),
        })?;

        let shape = self.shape.insert(shape);
        Ok(&*shape)
    }

    /// The engine shape, once `create_collision_shape` succeeded
    pub fn collision_shape(&self) -> Option<&SharedShape> {
        self.shape.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn triangle_count(&self) -> usize {
        self.materials.len()
    }

    pub fn material(&self, triangle: usize) -> Option<&Arc<Material>> {
        self.materials.get(triangle)?.as_ref()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Smooth normal at `point` (mesh space) on `triangle`, blended from the
    /// vertex normals by barycentric weights
    pub fn interpolated_normal(&self, triangle: usize, point: Vec3) -> Option<Vec3> {
        let v = self.vertices.get(3 * triangle..3 * triangle + 3)?;
        let n = self.normals.get(3 * triangle..3 * triangle + 3)?;

        let e0 = v[1] - v[0];
        let e1 = v[2] - v[0];
        let ep = point - v[0];
        let d00 = e0.dot(e0);
        let d01 = e0.dot(e1);
        let d11 = e1.dot(e1);
        let d20 = ep.dot(e0);
        let d21 = ep.dot(e1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() <= f32::EPSILON {
            // Degenerate triangle
            return Some(n[0]);
        }

        let b1 = (d11 * d20 - d01 * d21) / denom;
        let b2 = (d00 * d21 - d01 * d20) / denom;
        let b0 = 1.0 - b1 - b2;
        Some((n[0] * b0 + n[1] * b1 + n[2] * b2).normalize_or_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slanted_triangle() -> TriangleMesh {
        let mut mesh = TriangleMesh::new("tri");
        mesh.add_triangle(
            [Vec3::ZERO, Vec3::X, Vec3::Z],
            [Vec3::Y, Vec3::X, Vec3::Z],
            Some(Arc::new(Material::new("rock"))),
        );
        mesh
    }

    #[test]
    fn test_interpolated_normal_at_vertices() {
        let mesh = slanted_triangle();
        let at_v1 = mesh.interpolated_normal(0, Vec3::X).unwrap();
        assert!((at_v1 - Vec3::X).length() < 1e-5);

        let centre = mesh.interpolated_normal(0, Vec3::new(1.0 / 3.0, 0.0, 1.0 / 3.0)).unwrap();
        let expected = Vec3::ONE.normalize();
        assert!((centre - expected).length() < 1e-5);

        assert!(mesh.interpolated_normal(1, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_materials_per_triangle() {
        let mut mesh = slanted_triangle();
        mesh.add_triangle([Vec3::ZERO, Vec3::Y, Vec3::X], [Vec3::Z; 3], None);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.material(0).unwrap().name, "rock");
        assert!(mesh.material(1).is_none());
        assert!(mesh.material(2).is_none());
    }

    #[test]
    fn test_from_render_mesh_scales_vertices() {
        let render = RenderMesh::cuboid("crate", Vec3::splat(-1.0), Vec3::splat(1.0), None);
        let mesh = TriangleMesh::from_render_mesh(&render, Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.bounding_box().extent(), Vec3::new(4.0, 2.0, 2.0));
    }

    #[test]
    fn test_empty_mesh_has_no_shape() {
        let mut mesh = TriangleMesh::new("nothing");
        let err = mesh.create_collision_shape().unwrap_err();
        assert!(matches!(err, PhysicsError::MissingMeshData { .. }));
        assert!(mesh.collision_shape().is_none());
    }

    #[test]
    fn test_create_collision_shape() {
        let mut mesh = slanted_triangle();
        assert!(mesh.create_collision_shape().is_ok());
        assert!(mesh.collision_shape().is_some());
    }
}
