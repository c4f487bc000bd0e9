use crate::assets::material::Material;
use crate::utils::math::BoundingBox;
use glam::Vec3;
use std::sync::Arc;

/// One draw batch of a render mesh: triangles sharing a material
#[derive(Debug, Clone, Default)]
pub struct MeshBuffer {
    pub positions: Vec<Vec3>,
    /// Per-vertex normals; may be empty, face normals are used then
    pub normals: Vec<Vec3>,
    /// Triangle list, three indices per triangle
    pub indices: Vec<u32>,
    pub material: Option<Arc<Material>>,
}

impl MeshBuffer {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns the vertices and normals of triangle `i`, or `None` if the
    /// indices point outside the vertex data
    pub fn triangle(&self, i: usize) -> Option<([Vec3; 3], [Vec3; 3])> {
        let idx = self.indices.get(3 * i..3 * i + 3)?;
        let v = [
            *self.positions.get(idx[0] as usize)?,
            *self.positions.get(idx[1] as usize)?,
            *self.positions.get(idx[2] as usize)?,
        ];
        let n = match (
            self.normals.get(idx[0] as usize),
            self.normals.get(idx[1] as usize),
            self.normals.get(idx[2] as usize),
        ) {
            (Some(a), Some(b), Some(c)) => [*a, *b, *c],
            _ => {
                let face = (v[1] - v[0]).cross(v[2] - v[0]).normalize_or_zero();
                [face; 3]
            }
        };
        Some((v, n))
    }
}

/// Render geometry of a track object, as far as physics needs it
#[derive(Debug, Clone, Default)]
pub struct RenderMesh {
    pub name: String,
    pub buffers: Vec<MeshBuffer>,
}

impl RenderMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffers: Vec::new(),
        }
    }

    pub fn with_buffer(mut self, buffer: MeshBuffer) -> Self {
        self.buffers.push(buffer);
        self
    }

    /// Min/max over all vertices of all buffers
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.buffers.iter().flat_map(|b| b.positions.iter().copied()))
    }

    pub fn triangle_count(&self) -> usize {
        self.buffers.iter().map(MeshBuffer::triangle_count).sum()
    }

    /// Closed box mesh spanning `min..max`, outward-facing triangles
    pub fn cuboid(name: impl Into<String>, min: Vec3, max: Vec3, material: Option<Arc<Material>>) -> Self {
        let positions = vec![
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1,  0, 3, 2, // -z
            4, 5, 6,  4, 6, 7, // +z
            0, 1, 5,  0, 5, 4, // -y
            3, 7, 6,  3, 6, 2, // +y
            0, 4, 7,  0, 7, 3, // -x
            1, 2, 6,  1, 6, 5, // +x
        ];

        Self::new(name).with_buffer(MeshBuffer {
            positions,
            normals: Vec::new(),
            indices,
            material,
        })
    }

    /// Single-sided quad in the XZ plane at height `y`, facing +Y
    pub fn ground_quad(name: impl Into<String>, half_size: f32, y: f32, material: Option<Arc<Material>>) -> Self {
        let positions = vec![
            Vec3::new(-half_size, y, -half_size),
            Vec3::new(half_size, y, -half_size),
            Vec3::new(half_size, y, half_size),
            Vec3::new(-half_size, y, half_size),
        ];
        Self::new(name).with_buffer(MeshBuffer {
            normals: vec![Vec3::Y; 4],
            positions,
            indices: vec![0, 2, 1, 0, 3, 2],
            material,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_bounding_box() {
        let mesh = RenderMesh::cuboid("crate", Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0), None);
        assert_eq!(mesh.triangle_count(), 12);
        let bbox = mesh.bounding_box();
        assert_eq!(bbox.min, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_cuboid_faces_point_outward() {
        let mesh = RenderMesh::cuboid("crate", Vec3::splat(-1.0), Vec3::splat(1.0), None);
        let buffer = &mesh.buffers[0];
        for i in 0..buffer.triangle_count() {
            let (v, n) = buffer.triangle(i).unwrap();
            let centroid = (v[0] + v[1] + v[2]) / 3.0;
            assert!(n[0].dot(centroid) > 0.0, "triangle {} faces inward", i);
        }
    }

    #[test]
    fn test_ground_quad_faces_up() {
        let mesh = RenderMesh::ground_quad("ground", 10.0, 0.0, None);
        let (v, _) = mesh.buffers[0].triangle(0).unwrap();
        let face = (v[1] - v[0]).cross(v[2] - v[0]);
        assert!(face.y > 0.0);
    }

    #[test]
    fn test_out_of_range_index() {
        let buffer = MeshBuffer {
            positions: vec![Vec3::ZERO; 2],
            normals: Vec::new(),
            indices: vec![0, 1, 2],
            material: None,
        };
        assert!(buffer.triangle(0).is_none());
    }
}
