//! Shared triangle geometry

use std::sync::Arc;

/// Identity of a geometry, shared between the live scene and serialized
/// snapshots.
pub type GeometryId = String;

/// Triangulated vertex data, shared by reference across every mesh that
/// instances it.
///
/// Attribute streams are flat 32-bit buffers: three floats per position or
/// normal, three indices per triangle.
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Unique identity of this geometry
    pub id: GeometryId,
    /// Flat position stream (x, y, z per vertex)
    pub positions: Vec<f32>,
    /// Flat normal stream (x, y, z per vertex); may be empty
    pub normals: Vec<f32>,
    /// Flat triangle index stream
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Create a geometry from flat attribute streams
    pub fn new(
        id: impl Into<GeometryId>,
        positions: Vec<f32>,
        normals: Vec<f32>,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            id: id.into(),
            positions,
            normals,
            indices,
        }
    }

    /// Number of vertices in the position stream
    pub fn vertex_count(&self) -> u32 {
        (self.positions.len() / 3) as u32
    }

    /// Number of indices in the index stream
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Wrap this geometry for shared ownership between meshes
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// A square plane in Y = 0 spanning `[-half_extent, half_extent]` on X
    /// and Z, as two triangles.
    ///
    /// Indices wind clockwise seen from +Y, matching the collider's winding
    /// convention, so the contact side of the plane faces up.
    pub fn ground_plane(id: impl Into<GeometryId>, half_extent: f32) -> Self {
        let s = half_extent;
        let positions = vec![
            -s, 0.0, -s, // 0
            -s, 0.0, s, // 1
            s, 0.0, s, // 2
            s, 0.0, -s, // 3
        ];
        let normals = vec![
            0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0,
        ];
        let indices = vec![0, 2, 1, 0, 3, 2];
        Self::new(id, positions, normals, indices)
    }
}
