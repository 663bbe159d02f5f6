//! Snapshot serialization
//!
//! Converts live meshes and geometries into flat, transferable descriptors
//! for the worker strategy. Both projections are pure: the same source
//! state always yields the same snapshot, and nothing on the live side is
//! touched. Vectors flatten to 3-element arrays and matrices to 16-element
//! column-major arrays; the inverse rebuild is bit-exact for finite values.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{matrix_to_array, vector_to_array};
use crate::scene::{Geometry, GeometryId, SceneMesh};

/// Snapshot of one sub-mesh range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedSubMesh {
    /// Index of this sub-mesh in the owning mesh's list
    pub position: u32,
    /// First vertex of the range
    pub vertices_start: u32,
    /// Number of vertices in the range
    pub vertices_count: u32,
    /// First index of the range
    pub index_start: u32,
    /// Number of indices in the range
    pub index_count: u32,
    /// Whether a material is bound (two-sided collision policy)
    pub has_material: bool,
}

/// Immutable snapshot of a collidable mesh.
///
/// Superseded wholesale whenever the source mesh changes; keyed by
/// `unique_id` in the worker cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedMesh {
    /// Wire identity of the source mesh
    pub unique_id: u64,
    /// Display name, for diagnostics only
    pub name: String,
    /// Identity of the referenced geometry; `None` for geometry-less meshes
    pub geometry_id: Option<GeometryId>,
    /// World-space bounding sphere center
    pub sphere_center: [f32; 3],
    /// World-space bounding sphere radius
    pub sphere_radius: f32,
    /// World-space bounding box minimum corner
    pub box_minimum: [f32; 3],
    /// World-space bounding box maximum corner
    pub box_maximum: [f32; 3],
    /// Cached world transform, column-major
    pub world_matrix: [f32; 16],
    /// Sub-mesh ranges, in list order
    pub sub_meshes: Vec<SerializedSubMesh>,
    /// Whether the mesh blocks moving colliders
    pub check_collisions: bool,
}

/// Immutable snapshot of a geometry's attribute streams.
///
/// Shared by every cached mesh that references the same id; superseded
/// wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGeometry {
    /// Wire identity of the source geometry
    pub id: GeometryId,
    /// Flat position stream
    pub positions: Vec<f32>,
    /// Flat normal stream; empty when the source has no normals
    pub normals: Vec<f32>,
    /// Flat triangle index stream
    pub indices: Vec<u32>,
}

/// Project a live mesh into its transferable snapshot
pub fn serialize_mesh(mesh: &SceneMesh) -> SerializedMesh {
    let sub_meshes = mesh
        .sub_meshes
        .iter()
        .enumerate()
        .map(|(idx, sm)| SerializedSubMesh {
            position: idx as u32,
            vertices_start: sm.vertices_start,
            vertices_count: sm.vertices_count,
            index_start: sm.index_start,
            index_count: sm.index_count,
            has_material: sm.has_material,
        })
        .collect();

    let bounds = mesh.bounding();
    SerializedMesh {
        unique_id: mesh.unique_id(),
        name: mesh.name().to_string(),
        geometry_id: mesh.geometry().map(|g| g.id.clone()),
        sphere_center: vector_to_array(&bounds.sphere_center),
        sphere_radius: bounds.sphere_radius,
        box_minimum: vector_to_array(&bounds.box_minimum),
        box_maximum: vector_to_array(&bounds.box_maximum),
        world_matrix: matrix_to_array(mesh.world_matrix()),
        sub_meshes,
        check_collisions: mesh.check_collisions,
    }
}

/// Project a live geometry into its transferable snapshot.
///
/// Absent attribute streams become empty buffers.
pub fn serialize_geometry(geometry: &Geometry) -> SerializedGeometry {
    SerializedGeometry {
        id: geometry.id.clone(),
        positions: geometry.positions.clone(),
        normals: geometry.normals.clone(),
        indices: geometry.indices.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{matrix_from_array, vector_from_array, Mat4, Vec3};
    use crate::scene::Scene;

    fn sample_mesh() -> SceneMesh {
        let geometry = Geometry::ground_plane("ground", 4.0).into_shared();
        SceneMesh::new("floor", geometry)
            .with_check_collisions(true)
            .with_world_matrix(Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0)))
    }

    #[test]
    fn mesh_snapshot_captures_identity_and_bounds() {
        let mut scene = Scene::new();
        let key = scene.add_mesh(sample_mesh());
        let mesh = scene.mesh(key).unwrap();

        let serialized = serialize_mesh(mesh);
        assert_eq!(serialized.unique_id, mesh.unique_id());
        assert_eq!(serialized.name, "floor");
        assert_eq!(serialized.geometry_id.as_deref(), Some("ground"));
        assert!(serialized.check_collisions);
        assert_eq!(serialized.sub_meshes.len(), 1);
        assert_eq!(serialized.sub_meshes[0].position, 0);
        assert_eq!(serialized.sub_meshes[0].index_count, 6);

        let center = vector_from_array(serialized.sphere_center);
        assert_eq!(center, mesh.bounding().sphere_center);
        let world = matrix_from_array(&serialized.world_matrix);
        assert_eq!(&world, mesh.world_matrix());
    }

    #[test]
    fn geometry_less_mesh_serializes_with_no_geometry_id() {
        let mut scene = Scene::new();
        let key = scene.add_mesh(SceneMesh::without_geometry("marker"));
        let serialized = serialize_mesh(scene.mesh(key).unwrap());
        assert_eq!(serialized.geometry_id, None);
        assert!(serialized.sub_meshes.is_empty());
    }

    #[test]
    fn geometry_snapshot_is_deterministic() {
        let geometry = Geometry::ground_plane("ground", 2.0);
        let a = serialize_geometry(&geometry);
        let b = serialize_geometry(&geometry);
        assert_eq!(a, b);
        assert_eq!(a.positions, geometry.positions);
        assert_eq!(a.indices, geometry.indices);
    }

    #[test]
    fn absent_attribute_streams_become_empty_buffers() {
        let geometry = Geometry::new("bare", vec![0.0, 0.0, 0.0], Vec::new(), Vec::new());
        let serialized = serialize_geometry(&geometry);
        assert!(serialized.normals.is_empty());
        assert!(serialized.indices.is_empty());
        assert_eq!(serialized.positions.len(), 3);
    }
}
