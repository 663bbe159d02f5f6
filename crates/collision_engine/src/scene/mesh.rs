//! Collidable scene meshes
//!
//! A [`SceneMesh`] is the live-scene view of a collidable object: a world
//! transform, precomputed world-space bounds, a list of sub-mesh ranges and
//! a shared reference to the triangle geometry they index into. Collision
//! shapes stay in model space and are transformed on demand during tests.

use std::sync::Arc;

use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::scene::geometry::Geometry;

/// A contiguous vertex/index range of a mesh, tested as one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMesh {
    /// First vertex of the range
    pub vertices_start: u32,
    /// Number of vertices in the range
    pub vertices_count: u32,
    /// First index of the range
    pub index_start: u32,
    /// Number of indices in the range
    pub index_count: u32,
    /// Whether a material is bound; material-less sub-meshes are only hit
    /// on their front faces
    pub has_material: bool,
}

impl SubMesh {
    /// A single sub-mesh covering the whole geometry
    pub fn covering(geometry: &Geometry) -> Self {
        Self {
            vertices_start: 0,
            vertices_count: geometry.vertex_count(),
            index_start: 0,
            index_count: geometry.index_count(),
            has_material: false,
        }
    }

    /// Builder-style setter for the material flag
    pub fn with_material(mut self, has_material: bool) -> Self {
        self.has_material = has_material;
        self
    }
}

/// Precomputed world-space bounding volumes of a mesh
#[derive(Debug, Clone, Copy)]
pub struct BoundingInfo {
    /// Bounding sphere center in world space
    pub sphere_center: Vec3,
    /// Bounding sphere radius in world space
    pub sphere_radius: f32,
    /// Minimum corner of the world-space bounding box
    pub box_minimum: Vec3,
    /// Maximum corner of the world-space bounding box
    pub box_maximum: Vec3,
}

impl BoundingInfo {
    /// Compute world-space bounds for a geometry under a world transform.
    ///
    /// The sphere is centered on the box and circumscribes it. An empty
    /// position stream yields degenerate zero bounds.
    pub fn from_geometry(geometry: &Geometry, world_matrix: &Mat4) -> Self {
        let mut minimum = Vec3::repeat(f32::MAX);
        let mut maximum = Vec3::repeat(f32::MIN);
        for chunk in geometry.positions.chunks_exact(3) {
            let p = world_matrix.transform_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
            minimum = minimum.inf(&p.coords);
            maximum = maximum.sup(&p.coords);
        }
        if geometry.positions.len() < 3 {
            return Self::default();
        }
        let sphere_center = (minimum + maximum) * 0.5;
        let sphere_radius = (maximum - sphere_center).norm();
        Self {
            sphere_center,
            sphere_radius,
            box_minimum: minimum,
            box_maximum: maximum,
        }
    }
}

impl Default for BoundingInfo {
    fn default() -> Self {
        Self {
            sphere_center: Vec3::zeros(),
            sphere_radius: 0.0,
            box_minimum: Vec3::zeros(),
            box_maximum: Vec3::zeros(),
        }
    }
}

/// A collidable object of the live scene
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub(crate) unique_id: u64,
    name: String,
    /// Whether the mesh participates in the scene at all
    pub enabled: bool,
    /// Whether the mesh blocks moving colliders
    pub check_collisions: bool,
    /// Sub-mesh ranges tested during the narrow phase
    pub sub_meshes: Vec<SubMesh>,
    world_matrix: Mat4,
    bounding: BoundingInfo,
    geometry: Option<Arc<Geometry>>,
}

impl SceneMesh {
    /// Create a mesh over a shared geometry, with a single sub-mesh
    /// covering the whole geometry and an identity world transform
    pub fn new(name: impl Into<String>, geometry: Arc<Geometry>) -> Self {
        let bounding = BoundingInfo::from_geometry(&geometry, &Mat4::identity());
        let sub_meshes = vec![SubMesh::covering(&geometry)];
        Self {
            unique_id: 0,
            name: name.into(),
            enabled: true,
            check_collisions: false,
            sub_meshes,
            world_matrix: Mat4::identity(),
            bounding,
            geometry: Some(geometry),
        }
    }

    /// Create a mesh with no geometry attached
    pub fn without_geometry(name: impl Into<String>) -> Self {
        Self {
            unique_id: 0,
            name: name.into(),
            enabled: true,
            check_collisions: false,
            sub_meshes: Vec::new(),
            world_matrix: Mat4::identity(),
            bounding: BoundingInfo::default(),
            geometry: None,
        }
    }

    /// Builder-style setter for collision participation
    pub fn with_check_collisions(mut self, check_collisions: bool) -> Self {
        self.check_collisions = check_collisions;
        self
    }

    /// Builder-style setter for the world transform
    pub fn with_world_matrix(mut self, world_matrix: Mat4) -> Self {
        self.set_world_matrix(world_matrix);
        self
    }

    /// Scene-wide unique id, assigned when the mesh is added to a scene
    pub fn unique_id(&self) -> u64 {
        self.unique_id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the mesh participates in the scene
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Cached world transform
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// Replace the world transform and refresh the world-space bounds.
    ///
    /// Callers using a worker-strategy coordinator must forward the change
    /// through `on_mesh_updated` so the snapshot cache stays current.
    pub fn set_world_matrix(&mut self, world_matrix: Mat4) {
        self.world_matrix = world_matrix;
        if let Some(geometry) = &self.geometry {
            self.bounding = BoundingInfo::from_geometry(geometry, &self.world_matrix);
        }
    }

    /// Precomputed world-space bounds
    pub fn bounding(&self) -> &BoundingInfo {
        &self.bounding
    }

    /// Shared geometry, if any
    pub fn geometry(&self) -> Option<&Arc<Geometry>> {
        self.geometry.as_ref()
    }
}
