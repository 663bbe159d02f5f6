//! Live scene model
//!
//! The minimal scene-graph surface the collision subsystem consumes: an
//! enumerable set of collidable meshes with stable keys and wire-friendly
//! unique ids, plus the shared geometry buffers they reference.
//!
//! # Key Types
//!
//! - [`Scene`] - slotmap-backed mesh container handed to coordinators as
//!   `Arc<RwLock<Scene>>`
//! - [`SceneMesh`] - per-object transform, bounds and sub-mesh ranges
//! - [`Geometry`] - flat position/normal/index streams shared via `Arc`

pub mod geometry;
pub mod mesh;

pub use geometry::{Geometry, GeometryId};
pub use mesh::{BoundingInfo, SceneMesh, SubMesh};

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable handle of a mesh inside a [`Scene`]
    pub struct MeshKey;
}

/// Container of the collidable meshes of one scene.
///
/// Meshes get a monotonically increasing `u64` unique id on insertion; the
/// id is what crosses the wire to the collision worker, while [`MeshKey`]
/// stays valid across removals for local bookkeeping.
#[derive(Debug)]
pub struct Scene {
    meshes: SlotMap<MeshKey, SceneMesh>,
    next_unique_id: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self {
            meshes: SlotMap::with_key(),
            next_unique_id: 1,
        }
    }

    /// Add a mesh, assigning its unique id
    pub fn add_mesh(&mut self, mut mesh: SceneMesh) -> MeshKey {
        mesh.unique_id = self.next_unique_id;
        self.next_unique_id += 1;
        self.meshes.insert(mesh)
    }

    /// Remove a mesh, returning it if the key was live
    pub fn remove_mesh(&mut self, key: MeshKey) -> Option<SceneMesh> {
        self.meshes.remove(key)
    }

    /// Look up a mesh by key
    pub fn mesh(&self, key: MeshKey) -> Option<&SceneMesh> {
        self.meshes.get(key)
    }

    /// Look up a mesh by key, mutably
    pub fn mesh_mut(&mut self, key: MeshKey) -> Option<&mut SceneMesh> {
        self.meshes.get_mut(key)
    }

    /// Resolve a mesh by its wire-protocol unique id.
    ///
    /// Linear scan; the candidate walk during resolution is linear as well.
    pub fn mesh_by_unique_id(&self, unique_id: u64) -> Option<&SceneMesh> {
        self.meshes.values().find(|m| m.unique_id == unique_id)
    }

    /// Iterate over all meshes
    pub fn meshes(&self) -> impl Iterator<Item = &SceneMesh> {
        self.meshes.values()
    }

    /// Number of meshes in the scene
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}
