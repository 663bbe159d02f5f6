//! Snapshot cache of the worker strategy
//!
//! Key-value stores mapping mesh identity to [`SerializedMesh`] and
//! geometry identity to [`SerializedGeometry`]. The cache lives inside the
//! worker context, is mutated only by batched update messages and is
//! read-only while a collision resolves. Entries are replaced wholesale on
//! upsert and only disappear through an explicit removal.

use std::collections::HashMap;

use crate::collision::collider::{collision_transform, Collider};
use crate::collision::serialize::{SerializedGeometry, SerializedMesh};
use crate::collision::solver::CandidateSource;
use crate::foundation::math::{matrix_from_array, vector_from_array};
use crate::scene::GeometryId;

/// Worker-side store of mesh and geometry snapshots
#[derive(Debug, Default)]
pub struct CollisionCache {
    meshes: HashMap<u64, SerializedMesh>,
    geometries: HashMap<GeometryId, SerializedGeometry>,
}

impl CollisionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace a mesh snapshot
    pub fn add_mesh(&mut self, mesh: SerializedMesh) {
        self.meshes.insert(mesh.unique_id, mesh);
    }

    /// Remove a mesh snapshot; absent ids are a no-op
    pub fn remove_mesh(&mut self, unique_id: u64) {
        self.meshes.remove(&unique_id);
    }

    /// Look up a mesh snapshot
    pub fn mesh(&self, unique_id: u64) -> Option<&SerializedMesh> {
        self.meshes.get(&unique_id)
    }

    /// Iterate over all cached meshes
    pub fn meshes(&self) -> impl Iterator<Item = &SerializedMesh> {
        self.meshes.values()
    }

    /// Insert or fully replace a geometry snapshot
    pub fn add_geometry(&mut self, geometry: SerializedGeometry) {
        self.geometries.insert(geometry.id.clone(), geometry);
    }

    /// Remove a geometry snapshot; absent ids are a no-op
    pub fn remove_geometry(&mut self, id: &str) {
        self.geometries.remove(id);
    }

    /// Look up a geometry snapshot
    pub fn geometry(&self, id: &str) -> Option<&SerializedGeometry> {
        self.geometries.get(id)
    }

    /// Number of cached meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Narrow-phase entry for one cached mesh, the snapshot twin of the
    /// live-scene walk
    fn check_mesh_collision(&self, collider: &mut Collider, mesh: &SerializedMesh) {
        if !collider.can_do_collision(
            &vector_from_array(mesh.sphere_center),
            mesh.sphere_radius,
            &vector_from_array(mesh.box_minimum),
            &vector_from_array(mesh.box_maximum),
        ) {
            return;
        }

        let Some(geometry_id) = &mesh.geometry_id else {
            log::trace!("cached mesh '{}' has no geometry id, skipping", mesh.name);
            return;
        };
        let Some(geometry) = self.geometries.get(geometry_id) else {
            log::warn!(
                "geometry '{}' missing from collision cache, skipping mesh '{}'",
                geometry_id,
                mesh.name
            );
            return;
        };

        let world_matrix = matrix_from_array(&mesh.world_matrix);
        let transform = collision_transform(&world_matrix, &collider.radius);
        for sub_mesh in &mesh.sub_meshes {
            collider.collide_sub_mesh(
                &transform,
                &geometry.positions,
                &geometry.indices,
                sub_mesh.vertices_start,
                sub_mesh.vertices_count,
                sub_mesh.index_start,
                sub_mesh.index_count,
                sub_mesh.has_material,
                mesh.unique_id,
            );
        }
    }
}

impl CandidateSource for CollisionCache {
    fn collide_candidates(&self, collider: &mut Collider, excluded_mesh_id: Option<u64>) {
        for mesh in self.meshes.values() {
            if !mesh.check_collisions {
                continue;
            }
            if excluded_mesh_id == Some(mesh.unique_id) {
                continue;
            }
            self.check_mesh_collision(collider, mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::serialize::{serialize_geometry, serialize_mesh};
    use crate::collision::solver::collide_with_world;
    use crate::foundation::math::Vec3;
    use crate::scene::{Geometry, Scene, SceneMesh};

    fn cached_floor(half_extent: f32) -> CollisionCache {
        let mut scene = Scene::new();
        let geometry = Geometry::ground_plane("ground", half_extent);
        let shared = geometry.clone().into_shared();
        let key = scene.add_mesh(SceneMesh::new("floor", shared).with_check_collisions(true));

        let mut cache = CollisionCache::new();
        cache.add_geometry(serialize_geometry(&geometry));
        cache.add_mesh(serialize_mesh(scene.mesh(key).unwrap()));
        cache
    }

    #[test]
    fn cached_floor_stops_falling_collider() {
        let cache = cached_floor(50.0);
        let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
        let finale = collide_with_world(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.0, -10.0, 0.0),
            &mut collider,
            3,
            &cache,
            None,
        );
        assert!(collider.collision_found);
        assert!(finale.y >= 1.0 - 0.01);
    }

    #[test]
    fn upsert_replaces_mesh_wholesale() {
        let mut cache = cached_floor(50.0);
        let unique_id = cache.meshes().next().unwrap().unique_id;

        // Overwrite with a snapshot that no longer collides and carries no
        // sub-meshes.
        let mut replacement = cache.mesh(unique_id).unwrap().clone();
        replacement.check_collisions = false;
        replacement.sub_meshes.clear();
        cache.add_mesh(replacement);

        assert_eq!(cache.mesh_count(), 1);
        let stored = cache.mesh(unique_id).unwrap();
        assert!(!stored.check_collisions);
        assert!(stored.sub_meshes.is_empty());
    }

    #[test]
    fn non_colliding_cached_mesh_is_passed_through() {
        let mut cache = cached_floor(50.0);
        let unique_id = cache.meshes().next().unwrap().unique_id;
        let mut snapshot = cache.mesh(unique_id).unwrap().clone();
        snapshot.check_collisions = false;
        cache.add_mesh(snapshot);

        let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
        let position = Vec3::new(0.0, 5.0, 0.0);
        let velocity = Vec3::new(0.0, -10.0, 0.0);
        let finale = collide_with_world(position, velocity, &mut collider, 3, &cache, None);
        assert!(!collider.collision_found);
        assert_eq!(finale, position + velocity);
    }

    #[test]
    fn missing_geometry_skips_mesh_without_failing() {
        let mut cache = cached_floor(50.0);
        cache.remove_geometry("ground");

        let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
        let position = Vec3::new(0.0, 5.0, 0.0);
        let velocity = Vec3::new(0.0, -10.0, 0.0);
        let finale = collide_with_world(position, velocity, &mut collider, 3, &cache, None);
        assert!(!collider.collision_found);
        assert_eq!(finale, position + velocity);
    }

    #[test]
    fn removal_of_absent_ids_is_idempotent() {
        let mut cache = CollisionCache::new();
        cache.remove_mesh(42);
        cache.remove_geometry("nothing");
        assert_eq!(cache.mesh_count(), 0);
    }

    #[test]
    fn excluded_cached_mesh_is_skipped() {
        let cache = cached_floor(50.0);
        let unique_id = cache.meshes().next().unwrap().unique_id;

        let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
        let position = Vec3::new(0.0, 5.0, 0.0);
        let velocity = Vec3::new(0.0, -10.0, 0.0);
        let finale =
            collide_with_world(position, velocity, &mut collider, 3, &cache, Some(unique_id));
        assert_eq!(finale, position + velocity);
    }
}
