//! Iterative slide-and-retry resolution
//!
//! The solver is a fixed-point iteration with a hard cap: sweep against
//! every candidate, slide along the nearest obstruction, and retry with the
//! redirected motion until the residual velocity is negligible or the retry
//! budget runs out. Both execution strategies run this exact loop; they
//! differ only in the [`CandidateSource`] feeding it - the live scene here,
//! the snapshot cache on the worker side.

use crate::collision::collider::{collision_transform, Collider};
use crate::collision::COLLISIONS_EPSILON;
use crate::foundation::math::Vec3;
use crate::scene::{Scene, SceneMesh};

/// Supplier of candidate meshes for one resolution pass.
///
/// Implementations run the narrow phase against every eligible candidate,
/// accumulating the nearest impact on the collider.
pub trait CandidateSource {
    /// Test all eligible candidates, skipping `excluded_mesh_id`
    fn collide_candidates(&self, collider: &mut Collider, excluded_mesh_id: Option<u64>);
}

/// Resolve a motion request against `source`, returning the final position
/// in collider space.
///
/// `position` and `velocity` must already be divided by the collider
/// radius. The loop terminates within `maximum_retry + 1` passes: each pass
/// either finds the motion unobstructed (`position + velocity`), converges
/// below the close distance, or slides and retries with an incremented
/// retry counter. With `maximum_retry = 0` the input position is returned
/// untouched.
pub fn collide_with_world<S: CandidateSource + ?Sized>(
    mut position: Vec3,
    mut velocity: Vec3,
    collider: &mut Collider,
    maximum_retry: u32,
    source: &S,
    excluded_mesh_id: Option<u64>,
) -> Vec3 {
    let close_distance = COLLISIONS_EPSILON * 10.0;

    loop {
        if collider.retry >= maximum_retry {
            return position;
        }

        collider.initialize(position, velocity, close_distance);
        source.collide_candidates(collider, excluded_mesh_id);

        if !collider.collision_found {
            return position + velocity;
        }

        // A zero-velocity overlap has no direction to slide in.
        if velocity != Vec3::zeros() {
            collider.get_response(&mut position, &mut velocity);
        }

        if velocity.norm() <= close_distance {
            return position;
        }

        collider.retry += 1;
    }
}

impl CandidateSource for Scene {
    fn collide_candidates(&self, collider: &mut Collider, excluded_mesh_id: Option<u64>) {
        for mesh in self.meshes() {
            if !mesh.is_enabled() || !mesh.check_collisions || mesh.sub_meshes.is_empty() {
                continue;
            }
            if excluded_mesh_id == Some(mesh.unique_id()) {
                continue;
            }
            check_mesh_collision(collider, mesh);
        }
    }
}

/// Narrow-phase entry for one live mesh: bounding rejection, then every
/// sub-mesh range in collider space
fn check_mesh_collision(collider: &mut Collider, mesh: &SceneMesh) {
    let bounds = mesh.bounding();
    if !collider.can_do_collision(
        &bounds.sphere_center,
        bounds.sphere_radius,
        &bounds.box_minimum,
        &bounds.box_maximum,
    ) {
        return;
    }

    let Some(geometry) = mesh.geometry() else {
        log::trace!("mesh '{}' has no geometry, skipping", mesh.name());
        return;
    };

    let transform = collision_transform(mesh.world_matrix(), &collider.radius);
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
            mesh.unique_id(),
        );
    }
}
