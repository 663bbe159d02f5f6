//! Inline collision demo
//!
//! Drops an ellipsoid onto a ground plane next to a wall and resolves its
//! motion synchronously on the main thread.

use std::sync::{Arc, RwLock};

use collision_engine::prelude::*;
use nalgebra::Rotation3;

fn build_scene() -> Scene {
    let mut scene = Scene::new();

    let ground = Geometry::ground_plane("ground", 50.0).into_shared();
    scene.add_mesh(SceneMesh::new("floor", ground).with_check_collisions(true));

    // The same plane geometry, stood upright as a two-sided wall at z = 5.
    let wall_geometry = Geometry::ground_plane("wall", 10.0).into_shared();
    let wall_matrix = Mat4::new_translation(&Vec3::new(0.0, 0.0, 5.0))
        * Rotation3::from_euler_angles(std::f32::consts::FRAC_PI_2, 0.0, 0.0).to_homogeneous();
    let mut wall = SceneMesh::new("wall", wall_geometry)
        .with_check_collisions(true)
        .with_world_matrix(wall_matrix);
    wall.sub_meshes[0] = wall.sub_meshes[0].with_material(true);
    scene.add_mesh(wall);

    scene
}

fn main() {
    env_logger::init();
    log::info!("Building demo scene...");
    let scene = Arc::new(RwLock::new(build_scene()));

    let config = CollisionConfig::new().with_strategy(CollisionStrategy::Inline);
    let mut coordinator = create_coordinator(&config);
    coordinator.init(Arc::clone(&scene)).expect("coordinator init");

    let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
    let start = Vec3::new(0.0, 8.0, 0.0);
    let fall = Vec3::new(0.0, -12.0, 2.0);

    log::info!("Resolving fall from {start} with velocity {fall}...");
    coordinator.get_new_position(
        &start,
        &fall,
        &mut collider,
        config.default_max_retry,
        None,
        Box::new(|id, position, mesh| {
            let against = mesh.map_or("nothing", SceneMesh::name);
            log::info!("request {id}: came to rest at {position} against {against}");
        }),
        0,
    );

    coordinator.destroy();
    log::info!("Done");
}
