//! Worker-strategy collision demo
//!
//! The same falling-ellipsoid setup as the inline demo, but resolution
//! happens on a worker thread against a snapshot cache: requests go out,
//! the frame loop keeps running, and callbacks fire from the poll point.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use collision_engine::prelude::*;

fn main() {
    env_logger::init();
    log::info!("Building demo scene...");

    let mut scene = Scene::new();
    let ground_geometry = Geometry::ground_plane("ground", 50.0);
    let ground = Arc::new(ground_geometry.clone());
    let floor_key = scene.add_mesh(SceneMesh::new("floor", ground).with_check_collisions(true));

    let config = CollisionConfig::new().with_strategy(CollisionStrategy::Worker);
    let mut coordinator = create_coordinator(&config);

    // Snapshot the scene for the worker before sharing it.
    coordinator.on_geometry_added(&ground_geometry);
    let floor = scene.mesh(floor_key).expect("floor exists").clone();

    let scene = Arc::new(RwLock::new(scene));
    coordinator.init(Arc::clone(&scene)).expect("coordinator init");
    coordinator.on_mesh_added(&floor);
    coordinator.after_render();

    let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
    let resolved = Arc::new(RwLock::new(false));
    let flag = Arc::clone(&resolved);

    log::info!("Dispatching collision request...");
    coordinator.get_new_position(
        &Vec3::new(0.0, 8.0, 0.0),
        &Vec3::new(0.0, -12.0, 0.0),
        &mut collider,
        config.default_max_retry,
        None,
        Box::new(move |id, position, mesh| {
            let against = mesh.map_or("nothing", SceneMesh::name);
            log::info!("request {id}: came to rest at {position} against {against}");
            *flag.write().unwrap() = true;
        }),
        1,
    );

    // A stand-in frame loop: flush updates and poll replies each "frame".
    let mut frames = 0;
    while !*resolved.read().unwrap() && frames < 500 {
        coordinator.after_render();
        coordinator.poll_replies();
        std::thread::sleep(Duration::from_millis(4));
        frames += 1;
    }

    if *resolved.read().unwrap() {
        log::info!("Resolved after {frames} frames");
    } else {
        log::error!("No reply from collision worker");
    }

    coordinator.destroy();
    log::info!("Done");
}
