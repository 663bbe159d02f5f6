//! Collision coordinators
//!
//! The public face of the subsystem. Callers depend on the
//! [`CollisionCoordinator`] trait only; whether a request resolves
//! synchronously against the live scene ([`InlineCoordinator`]) or on a
//! worker thread against a snapshot cache ([`WorkerCoordinator`]) is an
//! initialization-time choice.
//!
//! The worker variant never blocks: `get_new_position` enqueues a request
//! keyed by a caller-chosen correlation id and returns; the matching
//! callback fires from a later `poll_replies` call on the caller's own
//! thread. Scene mutations are staged per frame and flushed as one batched
//! update from the `after_render` hook.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::collision::collider::Collider;
use crate::collision::error::CollisionError;
use crate::collision::protocol::{
    CollidePayload, ReplyError, SerializedCollider, TaskKind, UpdatePayload, WorkerReply,
    WorkerTask,
};
use crate::collision::serialize::{
    serialize_geometry, serialize_mesh, SerializedGeometry, SerializedMesh,
};
use crate::collision::solver::collide_with_world;
use crate::collision::worker::CollisionWorker;
use crate::foundation::math::{vector_from_array, vector_to_array, Vec3};
use crate::scene::{Geometry, GeometryId, Scene, SceneMesh};

/// Caller-assigned id matching an asynchronous reply to its request
pub type CorrelationId = u32;

/// Completion handler of one collision request.
///
/// Receives the correlation id, the final position in caller units, and the
/// live mesh that was hit, if any.
pub type CollisionCallback = Box<dyn FnOnce(CorrelationId, Vec3, Option<&SceneMesh>)>;

/// Scene handle shared between the owner and a coordinator
pub type SharedScene = Arc<RwLock<Scene>>;

/// Uniform request/response contract of the collision subsystem.
///
/// One instance serves one scene between `init` and `destroy`. Mesh and
/// geometry lifecycle notifications must be forwarded by the scene owner;
/// the inline strategy ignores them, the worker strategy stages them for
/// its snapshot cache.
pub trait CollisionCoordinator {
    /// Attach to a scene and start whatever execution context the strategy
    /// needs
    fn init(&mut self, scene: SharedScene) -> Result<(), CollisionError>;

    /// Detach from the scene and tear the execution context down
    fn destroy(&mut self);

    /// Resolve a motion request.
    ///
    /// `position` and `velocity` are in caller units; the collider carries
    /// the per-axis radius. The callback receives the final position, also
    /// in caller units. Inline strategy: the callback runs before this
    /// method returns. Worker strategy: the callback runs from a later
    /// `poll_replies`; a `collision_id` that is still outstanding drops the
    /// new request without registering its callback, so callers must keep
    /// ids unique until resolved.
    fn get_new_position(
        &mut self,
        position: &Vec3,
        velocity: &Vec3,
        collider: &mut Collider,
        maximum_retry: u32,
        excluded_mesh_id: Option<u64>,
        on_new_position: CollisionCallback,
        collision_id: CorrelationId,
    );

    /// A mesh entered the scene
    fn on_mesh_added(&mut self, mesh: &SceneMesh);
    /// A mesh moved or otherwise changed
    fn on_mesh_updated(&mut self, mesh: &SceneMesh);
    /// A mesh left the scene
    fn on_mesh_removed(&mut self, unique_id: u64);
    /// A geometry was created
    fn on_geometry_added(&mut self, geometry: &Geometry);
    /// A geometry's buffers changed
    fn on_geometry_updated(&mut self, geometry: &Geometry);
    /// A geometry was deleted
    fn on_geometry_deleted(&mut self, id: &str);

    /// End-of-frame hook; the worker strategy flushes its staged cache
    /// updates here
    fn after_render(&mut self);

    /// Message-dispatch point; the worker strategy delivers pending
    /// callbacks here
    fn poll_replies(&mut self);
}

/// Synchronous resolution against the live scene.
///
/// `get_new_position` blocks for the duration of the solve and invokes the
/// callback before returning. Lifecycle notifications are no-ops: there is
/// no cache to maintain.
#[derive(Default)]
pub struct InlineCoordinator {
    scene: Option<SharedScene>,
}

impl InlineCoordinator {
    /// Create an unattached inline coordinator
    pub fn new() -> Self {
        Self::default()
    }
}

impl CollisionCoordinator for InlineCoordinator {
    fn init(&mut self, scene: SharedScene) -> Result<(), CollisionError> {
        self.scene = Some(scene);
        Ok(())
    }

    fn destroy(&mut self) {
        self.scene = None;
    }

    fn get_new_position(
        &mut self,
        position: &Vec3,
        velocity: &Vec3,
        collider: &mut Collider,
        maximum_retry: u32,
        excluded_mesh_id: Option<u64>,
        on_new_position: CollisionCallback,
        collision_id: CorrelationId,
    ) {
        let Some(scene) = &self.scene else {
            log::error!("collision coordinator used before init");
            return;
        };

        let scaled_position = position.component_div(&collider.radius);
        let scaled_velocity = velocity.component_div(&collider.radius);

        collider.retry = 0;
        collider.initial_position = scaled_position;
        collider.initial_velocity = scaled_velocity;

        let scene = scene.read().unwrap();
        let final_position = collide_with_world(
            scaled_position,
            scaled_velocity,
            collider,
            maximum_retry,
            &*scene,
            excluded_mesh_id,
        );
        let final_position = final_position.component_mul(&collider.radius);

        let collided = collider
            .collided_mesh_id
            .and_then(|id| scene.mesh_by_unique_id(id));
        on_new_position(collision_id, final_position, collided);
    }

    fn on_mesh_added(&mut self, _mesh: &SceneMesh) {}
    fn on_mesh_updated(&mut self, _mesh: &SceneMesh) {}
    fn on_mesh_removed(&mut self, _unique_id: u64) {}
    fn on_geometry_added(&mut self, _geometry: &Geometry) {}
    fn on_geometry_updated(&mut self, _geometry: &Geometry) {}
    fn on_geometry_deleted(&mut self, _id: &str) {}
    fn after_render(&mut self) {}
    fn poll_replies(&mut self) {}
}

/// Asynchronous resolution on a worker thread.
///
/// Requests are correlated by caller-chosen ids; scene mutations are staged
/// and flushed once per frame as a single batched update. A reply carrying
/// a non-success code abandons its request: the callback is dropped and its
/// id slot only frees up at teardown. No timeout is enforced on outstanding
/// requests.
#[derive(Default)]
pub struct WorkerCoordinator {
    scene: Option<SharedScene>,
    worker: Option<CollisionWorker>,
    initialized: bool,
    running_updates: usize,
    pending: HashMap<CorrelationId, CollisionCallback>,
    staged_meshes: HashMap<u64, SerializedMesh>,
    staged_geometries: HashMap<GeometryId, SerializedGeometry>,
    removed_meshes: Vec<u64>,
    removed_geometries: Vec<GeometryId>,
}

impl WorkerCoordinator {
    /// Create an unattached worker coordinator
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the worker has acknowledged its init task
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of requests waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of update batches sent but not yet acknowledged
    pub fn running_update_count(&self) -> usize {
        self.running_updates
    }

    fn handle_reply(&mut self, reply: WorkerReply) {
        if reply.error != ReplyError::Success {
            // The matching request is abandoned; its callback slot stays
            // occupied until teardown.
            log::warn!("error returned from collision worker ({:?} task)", reply.task);
            return;
        }

        match reply.task {
            TaskKind::Init => {
                self.initialized = true;
            }
            TaskKind::Update => {
                self.running_updates = self.running_updates.saturating_sub(1);
            }
            TaskKind::Collide => {
                let Some(payload) = reply.payload else {
                    log::warn!("collision reply without payload, discarding");
                    return;
                };
                let Some(callback) = self.pending.remove(&payload.collision_id) else {
                    return;
                };
                let new_position = vector_from_array(payload.new_position);
                match self.scene.clone() {
                    Some(scene) => {
                        let scene = scene.read().unwrap();
                        let collided = payload
                            .collided_mesh_id
                            .and_then(|id| scene.mesh_by_unique_id(id));
                        callback(payload.collision_id, new_position, collided);
                    }
                    None => callback(payload.collision_id, new_position, None),
                }
            }
        }
    }
}

impl CollisionCoordinator for WorkerCoordinator {
    fn init(&mut self, scene: SharedScene) -> Result<(), CollisionError> {
        self.scene = Some(scene);
        let worker = CollisionWorker::spawn()?;
        worker.send(WorkerTask::Init)?;
        self.worker = Some(worker);
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.terminate();
        }
        self.pending.clear();
        self.staged_meshes.clear();
        self.staged_geometries.clear();
        self.removed_meshes.clear();
        self.removed_geometries.clear();
        self.initialized = false;
        self.scene = None;
    }

    fn get_new_position(
        &mut self,
        position: &Vec3,
        velocity: &Vec3,
        collider: &mut Collider,
        maximum_retry: u32,
        excluded_mesh_id: Option<u64>,
        on_new_position: CollisionCallback,
        collision_id: CorrelationId,
    ) {
        if self.pending.contains_key(&collision_id) {
            log::trace!("collision request {collision_id} still outstanding, dropping");
            return;
        }
        let Some(worker) = &self.worker else {
            log::error!("collision coordinator used before init");
            return;
        };

        let scaled_position = position.component_div(&collider.radius);
        let scaled_velocity = velocity.component_div(&collider.radius);

        let task = WorkerTask::Collide(CollidePayload {
            collision_id,
            collider: SerializedCollider {
                position: vector_to_array(&scaled_position),
                velocity: vector_to_array(&scaled_velocity),
                radius: vector_to_array(&collider.radius),
            },
            maximum_retry,
            excluded_mesh_id,
        });

        self.pending.insert(collision_id, on_new_position);
        if let Err(e) = worker.send(task) {
            log::error!("failed to dispatch collision request {collision_id}: {e}");
            self.pending.remove(&collision_id);
        }
    }

    fn on_mesh_added(&mut self, mesh: &SceneMesh) {
        self.on_mesh_updated(mesh);
    }

    fn on_mesh_updated(&mut self, mesh: &SceneMesh) {
        self.staged_meshes
            .insert(mesh.unique_id(), serialize_mesh(mesh));
    }

    fn on_mesh_removed(&mut self, unique_id: u64) {
        self.removed_meshes.push(unique_id);
    }

    fn on_geometry_added(&mut self, geometry: &Geometry) {
        self.on_geometry_updated(geometry);
    }

    fn on_geometry_updated(&mut self, geometry: &Geometry) {
        self.staged_geometries
            .insert(geometry.id.clone(), serialize_geometry(geometry));
    }

    fn on_geometry_deleted(&mut self, id: &str) {
        self.removed_geometries.push(id.to_string());
    }

    fn after_render(&mut self) {
        let payload = UpdatePayload {
            updated_meshes: std::mem::take(&mut self.staged_meshes),
            updated_geometries: std::mem::take(&mut self.staged_geometries),
            removed_meshes: std::mem::take(&mut self.removed_meshes),
            removed_geometries: std::mem::take(&mut self.removed_geometries),
        };
        if payload.is_empty() {
            return;
        }
        let Some(worker) = &self.worker else {
            return;
        };

        // Fire and forget: staged state is already cleared, and further
        // mutations accumulate for the next frame.
        self.running_updates += 1;
        if let Err(e) = worker.send(WorkerTask::Update(payload)) {
            log::error!("failed to dispatch collision cache update: {e}");
        }
    }

    fn poll_replies(&mut self) {
        let Some(worker) = &self.worker else {
            return;
        };
        let replies: Vec<WorkerReply> = worker.try_replies().collect();
        for reply in replies {
            self.handle_reply(reply);
        }
    }
}

impl Drop for WorkerCoordinator {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::COLLISIONS_EPSILON;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    fn shared_floor_scene(check_collisions: bool) -> (SharedScene, u64) {
        let mut scene = Scene::new();
        let geometry = Geometry::ground_plane("ground", 50.0).into_shared();
        let key = scene
            .add_mesh(SceneMesh::new("floor", geometry).with_check_collisions(check_collisions));
        let unique_id = scene.mesh(key).unwrap().unique_id();
        (Arc::new(RwLock::new(scene)), unique_id)
    }

    /// Poll a worker coordinator until `done` reports true or the deadline
    /// passes.
    fn poll_until(coordinator: &mut WorkerCoordinator, done: &dyn Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            coordinator.poll_replies();
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(done(), "worker reply did not arrive in time");
    }

    #[test]
    fn inline_resolution_runs_callback_synchronously() {
        let (scene, floor_id) = shared_floor_scene(true);
        let mut coordinator = InlineCoordinator::new();
        coordinator.init(scene).unwrap();

        let result: Rc<RefCell<Option<(CorrelationId, Vec3, Option<u64>)>>> =
            Rc::new(RefCell::new(None));
        let captured = Rc::clone(&result);

        let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
        coordinator.get_new_position(
            &Vec3::new(0.0, 5.0, 0.0),
            &Vec3::new(0.0, -10.0, 0.0),
            &mut collider,
            3,
            None,
            Box::new(move |id, position, mesh| {
                *captured.borrow_mut() = Some((id, position, mesh.map(SceneMesh::unique_id)));
            }),
            11,
        );

        let result = result.borrow().expect("callback ran before return");
        assert_eq!(result.0, 11);
        assert!(result.1.y >= 1.0 - 10.0 * COLLISIONS_EPSILON);
        assert_eq!(result.2, Some(floor_id));
    }

    #[test]
    fn inline_radius_scaling_round_trips() {
        let (scene, _) = shared_floor_scene(true);
        let radius = Vec3::new(2.0, 0.5, 1.5);
        let position = Vec3::new(0.0, 6.0, 0.0);
        let velocity = Vec3::new(0.0, -8.0, 0.0);

        let mut coordinator = InlineCoordinator::new();
        coordinator.init(Arc::clone(&scene)).unwrap();

        let via_coordinator = Rc::new(RefCell::new(Vec3::zeros()));
        let captured = Rc::clone(&via_coordinator);
        let mut collider = Collider::new(radius);
        coordinator.get_new_position(
            &position,
            &velocity,
            &mut collider,
            3,
            None,
            Box::new(move |_, p, _| *captured.borrow_mut() = p),
            0,
        );

        // The same query done by hand: scale down, solve, scale back.
        let mut direct_collider = Collider::new(radius);
        let scene = scene.read().unwrap();
        let direct = collide_with_world(
            position.component_div(&radius),
            velocity.component_div(&radius),
            &mut direct_collider,
            3,
            &*scene,
            None,
        )
        .component_mul(&radius);

        let via = *via_coordinator.borrow();
        assert_relative_eq!(via.x, direct.x);
        assert_relative_eq!(via.y, direct.y);
        assert_relative_eq!(via.z, direct.z);
    }

    #[test]
    fn inline_ignores_lifecycle_notifications() {
        let (scene, _) = shared_floor_scene(true);
        let mut coordinator = InlineCoordinator::new();
        coordinator.init(Arc::clone(&scene)).unwrap();

        let geometry = Geometry::ground_plane("other", 1.0);
        coordinator.on_geometry_added(&geometry);
        coordinator.on_geometry_deleted("other");
        coordinator.on_mesh_removed(1);
        coordinator.after_render();
        coordinator.poll_replies();
        coordinator.destroy();
    }

    #[test]
    fn worker_round_trip_resolves_against_cache() {
        let (scene, floor_id) = shared_floor_scene(true);
        let mut coordinator = WorkerCoordinator::new();
        coordinator.init(Arc::clone(&scene)).unwrap();

        {
            let scene = scene.read().unwrap();
            let mesh = scene.mesh_by_unique_id(floor_id).unwrap();
            let geometry = Geometry::ground_plane("ground", 50.0);
            coordinator.on_geometry_added(&geometry);
            coordinator.on_mesh_added(mesh);
        }
        coordinator.after_render();

        let result: Rc<RefCell<Option<(Vec3, Option<u64>)>>> = Rc::new(RefCell::new(None));
        let captured = Rc::clone(&result);
        let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
        coordinator.get_new_position(
            &Vec3::new(0.0, 5.0, 0.0),
            &Vec3::new(0.0, -10.0, 0.0),
            &mut collider,
            3,
            None,
            Box::new(move |_, position, mesh| {
                *captured.borrow_mut() = Some((position, mesh.map(SceneMesh::unique_id)));
            }),
            1,
        );
        assert_eq!(coordinator.pending_count(), 1);

        let done = Rc::clone(&result);
        poll_until(&mut coordinator, &move || done.borrow().is_some());

        let (position, collided) = result.borrow().unwrap();
        assert!(position.y >= 1.0 - 10.0 * COLLISIONS_EPSILON);
        assert_eq!(collided, Some(floor_id));
        assert_eq!(coordinator.pending_count(), 0);
        assert!(coordinator.is_initialized());
        coordinator.destroy();
    }

    #[test]
    fn duplicate_correlation_id_drops_second_request() {
        let (scene, _) = shared_floor_scene(false);
        let mut coordinator = WorkerCoordinator::new();
        coordinator.init(scene).unwrap();

        let first_calls = Rc::new(RefCell::new(0u32));
        let second_calls = Rc::new(RefCell::new(0u32));

        let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
        let captured = Rc::clone(&first_calls);
        coordinator.get_new_position(
            &Vec3::zeros(),
            &Vec3::new(1.0, 0.0, 0.0),
            &mut collider,
            3,
            None,
            Box::new(move |_, _, _| *captured.borrow_mut() += 1),
            7,
        );
        // Same id while the first is outstanding: dropped outright.
        let captured = Rc::clone(&second_calls);
        coordinator.get_new_position(
            &Vec3::zeros(),
            &Vec3::new(2.0, 0.0, 0.0),
            &mut collider,
            3,
            None,
            Box::new(move |_, _, _| *captured.borrow_mut() += 1),
            7,
        );
        assert_eq!(coordinator.pending_count(), 1);

        let done = Rc::clone(&first_calls);
        poll_until(&mut coordinator, &move || *done.borrow() > 0);

        assert_eq!(*first_calls.borrow(), 1);
        assert_eq!(*second_calls.borrow(), 0);
        assert_eq!(coordinator.pending_count(), 0);
        coordinator.destroy();
    }

    #[test]
    fn staged_updates_flush_once_and_deduplicate() {
        let (scene, floor_id) = shared_floor_scene(true);
        let mut coordinator = WorkerCoordinator::new();
        coordinator.init(Arc::clone(&scene)).unwrap();

        {
            let scene = scene.read().unwrap();
            let mesh = scene.mesh_by_unique_id(floor_id).unwrap();
            // Staging the same identity twice keeps only the latest entry.
            coordinator.on_mesh_added(mesh);
            coordinator.on_mesh_updated(mesh);
        }
        assert_eq!(coordinator.staged_meshes.len(), 1);

        coordinator.after_render();
        assert!(coordinator.staged_meshes.is_empty());
        assert_eq!(coordinator.running_update_count(), 1);

        // Nothing staged: no message goes out.
        coordinator.after_render();
        assert_eq!(coordinator.running_update_count(), 1);

        poll_until(&mut coordinator, &|| true);
        coordinator.destroy();
    }

    #[test]
    fn update_acknowledgement_decrements_counter() {
        let (scene, floor_id) = shared_floor_scene(true);
        let mut coordinator = WorkerCoordinator::new();
        coordinator.init(Arc::clone(&scene)).unwrap();

        {
            let scene = scene.read().unwrap();
            coordinator.on_mesh_added(scene.mesh_by_unique_id(floor_id).unwrap());
        }
        coordinator.after_render();
        assert_eq!(coordinator.running_update_count(), 1);

        let deadline = Instant::now() + Duration::from_secs(5);
        while coordinator.running_update_count() > 0 && Instant::now() < deadline {
            coordinator.poll_replies();
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(coordinator.running_update_count(), 0);
        coordinator.destroy();
    }

    #[test]
    fn request_before_init_is_ignored() {
        let mut coordinator = WorkerCoordinator::new();
        let calls = Rc::new(RefCell::new(0u32));
        let captured = Rc::clone(&calls);
        let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
        coordinator.get_new_position(
            &Vec3::zeros(),
            &Vec3::new(1.0, 0.0, 0.0),
            &mut collider,
            3,
            None,
            Box::new(move |_, _, _| *captured.borrow_mut() += 1),
            0,
        );
        assert_eq!(coordinator.pending_count(), 0);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn removed_mesh_identities_are_staged_for_the_batch() {
        let (scene, floor_id) = shared_floor_scene(true);
        let mut coordinator = WorkerCoordinator::new();
        coordinator.init(scene).unwrap();

        coordinator.on_mesh_removed(floor_id);
        coordinator.on_geometry_deleted("ground");
        assert_eq!(coordinator.removed_meshes, vec![floor_id]);
        assert_eq!(coordinator.removed_geometries, vec!["ground".to_string()]);

        coordinator.after_render();
        assert!(coordinator.removed_meshes.is_empty());
        assert!(coordinator.removed_geometries.is_empty());
        coordinator.destroy();
    }
}
