//! Isolated collision executor
//!
//! The worker owns the snapshot cache and serves the three protocol tasks
//! on a dedicated thread. Communication is message passing only: tasks
//! arrive on one channel, replies leave on another, and nothing is shared.
//! Dropping the task sender is the shutdown signal.

use crossbeam_channel::{unbounded, Receiver, Sender, TryIter};

use crate::collision::cache::CollisionCache;
use crate::collision::collider::Collider;
use crate::collision::error::CollisionError;
use crate::collision::protocol::{
    CollidePayload, CollisionReplyPayload, ReplyError, TaskKind, UpdatePayload, WorkerReply,
    WorkerTask,
};
use crate::collision::solver::collide_with_world;
use crate::foundation::math::{vector_from_array, vector_to_array};

/// Task handler living inside the worker context.
///
/// The cache exists only after an `Init` task; `Update` and `Collide`
/// received before that answer with [`ReplyError::UnknownError`].
#[derive(Debug, Default)]
pub struct CollisionDetector {
    cache: Option<CollisionCache>,
}

impl CollisionDetector {
    /// Create a detector with no cache yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one task, producing its reply
    pub fn handle(&mut self, task: WorkerTask) -> WorkerReply {
        match task {
            WorkerTask::Init => self.on_init(),
            WorkerTask::Update(payload) => self.on_update(payload),
            WorkerTask::Collide(payload) => self.on_collide(payload),
        }
    }

    /// The snapshot cache, once initialized
    pub fn cache(&self) -> Option<&CollisionCache> {
        self.cache.as_ref()
    }

    fn on_init(&mut self) -> WorkerReply {
        self.cache = Some(CollisionCache::new());
        WorkerReply::success(TaskKind::Init)
    }

    fn on_update(&mut self, payload: UpdatePayload) -> WorkerReply {
        let Some(cache) = &mut self.cache else {
            log::warn!("update task received before init");
            return WorkerReply::unknown_error(TaskKind::Update);
        };

        for (_, geometry) in payload.updated_geometries {
            cache.add_geometry(geometry);
        }
        for (_, mesh) in payload.updated_meshes {
            cache.add_mesh(mesh);
        }
        // Removal lists are accepted in the payload shape but not applied:
        // cache entries are only ever overwritten.

        WorkerReply::success(TaskKind::Update)
    }

    fn on_collide(&mut self, payload: CollidePayload) -> WorkerReply {
        let Some(cache) = &self.cache else {
            log::warn!("collide task received before init");
            return WorkerReply::unknown_error(TaskKind::Collide);
        };

        let mut collider = Collider::new(vector_from_array(payload.collider.radius));
        let position = vector_from_array(payload.collider.position);
        let velocity = vector_from_array(payload.collider.velocity);

        let final_position = collide_with_world(
            position,
            velocity,
            &mut collider,
            payload.maximum_retry,
            cache,
            payload.excluded_mesh_id,
        );
        // Scale back into caller units before replying.
        let final_position = final_position.component_mul(&collider.radius);

        WorkerReply {
            error: ReplyError::Success,
            task: TaskKind::Collide,
            payload: Some(CollisionReplyPayload {
                collision_id: payload.collision_id,
                new_position: vector_to_array(&final_position),
                collided_mesh_id: collider.collided_mesh_id,
            }),
        }
    }
}

/// Handle to a spawned collision worker thread
#[derive(Debug)]
pub struct CollisionWorker {
    task_tx: Option<Sender<WorkerTask>>,
    reply_rx: Receiver<WorkerReply>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CollisionWorker {
    /// Spawn the worker thread with its task and reply channels
    pub fn spawn() -> Result<Self, CollisionError> {
        let (task_tx, task_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();

        let thread = std::thread::Builder::new()
            .name("collision-worker".to_string())
            .spawn(move || run(task_rx, &reply_tx))
            .map_err(|e| CollisionError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            task_tx: Some(task_tx),
            reply_rx,
            thread: Some(thread),
        })
    }

    /// Enqueue a task for the worker
    pub fn send(&self, task: WorkerTask) -> Result<(), CollisionError> {
        let sender = self
            .task_tx
            .as_ref()
            .ok_or(CollisionError::WorkerDisconnected)?;
        sender
            .send(task)
            .map_err(|_| CollisionError::WorkerDisconnected)
    }

    /// Drain any replies that have arrived, without blocking
    pub fn try_replies(&self) -> TryIter<'_, WorkerReply> {
        self.reply_rx.try_iter()
    }

    /// Receive one reply, blocking until it arrives or the worker is gone
    pub fn recv_reply(&self) -> Result<WorkerReply, CollisionError> {
        self.reply_rx
            .recv()
            .map_err(|_| CollisionError::WorkerDisconnected)
    }

    /// Shut the worker down and join its thread
    pub fn terminate(&mut self) {
        self.task_tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("collision worker thread panicked");
            }
        }
    }
}

impl Drop for CollisionWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Worker thread body: serve tasks until the coordinator hangs up
fn run(tasks: Receiver<WorkerTask>, replies: &Sender<WorkerReply>) {
    let mut detector = CollisionDetector::new();
    for task in tasks.iter() {
        let reply = detector.handle(task);
        if replies.send(reply).is_err() {
            break;
        }
    }
    log::debug!("collision worker shutting down");
}
