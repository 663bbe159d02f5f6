//! Messages between the coordinator and the worker context
//!
//! A closed protocol: three task types in, one reply shape out. Geometry
//! buffers inside an update move into the message, so the sending side
//! holds no reference to them afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::collision::serialize::{SerializedGeometry, SerializedMesh};
use crate::scene::GeometryId;

/// Task sent to the worker context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerTask {
    /// Construct the empty snapshot cache
    Init,
    /// Apply one batched cache update
    Update(UpdatePayload),
    /// Resolve one collision request
    Collide(CollidePayload),
}

impl WorkerTask {
    /// The task's kind, echoed in its reply
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Init => TaskKind::Init,
            Self::Update(_) => TaskKind::Update,
            Self::Collide(_) => TaskKind::Collide,
        }
    }
}

/// Discriminant of a task, carried by replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Cache construction
    Init,
    /// Batched cache update
    Update,
    /// Collision resolution
    Collide,
}

/// Outcome code of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyError {
    /// The task was handled
    Success,
    /// The task failed; no further detail is available
    UnknownError,
}

/// Batched cache mutation: upserts keyed by identity, removals as plain
/// identity lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePayload {
    /// Meshes to insert or overwrite, keyed by unique id
    pub updated_meshes: HashMap<u64, SerializedMesh>,
    /// Geometries to insert or overwrite, keyed by geometry id
    pub updated_geometries: HashMap<GeometryId, SerializedGeometry>,
    /// Unique ids of removed meshes
    pub removed_meshes: Vec<u64>,
    /// Ids of removed geometries
    pub removed_geometries: Vec<GeometryId>,
}

impl UpdatePayload {
    /// Whether the batch carries no changes at all
    pub fn is_empty(&self) -> bool {
        self.updated_meshes.is_empty()
            && self.updated_geometries.is_empty()
            && self.removed_meshes.is_empty()
            && self.removed_geometries.is_empty()
    }
}

/// Collider descriptor crossing the wire, already divided by radius
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SerializedCollider {
    /// Scaled start position
    pub position: [f32; 3],
    /// Scaled velocity
    pub velocity: [f32; 3],
    /// Per-axis ellipsoid radius
    pub radius: [f32; 3],
}

/// One collision resolution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollidePayload {
    /// Caller-chosen correlation id
    pub collision_id: u32,
    /// The moving collider
    pub collider: SerializedCollider,
    /// Retry budget of the slide loop
    pub maximum_retry: u32,
    /// Mesh to skip during candidate walks, usually the requester itself
    pub excluded_mesh_id: Option<u64>,
}

/// Successful resolution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionReplyPayload {
    /// Correlation id of the originating request
    pub collision_id: u32,
    /// Final position, in caller units
    pub new_position: [f32; 3],
    /// Unique id of the impacted mesh, if any
    pub collided_mesh_id: Option<u64>,
}

/// Reply sent back by the worker context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReply {
    /// Outcome code
    pub error: ReplyError,
    /// Kind of the task this reply answers
    pub task: TaskKind,
    /// Resolution result; only present on successful collide replies
    pub payload: Option<CollisionReplyPayload>,
}

impl WorkerReply {
    /// A payload-less success reply
    pub fn success(task: TaskKind) -> Self {
        Self {
            error: ReplyError::Success,
            task,
            payload: None,
        }
    }

    /// A payload-less failure reply
    pub fn unknown_error(task: TaskKind) -> Self {
        Self {
            error: ReplyError::UnknownError,
            task,
            payload: None,
        }
    }
}
