//! Collision resolution subsystem
//!
//! Given a moving ellipsoid collider and a set of candidate triangle
//! meshes, computes a corrected final position that respects solid-mesh
//! boundaries, sliding along obstructions instead of stopping dead.
//!
//! # Architecture
//!
//! The same slide-and-retry solver runs under two execution strategies
//! behind one coordinator contract:
//!
//! - **Inline**: [`coordinator::InlineCoordinator`] resolves synchronously
//!   against the live scene; the completion callback runs before
//!   `get_new_position` returns.
//! - **Worker**: [`coordinator::WorkerCoordinator`] forwards requests over
//!   a channel to an isolated worker thread that resolves against a
//!   snapshot cache kept current by batched per-frame updates; callbacks
//!   fire from the caller's `poll_replies`.
//!
//! Candidate iteration is linear in both strategies; there is no spatial
//! index.
//!
//! # Module Organization
//!
//! - [`collider`] - moving-collider state and the swept-sphere narrow phase
//! - [`solver`] - the bounded slide-and-retry loop and candidate provider trait
//! - [`serialize`] - flat snapshot types and pure projections
//! - [`cache`] - worker-side snapshot store
//! - [`protocol`] - task and reply message shapes
//! - [`worker`] - the isolated executor thread
//! - [`coordinator`] - the dual-strategy public contract
//! - [`config`] - strategy selection and factory

pub mod cache;
pub mod collider;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod protocol;
pub mod serialize;
pub mod solver;
pub mod worker;

/// Base contact offset of the sweep tests; surfaces are kept this far away
/// from the unit sphere, and the solver converges once residual motion
/// drops below ten times this value.
pub const COLLISIONS_EPSILON: f32 = 0.001;

pub use cache::CollisionCache;
pub use collider::Collider;
pub use config::{create_coordinator, CollisionConfig, CollisionStrategy};
pub use coordinator::{
    CollisionCallback, CollisionCoordinator, CorrelationId, InlineCoordinator, SharedScene,
    WorkerCoordinator,
};
pub use error::CollisionError;
pub use serialize::{serialize_geometry, serialize_mesh, SerializedGeometry, SerializedMesh};
pub use solver::{collide_with_world, CandidateSource};
pub use worker::{CollisionDetector, CollisionWorker};
