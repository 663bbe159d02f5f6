//! # Collision Engine
//!
//! Sliding-sweep collision resolution for real-time 3D scene graphs.
//!
//! ## Features
//!
//! - **Ellipsoid sweeps**: per-axis-scaled sphere versus triangle-mesh
//!   narrow phase with slide-along-surface response
//! - **Bounded retries**: fixed-point slide-and-retry loop with a hard
//!   iteration cap
//! - **Dual execution strategies**: resolve synchronously against live
//!   scene data, or asynchronously on a worker thread against a serialized
//!   snapshot cache - behind one coordinator contract
//! - **Batched snapshots**: mesh and geometry mutations staged per frame
//!   and flushed as a single update message
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{Arc, RwLock};
//! use collision_engine::prelude::*;
//!
//! let mut scene = Scene::new();
//! let ground = Geometry::ground_plane("ground", 50.0).into_shared();
//! scene.add_mesh(SceneMesh::new("floor", ground).with_check_collisions(true));
//!
//! let config = CollisionConfig::new().with_strategy(CollisionStrategy::Inline);
//! let mut coordinator = create_coordinator(&config);
//! coordinator.init(Arc::new(RwLock::new(scene))).unwrap();
//!
//! let mut collider = Collider::new(Vec3::new(1.0, 1.0, 1.0));
//! coordinator.get_new_position(
//!     &Vec3::new(0.0, 5.0, 0.0),
//!     &Vec3::new(0.0, -10.0, 0.0),
//!     &mut collider,
//!     config.default_max_retry,
//!     None,
//!     Box::new(|_, position, _| println!("came to rest at {position}")),
//!     0,
//! );
//! coordinator.destroy();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod collision;
pub mod config;
pub mod foundation;
pub mod scene;

pub use collision::{CollisionConfig, CollisionCoordinator, CollisionError, CollisionStrategy};

/// Common imports for collision engine users
pub mod prelude {
    pub use crate::collision::{
        create_coordinator, collide_with_world, CandidateSource, Collider, CollisionCache,
        CollisionCallback, CollisionConfig, CollisionCoordinator, CollisionError,
        CollisionStrategy, CorrelationId, InlineCoordinator, SharedScene, WorkerCoordinator,
        COLLISIONS_EPSILON,
    };
    pub use crate::config::{Config, ConfigError};
    pub use crate::foundation::math::{Mat4, Vec3};
    pub use crate::scene::{
        BoundingInfo, Geometry, GeometryId, MeshKey, Scene, SceneMesh, SubMesh,
    };
}
