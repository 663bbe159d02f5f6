//! Collision subsystem errors

use thiserror::Error;

/// Failures surfaced by coordinator setup and worker messaging.
///
/// Everything inside a running resolution degrades to a logged skip or an
/// abandoned request instead of an error; these variants cover the setup
/// and transport paths that can genuinely fail.
#[derive(Error, Debug)]
pub enum CollisionError {
    /// A coordinator was used before `init`
    #[error("collision coordinator has not been initialized")]
    NotInitialized,

    /// The worker thread could not be spawned
    #[error("failed to spawn collision worker: {0}")]
    WorkerSpawn(String),

    /// The worker thread is gone and its channels are disconnected
    #[error("collision worker disconnected")]
    WorkerDisconnected,
}
