//! Collision subsystem configuration

use serde::{Deserialize, Serialize};

use crate::collision::coordinator::{
    CollisionCoordinator, InlineCoordinator, WorkerCoordinator,
};
use crate::config::Config;

/// Where collision requests resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionStrategy {
    /// Synchronously, on the calling thread, against live scene data
    Inline,
    /// Asynchronously, on a worker thread, against a snapshot cache
    Worker,
}

/// Configuration of the collision subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionConfig {
    /// Execution strategy picked at initialization
    pub strategy: CollisionStrategy,
    /// Retry budget handed to the solver when the caller has no opinion
    pub default_max_retry: u32,
}

impl CollisionConfig {
    /// Create a configuration with the inline strategy and a small retry
    /// budget
    pub fn new() -> Self {
        Self {
            strategy: CollisionStrategy::Inline,
            default_max_retry: 3,
        }
    }

    /// Set the execution strategy
    pub fn with_strategy(mut self, strategy: CollisionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the default retry budget
    pub fn with_default_max_retry(mut self, retries: u32) -> Self {
        self.default_max_retry = retries;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_max_retry > 1000 {
            return Err(format!(
                "default_max_retry of {} is unreasonably large",
                self.default_max_retry
            ));
        }
        Ok(())
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for CollisionConfig {}

/// Build the coordinator matching the configured strategy.
///
/// The returned coordinator still needs `init` with the scene handle.
pub fn create_coordinator(config: &CollisionConfig) -> Box<dyn CollisionCoordinator> {
    match config.strategy {
        CollisionStrategy::Inline => Box::new(InlineCoordinator::new()),
        CollisionStrategy::Worker => Box::new(WorkerCoordinator::new()),
    }
}
