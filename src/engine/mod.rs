//! Automation engine boundary.
//!
//! The engine turns natural-language goals, statements, and data requests
//! into actions against a target. It is an external collaborator: the
//! server only binds engines to drivers and forwards calls.

mod model;
pub mod remote;

pub use model::{Model, Provider, DEFAULT_MODEL};
pub use remote::RemoteEngineFactory;

use crate::driver::RawDriver;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A checked statement turned out to be false. Carries the explanation.
    #[error("{0}")]
    VerificationFailed(String),
    #[error("automation failed: {0}")]
    Failed(String),
    #[error("automation engine unreachable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            EngineError::Unavailable(e.to_string())
        } else {
            EngineError::Failed(e.to_string())
        }
    }
}

/// Operations available inside an area.
#[async_trait]
pub trait AreaEngine: Send + Sync {
    async fn do_goal(&self, goal: &str) -> Result<(), EngineError>;

    /// Returns the explanation when the statement holds.
    async fn check(&self, statement: &str, vision: bool) -> Result<String, EngineError>;

    async fn get(&self, data: &str, vision: bool) -> Result<Value, EngineError>;
}

/// Engine bound to one driver session.
#[async_trait]
pub trait AutomationEngine: AreaEngine {
    async fn derive_area(&self, description: &str) -> Result<Arc<dyn AreaEngine>, EngineError>;

    /// Structured snapshot of the current screen, for debugging.
    async fn debug_tree(&self) -> Result<String, EngineError>;

    async fn persist_cache(&self) -> Result<(), EngineError>;

    /// Drop engine-side state. Called once, before the driver is closed.
    async fn release(&self) -> Result<(), EngineError>;
}

/// Binds a fresh engine to a raw driver.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn construct(
        &self,
        driver: Arc<dyn RawDriver>,
        model: &Model,
    ) -> Result<Arc<dyn AutomationEngine>, EngineError>;
}
