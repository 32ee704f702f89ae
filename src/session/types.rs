//! Driver session and area types.

use crate::driver::{Platform, RawDriver};
use crate::engine::{AreaEngine, AutomationEngine, Model};
use crate::error::{ResourceKind, ToolError};
use crate::registry::Handle;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Snapshot of a driver session, for logging.
#[derive(Debug, Clone)]
pub struct DriverInfo {
    pub handle: Handle,
    pub platform: Platform,
    /// `provider/name` of the bound model.
    pub model: String,
    /// Initial URL or app path, if one was given.
    pub target: Option<String>,
    /// Session id on the WebDriver side.
    pub driver_session_id: String,
    pub created_at: DateTime<Utc>,
}

/// A live automatable target plus the engine bound to it.
pub struct DriverSession {
    handle: Handle,
    platform: Platform,
    model: Model,
    target: Option<String>,
    engine: Arc<dyn AutomationEngine>,
    raw: Arc<dyn RawDriver>,
    created_at: DateTime<Utc>,
    /// Activity gate. Calls hold a read guard for their whole duration;
    /// teardown holds the write guard. The value is `true` once closed.
    gate: RwLock<bool>,
}

impl DriverSession {
    pub(crate) fn new(
        handle: Handle,
        platform: Platform,
        model: Model,
        target: Option<String>,
        engine: Arc<dyn AutomationEngine>,
        raw: Arc<dyn RawDriver>,
    ) -> Self {
        Self {
            handle,
            platform,
            model,
            target,
            engine,
            raw,
            created_at: Utc::now(),
            gate: RwLock::new(false),
        }
    }

    pub(crate) fn engine(&self) -> &Arc<dyn AutomationEngine> {
        &self.engine
    }

    pub(crate) fn raw(&self) -> &Arc<dyn RawDriver> {
        &self.raw
    }

    pub fn info(&self) -> DriverInfo {
        DriverInfo {
            handle: self.handle,
            platform: self.platform,
            model: self.model.to_string(),
            target: self.target.clone(),
            driver_session_id: self.raw.session_id().to_string(),
            created_at: self.created_at,
        }
    }

    /// Admit one call. Fails once teardown has started.
    pub(crate) async fn enter(&self) -> Result<RwLockReadGuard<'_, bool>, ToolError> {
        let guard = self.gate.read().await;
        if *guard {
            return Err(ToolError::handle_not_found(
                ResourceKind::Driver,
                self.handle.to_string(),
            ));
        }
        Ok(guard)
    }

    /// Wait for in-flight calls to finish and mark the session closed.
    /// Only the first caller succeeds.
    pub(crate) async fn begin_teardown(&self) -> Result<RwLockWriteGuard<'_, bool>, ToolError> {
        let mut guard = self.gate.write().await;
        if *guard {
            return Err(ToolError::handle_not_found(
                ResourceKind::Driver,
                self.handle.to_string(),
            ));
        }
        *guard = true;
        Ok(guard)
    }
}

/// A scoped view carved out of one driver session.
pub struct Area {
    /// Parent driver. Used for cascading teardown only.
    parent: Handle,
    engine: Arc<dyn AreaEngine>,
}

impl Area {
    pub(crate) fn new(parent: Handle, engine: Arc<dyn AreaEngine>) -> Self {
        Self { parent, engine }
    }

    pub fn parent(&self) -> Handle {
        self.parent
    }

    pub(crate) fn engine(&self) -> &Arc<dyn AreaEngine> {
        &self.engine
    }
}

/// Result of a successful `start_driver`.
#[derive(Debug, Clone)]
pub struct DriverStarted {
    pub handle: Handle,
    pub platform: Platform,
    pub model: Model,
}
