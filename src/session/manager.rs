//! Session manager: creation, use, and teardown of drivers and areas.

use super::types::{Area, DriverInfo, DriverSession, DriverStarted};
use crate::config::Settings;
use crate::driver::{DriverStrategies, DriverStrategy, Platform, RawDriver};
use crate::engine::{EngineError, EngineFactory};
use crate::error::{ResourceKind, ToolError};
use crate::registry::{Handle, ResourceRegistry};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Owner of every live driver session and area.
pub struct SessionManager {
    drivers: ResourceRegistry<DriverSession>,
    areas: ResourceRegistry<Area>,
    strategies: DriverStrategies,
    engines: Arc<dyn EngineFactory>,
    settings: Settings,
}

impl SessionManager {
    pub fn new(
        settings: Settings,
        strategies: DriverStrategies,
        engines: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            drivers: ResourceRegistry::new(ResourceKind::Driver),
            areas: ResourceRegistry::new(ResourceKind::Area),
            strategies,
            engines,
            settings,
        }
    }

    /// Run `fut` under the configured call timeout.
    async fn bounded<T, E>(&self, fut: impl Future<Output = Result<T, E>>) -> Result<T, ToolError>
    where
        ToolError: From<E>,
    {
        match timeout(self.settings.call_timeout, fut).await {
            Ok(result) => result.map_err(ToolError::from),
            Err(_) => Err(ToolError::Timeout(self.settings.call_timeout.as_secs())),
        }
    }

    /// Start a driver and bind a fresh engine to it.
    ///
    /// Nothing is registered unless both steps succeed; a driver whose engine
    /// could not be built is closed again.
    #[instrument(skip(self))]
    pub async fn start_driver(
        &self,
        platform: Platform,
        target: Option<&str>,
    ) -> Result<DriverStarted, ToolError> {
        let strategy = self.strategies.get(platform)?;
        let model = self.settings.model.clone();

        let raw = self.construct_driver(strategy, target).await?;

        let engine = match self
            .bounded(self.engines.construct(raw.clone(), &model))
            .await
        {
            Ok(engine) => engine,
            Err(e) => {
                if let Err(close_err) = self.bounded(raw.close()).await {
                    warn!(error = %close_err, "Failed to close driver after engine error");
                }
                return Err(match e {
                    ToolError::AutomationFailure(msg) => ToolError::ConstructionFailure(msg),
                    other => other,
                });
            }
        };

        let target = target.map(str::to_string);
        let handle = self.drivers.register_with(|handle| {
            DriverSession::new(handle, platform, model.clone(), target, engine, raw)
        });

        info!(
            driver = %handle,
            platform = %platform,
            model = %model,
            "Driver started"
        );
        Ok(DriverStarted {
            handle,
            platform,
            model,
        })
    }

    /// Build a raw driver under the call timeout.
    ///
    /// Construction runs on its own task. When the timeout fires first the
    /// task is left to finish, and a driver it still produces is closed.
    async fn construct_driver(
        &self,
        strategy: Arc<dyn DriverStrategy>,
        target: Option<&str>,
    ) -> Result<Arc<dyn RawDriver>, ToolError> {
        let target = target.map(str::to_string);
        let mut task = tokio::spawn(async move { strategy.construct(target.as_deref()).await });

        let outcome = timeout(self.settings.call_timeout, &mut task).await;
        match outcome {
            Ok(Ok(result)) => result.map_err(ToolError::from),
            Ok(Err(join)) => Err(ToolError::Internal(format!(
                "driver construction failed: {join}"
            ))),
            Err(_) => {
                tokio::spawn(async move {
                    if let Ok(Ok(raw)) = task.await {
                        warn!(
                            session = raw.session_id(),
                            "Closing driver that started after the timeout"
                        );
                        if let Err(e) = raw.close().await {
                            warn!(error = %e, "Failed to close late driver");
                        }
                    }
                });
                Err(ToolError::Timeout(self.settings.call_timeout.as_secs()))
            }
        }
    }

    /// Tear down a driver and every area derived from it.
    ///
    /// Waits for calls already running against the driver (or its areas) to
    /// finish. Calls arriving afterwards fail with `HandleNotFound`.
    #[instrument(skip(self), fields(driver = %handle))]
    pub async fn quit_driver(&self, handle: &Handle) -> Result<(), ToolError> {
        let session = self.drivers.lookup(handle)?;
        let _closed = session.begin_teardown().await?;
        let info = session.info();

        if let Err(e) = self.bounded(session.engine().release()).await {
            warn!(error = %e, "Engine release failed; closing driver anyway");
        }
        if let Err(e) = self.bounded(session.raw().close()).await {
            warn!(error = %e, "Driver close failed");
        }

        let children = self.areas.list_where(|area| area.parent() == *handle);
        let removed = self.areas.evict_all(&children);
        self.drivers.evict(handle);

        info!(
            platform = %info.platform,
            session = %info.driver_session_id,
            areas = removed.len(),
            "Driver closed"
        );
        Ok(())
    }

    /// Carve a scoped area out of a driver session.
    #[instrument(skip(self), fields(driver = %driver))]
    pub async fn create_area(&self, driver: &Handle, description: &str) -> Result<Handle, ToolError> {
        let session = self.drivers.lookup(driver)?;
        let _active = session.enter().await?;

        let engine = self
            .bounded(session.engine().derive_area(description))
            .await?;
        // Registered while the gate is held, so a concurrent quit either
        // waits for this area or has already rejected the call.
        let handle = self.areas.register(Area::new(*driver, engine));

        info!(area = %handle, "Area created");
        Ok(handle)
    }

    /// Destroy one area. Its driver is unaffected.
    #[instrument(skip(self), fields(area = %handle))]
    pub async fn remove_area(&self, handle: &Handle) -> Result<(), ToolError> {
        let area = self.areas.lookup(handle)?;
        let parent = self.drivers.lookup(&area.parent()).ok();
        let _active = match parent.as_ref() {
            Some(session) => Some(session.enter().await.map_err(|_| self.area_gone(handle))?),
            None => None,
        };
        self.areas
            .evict(handle)
            .map(|_| ())
            .ok_or_else(|| self.area_gone(handle))
    }

    pub async fn save_cache(&self, driver: &Handle) -> Result<(), ToolError> {
        let session = self.drivers.lookup(driver)?;
        let _active = session.enter().await?;
        self.bounded(session.engine().persist_cache()).await?;
        info!(driver = %driver, "Cache saved");
        Ok(())
    }

    pub async fn do_goal(&self, driver: &Handle, goal: &str) -> Result<(), ToolError> {
        let session = self.drivers.lookup(driver)?;
        let _active = session.enter().await?;
        debug!(driver = %driver, goal, "do");
        self.bounded(session.engine().do_goal(goal)).await
    }

    /// Returns the explanation; a false statement is an automation failure.
    pub async fn check(
        &self,
        driver: &Handle,
        statement: &str,
        vision: bool,
    ) -> Result<String, ToolError> {
        let session = self.drivers.lookup(driver)?;
        let _active = session.enter().await?;
        debug!(driver = %driver, statement, vision, "check");
        let result = timeout(
            self.settings.call_timeout,
            session.engine().check(statement, vision),
        )
        .await;
        self.verdict(statement, result)
    }

    pub async fn get(&self, driver: &Handle, data: &str, vision: bool) -> Result<Value, ToolError> {
        let session = self.drivers.lookup(driver)?;
        let _active = session.enter().await?;
        debug!(driver = %driver, data, vision, "get");
        self.bounded(session.engine().get(data, vision)).await
    }

    pub async fn debug_tree(&self, driver: &Handle) -> Result<String, ToolError> {
        let session = self.drivers.lookup(driver)?;
        let _active = session.enter().await?;
        self.bounded(session.engine().debug_tree()).await
    }

    /// Resolve an area and its parent. An area whose parent is gone is
    /// reported as missing itself.
    fn area_with_parent(&self, handle: &Handle) -> Result<(Arc<Area>, Arc<DriverSession>), ToolError> {
        let area = self.areas.lookup(handle)?;
        let parent = self
            .drivers
            .lookup(&area.parent())
            .map_err(|_| self.area_gone(handle))?;
        Ok((area, parent))
    }

    fn area_gone(&self, handle: &Handle) -> ToolError {
        ToolError::handle_not_found(ResourceKind::Area, handle.to_string())
    }

    pub async fn area_do(&self, handle: &Handle, goal: &str) -> Result<(), ToolError> {
        let (area, parent) = self.area_with_parent(handle)?;
        let _active = parent.enter().await.map_err(|_| self.area_gone(handle))?;
        debug!(area = %handle, goal, "area do");
        self.bounded(area.engine().do_goal(goal)).await
    }

    pub async fn area_check(
        &self,
        handle: &Handle,
        statement: &str,
        vision: bool,
    ) -> Result<String, ToolError> {
        let (area, parent) = self.area_with_parent(handle)?;
        let _active = parent.enter().await.map_err(|_| self.area_gone(handle))?;
        debug!(area = %handle, statement, vision, "area check");
        let result = timeout(
            self.settings.call_timeout,
            area.engine().check(statement, vision),
        )
        .await;
        self.verdict(statement, result)
    }

    pub async fn area_get(
        &self,
        handle: &Handle,
        data: &str,
        vision: bool,
    ) -> Result<Value, ToolError> {
        let (area, parent) = self.area_with_parent(handle)?;
        let _active = parent.enter().await.map_err(|_| self.area_gone(handle))?;
        debug!(area = %handle, data, vision, "area get");
        self.bounded(area.engine().get(data, vision)).await
    }

    fn verdict(
        &self,
        statement: &str,
        result: Result<Result<String, EngineError>, tokio::time::error::Elapsed>,
    ) -> Result<String, ToolError> {
        match result {
            Ok(Ok(explanation)) => Ok(explanation),
            Ok(Err(EngineError::VerificationFailed(explanation))) => {
                Err(ToolError::AutomationFailure(format!(
                    "Check failed: {statement}\nExplanation: {explanation}"
                )))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ToolError::Timeout(self.settings.call_timeout.as_secs())),
        }
    }

    pub fn list_drivers(&self) -> Vec<DriverInfo> {
        self.drivers.values().iter().map(|s| s.info()).collect()
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    /// Quit every live driver.
    pub async fn shutdown_all(&self) {
        let drivers = self.list_drivers();
        if drivers.is_empty() {
            return;
        }
        info!(drivers = drivers.len(), "Closing all drivers");
        for driver in drivers {
            info!(
                driver = %driver.handle,
                platform = %driver.platform,
                model = %driver.model,
                target = driver.target.as_deref().unwrap_or("-"),
                started = %driver.created_at,
                "Closing driver"
            );
            match self.quit_driver(&driver.handle).await {
                Ok(()) | Err(ToolError::HandleNotFound { .. }) => {}
                Err(e) => warn!(driver = %driver.handle, error = %e, "Failed to close driver during shutdown"),
            }
        }
    }
}
