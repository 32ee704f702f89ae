//! In-memory drivers and engines for tests.
//!
//! Engine behaviour is keyed off the input text so tests read naturally:
//! goals containing `fail` fail, `panic` panics, `slow` takes 100ms and `hang`
//! never finishes in test time; statements containing `false` fail
//! verification.

use crate::config::Settings;
use crate::driver::{DriverError, DriverStrategies, DriverStrategy, Platform, RawDriver};
use crate::engine::{AreaEngine, AutomationEngine, EngineError, EngineFactory, Model};
use crate::session::SessionManager;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct FakeDriver {
    platform: Platform,
    session_id: String,
    pub closes: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
}

#[async_trait]
impl RawDriver for FakeDriver {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn endpoint(&self) -> &str {
        "memory://"
    }

    async fn navigate(&self, target: &str) -> Result<(), DriverError> {
        if target.contains("unreachable") {
            return Err(DriverError::Protocol(format!("cannot navigate to {target}")));
        }
        self.navigations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(target.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Strategy that records every driver it builds.
pub struct FakeStrategy {
    platform: Platform,
    refuse: bool,
    /// Open the driver, then take an hour before returning it.
    stall: bool,
    pub built: Mutex<Vec<Arc<FakeDriver>>>,
}

impl FakeStrategy {
    fn build(platform: Platform, refuse: bool, stall: bool) -> Arc<Self> {
        Arc::new(Self {
            platform,
            refuse,
            stall,
            built: Mutex::new(Vec::new()),
        })
    }

    pub fn new(platform: Platform) -> Arc<Self> {
        Self::build(platform, false, false)
    }

    pub fn refusing(platform: Platform) -> Arc<Self> {
        Self::build(platform, true, false)
    }

    pub fn stalling(platform: Platform) -> Arc<Self> {
        Self::build(platform, false, true)
    }

    pub fn drivers(&self) -> Vec<Arc<FakeDriver>> {
        self.built.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl DriverStrategy for FakeStrategy {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn construct(&self, target: Option<&str>) -> Result<Arc<dyn RawDriver>, DriverError> {
        if self.refuse {
            return Err(DriverError::Connect("connection refused".to_string()));
        }
        let driver = {
            let mut built = self.built.lock().unwrap_or_else(|e| e.into_inner());
            let driver = Arc::new(FakeDriver {
                platform: self.platform,
                session_id: format!("fake-{}", built.len() + 1),
                closes: AtomicUsize::new(0),
                navigations: Mutex::new(Vec::new()),
            });
            built.push(driver.clone());
            driver
        };
        if self.stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(target) = target {
            if let Err(e) = driver.navigate(target).await {
                let _ = driver.close().await;
                return Err(e);
            }
        }
        Ok(driver)
    }
}

async fn act(goal: &str) -> Result<(), EngineError> {
    if goal.contains("panic") {
        panic!("engine panicked on {goal}");
    }
    if goal.contains("hang") {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    if goal.contains("slow") {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if goal.contains("fail") {
        return Err(EngineError::Failed(format!("could not {goal}")));
    }
    Ok(())
}

fn verify(statement: &str) -> Result<String, EngineError> {
    if statement.contains("false") {
        Err(EngineError::VerificationFailed(format!(
            "the page does not show that {statement}"
        )))
    } else {
        Ok(format!("the page shows that {statement}"))
    }
}

pub struct FakeArea {
    description: String,
    pub goals: Mutex<Vec<String>>,
}

#[async_trait]
impl AreaEngine for FakeArea {
    async fn do_goal(&self, goal: &str) -> Result<(), EngineError> {
        act(goal).await?;
        self.goals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(goal.to_string());
        Ok(())
    }

    async fn check(&self, statement: &str, _vision: bool) -> Result<String, EngineError> {
        verify(statement)
    }

    async fn get(&self, data: &str, vision: bool) -> Result<Value, EngineError> {
        Ok(json!({ "area": self.description, "data": data, "vision": vision }))
    }
}

pub struct FakeEngine {
    pub model: Model,
    pub releases: AtomicUsize,
    pub cache_saves: AtomicUsize,
    pub goals: Mutex<Vec<String>>,
}

#[async_trait]
impl AreaEngine for FakeEngine {
    async fn do_goal(&self, goal: &str) -> Result<(), EngineError> {
        act(goal).await?;
        self.goals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(goal.to_string());
        Ok(())
    }

    async fn check(&self, statement: &str, vision: bool) -> Result<String, EngineError> {
        verify(statement).map(|e| if vision { format!("{e} (vision)") } else { e })
    }

    async fn get(&self, data: &str, _vision: bool) -> Result<Value, EngineError> {
        if data == "title" {
            Ok(json!("Login"))
        } else {
            Ok(json!([1, 2, 3]))
        }
    }
}

#[async_trait]
impl AutomationEngine for FakeEngine {
    async fn derive_area(&self, description: &str) -> Result<Arc<dyn AreaEngine>, EngineError> {
        if description.contains("missing") {
            return Err(EngineError::Failed(format!("no area matches {description}")));
        }
        Ok(Arc::new(FakeArea {
            description: description.to_string(),
            goals: Mutex::new(Vec::new()),
        }))
    }

    async fn debug_tree(&self) -> Result<String, EngineError> {
        Ok("RootWebArea \"Login\"\n  link \"Sign in\"".to_string())
    }

    async fn persist_cache(&self) -> Result<(), EngineError> {
        self.cache_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release(&self) -> Result<(), EngineError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEngineFactory {
    pub refuse: bool,
    pub built: Mutex<Vec<Arc<FakeEngine>>>,
}

impl FakeEngineFactory {
    pub fn engines(&self) -> Vec<Arc<FakeEngine>> {
        self.built.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl EngineFactory for FakeEngineFactory {
    async fn construct(
        &self,
        _driver: Arc<dyn RawDriver>,
        model: &Model,
    ) -> Result<Arc<dyn AutomationEngine>, EngineError> {
        if self.refuse {
            return Err(EngineError::Unavailable("engine offline".to_string()));
        }
        let engine = Arc::new(FakeEngine {
            model: model.clone(),
            releases: AtomicUsize::new(0),
            cache_saves: AtomicUsize::new(0),
            goals: Mutex::new(Vec::new()),
        });
        self.built
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(engine.clone());
        Ok(engine)
    }
}

/// A session manager wired to fakes, plus the fakes for inspection.
pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub browser: Arc<FakeStrategy>,
    pub ios: Arc<FakeStrategy>,
    pub engines: Arc<FakeEngineFactory>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Settings::default(), FakeEngineFactory::default())
    }

    pub fn with(settings: Settings, engines: FakeEngineFactory) -> Self {
        let browser = FakeStrategy::new(Platform::Browser);
        let ios = FakeStrategy::new(Platform::Ios);
        Self::with_strategies(settings, engines, browser, ios)
    }

    pub fn with_strategies(
        settings: Settings,
        engines: FakeEngineFactory,
        browser: Arc<FakeStrategy>,
        ios: Arc<FakeStrategy>,
    ) -> Self {
        let engines = Arc::new(engines);
        let strategies = DriverStrategies::new()
            .with(browser.clone())
            .with(ios.clone())
            .with(Arc::new(crate::driver::AndroidStrategy));
        let manager = Arc::new(SessionManager::new(settings, strategies, engines.clone()));
        Self {
            manager,
            browser,
            ios,
            engines,
        }
    }
}
