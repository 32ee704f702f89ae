//! Raw driver connections and per-platform construction strategies.
//!
//! A [`DriverStrategy`] builds one [`RawDriver`] for its platform. The session
//! manager picks the strategy by [`Platform`] and never branches on platform
//! itself, so adding a platform means adding a strategy.

mod android;
mod browser;
mod ios;
pub mod webdriver;

pub use android::AndroidStrategy;
pub use browser::BrowserStrategy;
pub use ios::IosStrategy;
pub use webdriver::{WebDriverClient, WebDriverSession};

use crate::config::Settings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Kind of automatable target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Browser,
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }

    pub fn all() -> &'static [Platform] {
        &[Self::Browser, Self::Ios, Self::Android]
    }
}

impl FromStr for Platform {
    type Err = ();

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "browser" | "chromium" | "chrome" => Ok(Self::Browser),
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("platform {0} is declared but not implemented")]
    Unsupported(String),
    #[error("could not reach driver endpoint: {0}")]
    Connect(String),
    #[error("driver rejected the request: {0}")]
    Protocol(String),
    #[error("driver session is closed")]
    Closed,
}

impl From<reqwest::Error> for DriverError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            DriverError::Connect(e.to_string())
        } else {
            DriverError::Protocol(e.to_string())
        }
    }
}

/// A live connection to one automatable target.
///
/// Owned exclusively by its driver session; only `quit_driver` closes it.
#[async_trait]
pub trait RawDriver: Send + Sync {
    fn platform(&self) -> Platform;

    /// Driver-side session id (the WebDriver `sessionId`).
    fn session_id(&self) -> &str;

    /// Base URL of the WebDriver endpoint serving this session.
    fn endpoint(&self) -> &str;

    async fn navigate(&self, target: &str) -> Result<(), DriverError>;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&self) -> Result<(), DriverError>;
}

/// Builds raw drivers for one platform.
#[async_trait]
pub trait DriverStrategy: Send + Sync {
    fn platform(&self) -> Platform;

    /// Establish a connection. `target` is the optional initial URL or app
    /// path; each strategy decides how to apply it.
    async fn construct(&self, target: Option<&str>) -> Result<Arc<dyn RawDriver>, DriverError>;
}

/// Strategy table keyed by platform.
#[derive(Clone, Default)]
pub struct DriverStrategies {
    strategies: HashMap<Platform, Arc<dyn DriverStrategy>>,
}

impl DriverStrategies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategies for every platform, wired to the configured endpoints.
    pub fn from_settings(settings: &Settings, client: WebDriverClient) -> Self {
        Self::new()
            .with(Arc::new(BrowserStrategy::new(
                client.clone(),
                settings.browser.clone(),
            )))
            .with(Arc::new(IosStrategy::new(client, settings.ios.clone())))
            .with(Arc::new(AndroidStrategy))
    }

    pub fn with(mut self, strategy: Arc<dyn DriverStrategy>) -> Self {
        self.strategies.insert(strategy.platform(), strategy);
        self
    }

    pub fn get(&self, platform: Platform) -> Result<Arc<dyn DriverStrategy>, DriverError> {
        self.strategies
            .get(&platform)
            .cloned()
            .ok_or_else(|| DriverError::Unsupported(platform.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chromium_is_an_alias_for_browser() {
        assert_eq!("chromium".parse::<Platform>(), Ok(Platform::Browser));
        assert_eq!("Browser".parse::<Platform>(), Ok(Platform::Browser));
        assert_eq!("ios".parse::<Platform>(), Ok(Platform::Ios));
        assert!("windows".parse::<Platform>().is_err());
    }

    #[test]
    fn missing_strategy_is_unsupported() {
        let strategies = DriverStrategies::new().with(Arc::new(AndroidStrategy));
        assert!(matches!(
            strategies.get(Platform::Ios),
            Err(DriverError::Unsupported(p)) if p == "ios"
        ));
        assert!(strategies.get(Platform::Android).is_ok());
    }

    #[test]
    fn defaults_cover_every_platform() {
        let strategies =
            DriverStrategies::from_settings(&Settings::default(), WebDriverClient::default());
        for platform in Platform::all() {
            let strategy = strategies.get(*platform).expect("strategy registered");
            assert_eq!(strategy.platform(), *platform);
        }
    }
}
