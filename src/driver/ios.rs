//! iOS via Appium's XCUITest driver.

use super::{DriverError, DriverStrategy, Platform, RawDriver, WebDriverClient};
use crate::config::IosSettings;
use crate::expand_path;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Seconds Appium waits for a command before ending the session.
const NEW_COMMAND_TIMEOUT_SECS: u64 = 300;
/// Milliseconds allowed for WebDriverAgent to launch.
const WDA_LAUNCH_TIMEOUT_MS: u64 = 90_000;
/// Opened when no app is given.
const SAFARI_BUNDLE_ID: &str = "com.apple.mobilesafari";

pub struct IosStrategy {
    client: WebDriverClient,
    settings: IosSettings,
}

impl IosStrategy {
    pub fn new(client: WebDriverClient, settings: IosSettings) -> Self {
        Self { client, settings }
    }

    /// The target is an app path; without one the session drives Safari.
    fn capabilities(&self, target: Option<&str>) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("platformName".to_string(), json!("iOS"));
        caps.insert("appium:automationName".to_string(), json!("XCUITest"));
        caps.insert(
            "appium:deviceName".to_string(),
            json!(self.settings.device_name),
        );
        caps.insert(
            "appium:platformVersion".to_string(),
            json!(self.settings.platform_version),
        );
        caps.insert(
            "appium:newCommandTimeout".to_string(),
            json!(NEW_COMMAND_TIMEOUT_SECS),
        );
        caps.insert(
            "appium:wdaLaunchTimeout".to_string(),
            json!(WDA_LAUNCH_TIMEOUT_MS),
        );
        match target.map(str::trim).filter(|t| !t.is_empty()) {
            Some(app) => {
                let app = app.strip_prefix("file://").unwrap_or(app);
                caps.insert(
                    "appium:app".to_string(),
                    json!(expand_path(app).display().to_string()),
                );
            }
            None => {
                caps.insert("appium:bundleId".to_string(), json!(SAFARI_BUNDLE_ID));
            }
        }
        caps
    }
}

#[async_trait]
impl DriverStrategy for IosStrategy {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    async fn construct(&self, target: Option<&str>) -> Result<Arc<dyn RawDriver>, DriverError> {
        let session = self
            .client
            .new_session(
                &self.settings.appium_server,
                Platform::Ios,
                self.capabilities(target),
            )
            .await?;
        Ok(Arc::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn strategy() -> IosStrategy {
        IosStrategy::new(WebDriverClient::default(), Settings::default().ios)
    }

    #[test]
    fn without_target_safari_is_launched() {
        let caps = strategy().capabilities(None);
        assert_eq!(caps["appium:bundleId"], json!(SAFARI_BUNDLE_ID));
        assert!(!caps.contains_key("appium:app"));
        assert_eq!(caps["appium:deviceName"], json!("iPhone 16"));
        assert_eq!(caps["appium:platformVersion"], json!("18.4"));
    }

    #[test]
    fn file_urls_become_app_paths() {
        let caps = strategy().capabilities(Some("file:///tmp/Demo.app"));
        assert_eq!(caps["appium:app"], json!("/tmp/Demo.app"));
        assert!(!caps.contains_key("appium:bundleId"));
    }
}
