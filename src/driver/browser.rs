//! Chromium via chromedriver.

use super::{DriverError, DriverStrategy, Platform, RawDriver, WebDriverClient};
use crate::config::BrowserSettings;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::warn;

pub struct BrowserStrategy {
    client: WebDriverClient,
    settings: BrowserSettings,
}

impl BrowserStrategy {
    pub fn new(client: WebDriverClient, settings: BrowserSettings) -> Self {
        Self { client, settings }
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": self.settings.chrome_args }),
        );
        caps
    }
}

#[async_trait]
impl DriverStrategy for BrowserStrategy {
    fn platform(&self) -> Platform {
        Platform::Browser
    }

    async fn construct(&self, target: Option<&str>) -> Result<Arc<dyn RawDriver>, DriverError> {
        let session = self
            .client
            .new_session(
                &self.settings.webdriver_url,
                Platform::Browser,
                self.capabilities(),
            )
            .await?;

        if let Some(url) = target {
            if let Err(e) = session.navigate(url).await {
                // The session exists on the driver side; do not leak it.
                if let Err(close_err) = session.close().await {
                    warn!(error = %close_err, "Failed to close browser after navigation error");
                }
                return Err(e);
            }
        }
        Ok(Arc::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_request_chrome_with_configured_args() {
        let strategy = BrowserStrategy::new(
            WebDriverClient::default(),
            BrowserSettings {
                webdriver_url: "http://localhost:9515".into(),
                chrome_args: vec!["--headless=new".into()],
            },
        );
        let caps = strategy.capabilities();
        assert_eq!(caps["browserName"], json!("chrome"));
        assert_eq!(caps["goog:chromeOptions"]["args"], json!(["--headless=new"]));
    }
}
