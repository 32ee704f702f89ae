//! Minimal W3C WebDriver client over HTTP.
//!
//! Only the three commands the server needs: new session, navigate, and
//! delete session. Both chromedriver and Appium speak this protocol.

use super::{DriverError, Platform, RawDriver};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Timeout for a single WebDriver HTTP request.
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Shared HTTP client for WebDriver endpoints.
#[derive(Clone)]
pub struct WebDriverClient {
    http: Client,
}

impl Default for WebDriverClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
    }
}

impl WebDriverClient {
    pub fn new(timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http }
    }

    /// `POST /session` with the given capabilities.
    pub async fn new_session(
        &self,
        endpoint: &str,
        platform: Platform,
        capabilities: Map<String, Value>,
    ) -> Result<WebDriverSession, DriverError> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });
        debug!(endpoint = %endpoint, platform = %platform, "Creating WebDriver session");

        let response = self
            .http
            .post(format!("{endpoint}/session"))
            .json(&body)
            .send()
            .await?;
        let value = read_value(response).await?;
        let session_id = session_id_from(&value)?;

        Ok(WebDriverSession {
            http: self.http.clone(),
            endpoint,
            session_id,
            platform,
            closed: AtomicBool::new(false),
        })
    }
}

/// One WebDriver session.
pub struct WebDriverSession {
    http: Client,
    endpoint: String,
    session_id: String,
    platform: Platform,
    closed: AtomicBool,
}

impl WebDriverSession {
    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.endpoint, self.session_id, path)
    }
}

#[async_trait]
impl RawDriver for WebDriverSession {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn navigate(&self, target: &str) -> Result<(), DriverError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::Closed);
        }
        let response = self
            .http
            .post(self.url("/url"))
            .json(&json!({ "url": target }))
            .send()
            .await?;
        read_value(response).await.map(|_| ())
    }

    async fn close(&self) -> Result<(), DriverError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(session_id = %self.session_id, "Deleting WebDriver session");
        let response = self.http.delete(self.url("")).send().await?;
        read_value(response).await.map(|_| ())
    }
}

/// Unwrap the `value` member of a WebDriver response, mapping error payloads.
async fn read_value(response: Response) -> Result<Value, DriverError> {
    let status = response.status();
    let text = response.text().await?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    Err(DriverError::Protocol(describe_error(status.as_u16(), &value, &text)))
}

fn describe_error(status: u16, value: &Value, raw: &str) -> String {
    let error = value.get("error").and_then(Value::as_str);
    let message = value.get("message").and_then(Value::as_str);
    match (error, message) {
        (Some(error), Some(message)) => format!("{error}: {message}"),
        (Some(error), None) => error.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) if raw.trim().is_empty() => format!("HTTP {status}"),
        (None, None) => format!("HTTP {status}: {}", raw.trim()),
    }
}

fn session_id_from(value: &Value) -> Result<String, DriverError> {
    value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DriverError::Protocol("new session response has no sessionId".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_read_from_value() {
        let value = json!({ "sessionId": "abc123", "capabilities": {} });
        assert_eq!(session_id_from(&value).unwrap(), "abc123");
        assert!(session_id_from(&json!({})).is_err());
    }

    #[test]
    fn error_payloads_are_described() {
        let value = json!({ "error": "session not created", "message": "Chrome failed to start" });
        assert_eq!(
            describe_error(500, &value, ""),
            "session not created: Chrome failed to start"
        );
        assert_eq!(describe_error(502, &Value::Null, ""), "HTTP 502");
        assert_eq!(
            describe_error(404, &Value::Null, "no such route\n"),
            "HTTP 404: no such route"
        );
    }
}
