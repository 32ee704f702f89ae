//! HTTP client for an Alumnium automation server.
//!
//! The remote engine drives the WebDriver session this server created: the
//! session is registered with the engine by endpoint and session id, and
//! every goal, check, and extraction is forwarded as JSON.

use super::{AreaEngine, AutomationEngine, EngineError, EngineFactory, Model};
use crate::driver::RawDriver;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Timeout for HTTP requests to the engine; planning can be slow.
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Clone)]
struct EngineClient {
    http: Client,
    base_url: String,
}

impl EngineClient {
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, EngineError> {
        let url = format!("{}/v1{}", self.base_url, path);
        debug!(method = %method, url = %url, "Engine request");
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()))
        };
        if status.is_success() {
            Ok(value)
        } else {
            Err(EngineError::Failed(error_message(status.as_u16(), &value)))
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, EngineError> {
        self.call(Method::POST, path, Some(body)).await
    }
}

fn error_message(status: u16, value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .get("error")
            .or_else(|| map.get("detail"))
            .map(|e| match e {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| format!("HTTP {status}: {value}")),
        Value::String(s) => format!("HTTP {status}: {}", s.trim()),
        _ => format!("HTTP {status}"),
    }
}

fn field<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, EngineError> {
    serde_json::from_value(value).map_err(|e| EngineError::Failed(format!("malformed engine response: {e}")))
}

#[derive(Deserialize)]
struct SessionCreated {
    session_id: String,
}

#[derive(Deserialize)]
struct AreaCreated {
    area_id: String,
}

#[derive(Deserialize)]
struct CheckOutcome {
    passed: bool,
    #[serde(default)]
    explanation: String,
}

#[derive(Deserialize)]
struct Extracted {
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
struct DebugTree {
    tree: String,
}

/// Creates [`RemoteEngine`]s against one engine server.
pub struct RemoteEngineFactory {
    client: EngineClient,
}

impl RemoteEngineFactory {
    pub fn new(base_url: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client: EngineClient {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
            },
        }
    }
}

#[async_trait]
impl EngineFactory for RemoteEngineFactory {
    async fn construct(
        &self,
        driver: Arc<dyn RawDriver>,
        model: &Model,
    ) -> Result<Arc<dyn AutomationEngine>, EngineError> {
        let created: SessionCreated = field(
            self.client
                .post(
                    "/sessions",
                    json!({
                        "provider": model.provider.as_str(),
                        "name": model.name,
                        "platform": driver.platform().as_str(),
                        "webdriver": {
                            "endpoint": driver.endpoint(),
                            "session_id": driver.session_id(),
                        },
                    }),
                )
                .await?,
        )?;
        Ok(Arc::new(RemoteEngine {
            client: self.client.clone(),
            session_id: created.session_id,
            released: AtomicBool::new(false),
        }))
    }
}

/// Do/check/get against a path prefix (a session or one of its areas).
async fn do_goal(client: &EngineClient, prefix: &str, goal: &str) -> Result<(), EngineError> {
    client
        .post(&format!("{prefix}/do"), json!({ "goal": goal }))
        .await
        .map(|_| ())
}

async fn check(
    client: &EngineClient,
    prefix: &str,
    statement: &str,
    vision: bool,
) -> Result<String, EngineError> {
    let outcome: CheckOutcome = field(
        client
            .post(
                &format!("{prefix}/check"),
                json!({ "statement": statement, "vision": vision }),
            )
            .await?,
    )?;
    if outcome.passed {
        Ok(outcome.explanation)
    } else {
        Err(EngineError::VerificationFailed(outcome.explanation))
    }
}

async fn get(
    client: &EngineClient,
    prefix: &str,
    data: &str,
    vision: bool,
) -> Result<Value, EngineError> {
    let extracted: Extracted = field(
        client
            .post(&format!("{prefix}/get"), json!({ "data": data, "vision": vision }))
            .await?,
    )?;
    Ok(extracted.value)
}

pub struct RemoteEngine {
    client: EngineClient,
    session_id: String,
    released: AtomicBool,
}

impl RemoteEngine {
    fn prefix(&self) -> String {
        format!("/sessions/{}", self.session_id)
    }
}

#[async_trait]
impl AreaEngine for RemoteEngine {
    async fn do_goal(&self, goal: &str) -> Result<(), EngineError> {
        do_goal(&self.client, &self.prefix(), goal).await
    }

    async fn check(&self, statement: &str, vision: bool) -> Result<String, EngineError> {
        check(&self.client, &self.prefix(), statement, vision).await
    }

    async fn get(&self, data: &str, vision: bool) -> Result<Value, EngineError> {
        get(&self.client, &self.prefix(), data, vision).await
    }
}

#[async_trait]
impl AutomationEngine for RemoteEngine {
    async fn derive_area(&self, description: &str) -> Result<Arc<dyn AreaEngine>, EngineError> {
        let created: AreaCreated = field(
            self.client
                .post(
                    &format!("{}/areas", self.prefix()),
                    json!({ "description": description }),
                )
                .await?,
        )?;
        Ok(Arc::new(RemoteArea {
            client: self.client.clone(),
            prefix: format!("{}/areas/{}", self.prefix(), created.area_id),
        }))
    }

    async fn debug_tree(&self) -> Result<String, EngineError> {
        let tree: DebugTree = field(
            self.client
                .call(Method::GET, &format!("{}/debug_tree", self.prefix()), None)
                .await?,
        )?;
        Ok(tree.tree)
    }

    async fn persist_cache(&self) -> Result<(), EngineError> {
        self.client
            .post(&format!("{}/cache", self.prefix()), json!({}))
            .await
            .map(|_| ())
    }

    async fn release(&self) -> Result<(), EngineError> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.client
            .call(Method::DELETE, &self.prefix(), None)
            .await
            .map(|_| ())
    }
}

/// Area scoped within a remote engine session.
pub struct RemoteArea {
    client: EngineClient,
    prefix: String,
}

#[async_trait]
impl AreaEngine for RemoteArea {
    async fn do_goal(&self, goal: &str) -> Result<(), EngineError> {
        do_goal(&self.client, &self.prefix, goal).await
    }

    async fn check(&self, statement: &str, vision: bool) -> Result<String, EngineError> {
        check(&self.client, &self.prefix, statement, vision).await
    }

    async fn get(&self, data: &str, vision: bool) -> Result<Value, EngineError> {
        get(&self.client, &self.prefix, data, vision).await
    }
}
