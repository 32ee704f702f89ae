//! Tool call dispatch.
//!
//! 1. Resolve the tool in the catalogue.
//! 2. Validate arguments and build a [`ToolCall`].
//! 3. Run it on its own task against the [`SessionManager`].
//!
//! No failure leaves a single call: errors and handler panics both come back
//! as [`ResultEnvelope::Failure`].

mod call;
mod envelope;

pub use call::{AreaArgs, CheckArgs, GetArgs, GoalArgs, StartDriverArgs, ToolCall};
pub use envelope::ResultEnvelope;

use crate::error::ToolError;
use crate::session::SessionManager;
use rmcp::model::JsonObject;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

#[derive(Clone)]
pub struct Dispatcher {
    manager: Arc<SessionManager>,
}

impl Dispatcher {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// `cancel` fires when the client gives up on the request. The handler
    /// still runs to completion, but a driver started for a cancelled request
    /// is quit again since nobody will learn its handle.
    #[instrument(skip(self, arguments, cancel))]
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        cancel: CancellationToken,
    ) -> ResultEnvelope {
        let call = match ToolCall::parse(name, arguments) {
            Ok(call) => call,
            Err(e) => {
                debug!(error = %e, "Rejected tool call");
                return ResultEnvelope::Failure(e);
            }
        };

        let manager = self.manager.clone();
        let task = tokio::spawn(async move { execute(&manager, call, &cancel).await });
        let envelope = match task.await {
            Ok(result) => ResultEnvelope::from(result),
            Err(join) if join.is_panic() => {
                let message = panic_message(join.into_panic());
                warn!(tool = name, panic = %message, "Tool handler panicked");
                ResultEnvelope::Failure(ToolError::Internal(message))
            }
            Err(_) => ResultEnvelope::Failure(ToolError::Internal("tool call was cancelled".into())),
        };
        if let ResultEnvelope::Failure(e) = &envelope {
            debug!(kind = ?e.kind(), error = %e, "Tool call failed");
        }
        envelope
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Extracted values print verbatim when they are strings, as compact JSON otherwise.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn execute(
    manager: &SessionManager,
    call: ToolCall,
    cancel: &CancellationToken,
) -> Result<String, ToolError> {
    match call {
        ToolCall::StartDriver(args) => {
            let started = manager
                .start_driver(args.platform, args.target.as_deref())
                .await?;
            if cancel.is_cancelled() {
                warn!(driver = %started.handle, "Request cancelled during start_driver; quitting driver");
                manager.quit_driver(&started.handle).await?;
                return Err(ToolError::Internal("request was cancelled".into()));
            }
            Ok(format!(
                "Driver started successfully. driver_handle: {}\nPlatform: {}\nModel: {}",
                started.handle, started.platform, started.model
            ))
        }
        ToolCall::Do(args) => {
            manager.do_goal(&args.handle, &args.goal).await?;
            Ok(format!("Successfully executed: {}", args.goal))
        }
        ToolCall::Check(args) => {
            let explanation = manager
                .check(&args.handle, &args.statement, args.vision)
                .await?;
            Ok(format!(
                "Check passed: {}\nExplanation: {explanation}",
                args.statement
            ))
        }
        ToolCall::Get(args) => {
            let value = manager.get(&args.handle, &args.data, args.vision).await?;
            Ok(format!("Extracted data: {}", render_value(&value)))
        }
        ToolCall::Area(args) => {
            let handle = manager.create_area(&args.driver, &args.description).await?;
            Ok(format!(
                "Area created successfully. area_handle: {handle}\nDescription: {}",
                args.description
            ))
        }
        ToolCall::AreaDo(args) => {
            manager.area_do(&args.handle, &args.goal).await?;
            Ok(format!("Successfully executed in area: {}", args.goal))
        }
        ToolCall::AreaCheck(args) => {
            let explanation = manager
                .area_check(&args.handle, &args.statement, args.vision)
                .await?;
            Ok(format!(
                "Check passed: {}\nExplanation: {explanation}",
                args.statement
            ))
        }
        ToolCall::AreaGet(args) => {
            let value = manager
                .area_get(&args.handle, &args.data, args.vision)
                .await?;
            Ok(format!("Extracted data: {}", render_value(&value)))
        }
        ToolCall::GetDebugTree(handle) => {
            let tree = manager.debug_tree(&handle).await?;
            Ok(format!("Debug Tree:\n{tree}"))
        }
        ToolCall::QuitDriver(handle) => {
            manager.quit_driver(&handle).await?;
            Ok(format!("Driver {handle} closed successfully"))
        }
        ToolCall::SaveCache(handle) => {
            manager.save_cache(&handle).await?;
            Ok(format!("Cache saved successfully for driver {handle}"))
        }
    }
}
