//! Error types for the Alumnium MCP server.
//!
//! Every failure a tool call can produce is a [`ToolError`]. Errors never leave
//! a single call: the dispatcher turns them into a failure envelope, which the
//! transport renders as a text result with `is_error: true`.

use crate::driver::DriverError;
use crate::engine::EngineError;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use thiserror::Error;

/// Which registry a handle was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Driver,
    Area,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Area => "area",
        }
    }

    /// Tool that creates resources of this kind, used in hints.
    fn creator(&self) -> &'static str {
        match self {
            Self::Driver => "start_driver",
            Self::Area => "area",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable failure category carried in failure envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    MissingArgument,
    InvalidArgument,
    HandleNotFound,
    UnsupportedPlatform,
    AutomationFailure,
    ConstructionFailure,
    Timeout,
    Internal,
}

/// Tool execution errors - returned with is_error: true in CallToolResult
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("{} {handle} not found. Call {} first.", kind.as_str(), kind.creator())]
    HandleNotFound { kind: ResourceKind, handle: String },

    #[error("Platform {0} is not yet supported")]
    UnsupportedPlatform(String),

    #[error("{0}")]
    AutomationFailure(String),

    #[error("Failed to start driver: {0}")]
    ConstructionFailure(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn handle_not_found(kind: ResourceKind, handle: impl Into<String>) -> Self {
        ToolError::HandleNotFound {
            kind,
            handle: handle.into(),
        }
    }

    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::MissingArgument(_) => ErrorKind::MissingArgument,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::HandleNotFound { .. } => ErrorKind::HandleNotFound,
            Self::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
            Self::AutomationFailure(_) => ErrorKind::AutomationFailure,
            Self::ConstructionFailure(_) => ErrorKind::ConstructionFailure,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Convert to MCP CallToolResult with is_error: true
    pub fn to_tool_result(&self) -> CallToolResult {
        CallToolResult::error(vec![Content::text(format!("Error: {self}"))])
    }
}

impl From<EngineError> for ToolError {
    fn from(e: EngineError) -> Self {
        ToolError::AutomationFailure(e.to_string())
    }
}

impl From<DriverError> for ToolError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Unsupported(platform) => ToolError::UnsupportedPlatform(platform),
            other => ToolError::ConstructionFailure(other.to_string()),
        }
    }
}
