//! Alumnium MCP Server
//!
//! This library provides an MCP (Model Context Protocol) server for
//! natural-language UI automation. Agents start browser or mobile drivers,
//! then drive them with goals ("click login button"), checks ("page title is
//! Login"), and extraction requests ("product prices").
//!
//! # Architecture
//!
//! - **ResourceRegistry**: Handle → resource maps for drivers and areas.
//!   Handles are random UUIDs and never reused.
//!
//! - **SessionManager**: Creates, uses, and tears down driver sessions and
//!   the areas derived from them. Quitting a driver cascades to its areas.
//!
//! - **Dispatcher**: Validates a tool call against the catalogue, runs it on
//!   its own task, and folds every outcome into a success or failure result.
//!
//! - **AlumniumMcpServer**: The rmcp `ServerHandler` serving the catalogue
//!   over stdio or Streamable HTTP.
//!
//! The automation engine and the WebDriver endpoints are external; the
//! bundled clients in [`engine::remote`] and [`driver::webdriver`] talk to
//! them over HTTP.
//!
//! # Tools
//!
//! ## Lifecycle
//! - `start_driver`: Start a browser or iOS driver
//! - `quit_driver`: Close a driver and every area derived from it
//! - `save_cache`: Persist the engine's learned interactions
//!
//! ## Automation
//! - `do`: Execute a natural-language goal
//! - `check`: Verify a statement about the current screen
//! - `get`: Extract data from the current screen
//!
//! ## Areas
//! - `area`: Scope to one region of the screen
//! - `area_do` / `area_check` / `area_get`: The same operations inside an area
//!
//! ## Debug
//! - `get_debug_tree`: Structured snapshot of what the engine sees

use std::path::PathBuf;

pub mod config;
pub mod dispatch;
pub mod driver;
pub mod engine;
pub mod error;
pub mod registry;
pub mod server;
pub mod session;
pub mod tool_registry;

#[cfg(test)]
mod testing;

pub use config::Settings;
pub use dispatch::{Dispatcher, ResultEnvelope, ToolCall};
pub use error::{ErrorKind, ResourceKind, ToolError};
pub use registry::{Handle, ResourceRegistry};
pub use server::{AlumniumMcpServer, ServerMode};
pub use session::SessionManager;
pub use tool_registry::{ToolCategory, ToolDefinition, TOOL_REGISTRY};

/// Expand `~/` prefix to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    path.strip_prefix("~/")
        .and_then(|stripped| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(stripped)))
        .unwrap_or_else(|| PathBuf::from(path))
}
