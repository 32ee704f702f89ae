//! Tool catalogue: the fixed set of tools this server exposes.
//!
//! Every tool is advertised in tools/list. The catalogue is static data; the
//! dispatcher validates calls against it and the doc generator renders it.

use rmcp::model::{JsonObject, Tool};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use std::sync::Arc;

/// Tool category for grouping related tools in docs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Driver start/stop and cache persistence
    Lifecycle,
    /// Goals, checks, and extraction against a whole driver
    Automation,
    /// Scoped areas and operations inside them
    Areas,
    /// Debugging helpers
    Debug,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lifecycle => "lifecycle",
            Self::Automation => "automation",
            Self::Areas => "areas",
            Self::Debug => "debug",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Lifecycle => "Start and stop drivers, persist the learned cache",
            Self::Automation => "Natural-language goals, checks, and data extraction",
            Self::Areas => "Scope operations to one region of the screen",
            Self::Debug => "Inspect what the engine sees",
        }
    }

    pub fn all() -> &'static [ToolCategory] {
        &[Self::Lifecycle, Self::Automation, Self::Areas, Self::Debug]
    }
}

/// Kind of value an argument accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Boolean,
    /// A string restricted to the listed choices.
    Enum(&'static [&'static str]),
}

impl ArgKind {
    fn json_type(&self) -> &'static str {
        match self {
            Self::String | Self::Enum(_) => "string",
            Self::Boolean => "boolean",
        }
    }
}

/// Value substituted for an absent optional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDefault {
    Bool(bool),
}

impl ArgDefault {
    pub fn to_value(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub description: &'static str,
    pub default: Option<ArgDefault>,
}

/// Metadata for a single tool
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub category: ToolCategory,
    /// Description sent to clients
    pub description: &'static str,
    /// Example invocation (JSON)
    pub example: &'static str,
    /// Arguments in declaration order
    pub args: &'static [ArgSpec],
}

impl ToolDefinition {
    pub fn arg(&self, name: &str) -> Option<&'static ArgSpec> {
        self.args.iter().find(|a| a.name == name)
    }

    pub fn required_args(&self) -> impl Iterator<Item = &'static ArgSpec> {
        self.args.iter().filter(|a| a.required)
    }
}

/// Platform names accepted by `start_driver`.
pub const PLATFORM_CHOICES: &[&str] = &["browser", "chromium", "ios", "android"];

const fn required(name: &'static str, kind: ArgKind, description: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        kind,
        required: true,
        description,
        default: None,
    }
}

const DRIVER_HANDLE: ArgSpec = required(
    "driver_handle",
    ArgKind::String,
    "Handle returned by start_driver",
);

const AREA_HANDLE: ArgSpec = required("area_handle", ArgKind::String, "Handle returned by area");

const VISION: ArgSpec = ArgSpec {
    name: "vision",
    kind: ArgKind::Boolean,
    required: false,
    description: "Include a screenshot in the engine's reasoning",
    default: Some(ArgDefault::Bool(false)),
};

const GOAL: ArgSpec = required(
    "goal",
    ArgKind::String,
    "What to accomplish, e.g. 'click login button'",
);

const STATEMENT: ArgSpec = required(
    "statement",
    ArgKind::String,
    "Statement expected to be true, e.g. 'page title is Login'",
);

const DATA: ArgSpec = required(
    "data",
    ArgKind::String,
    "What to extract, e.g. 'product prices'",
);

/// Static registry of all tools
pub static TOOL_REGISTRY: &[ToolDefinition] = &[
    ToolDefinition {
        name: "start_driver",
        category: ToolCategory::Lifecycle,
        description: "Start a browser or mobile driver for automated testing. \
                      Returns a driver_handle for use in other calls.",
        example: r#"{"platform": "browser", "target": "https://example.com"}"#,
        args: &[
            required(
                "platform",
                ArgKind::Enum(PLATFORM_CHOICES),
                "Platform to automate",
            ),
            ArgSpec {
                name: "target",
                kind: ArgKind::String,
                required: false,
                description: "URL to open (browser) or app path (ios)",
                default: None,
            },
        ],
    },
    ToolDefinition {
        name: "do",
        category: ToolCategory::Automation,
        description: "Execute a goal using natural language (e.g. 'click login button', \
                      'fill out the form'). The engine plans and executes the necessary steps.",
        example: r#"{"driver_handle": "…", "goal": "click login button"}"#,
        args: &[DRIVER_HANDLE, GOAL],
    },
    ToolDefinition {
        name: "check",
        category: ToolCategory::Automation,
        description: "Verify a statement is true about the current screen. \
                      Fails if it is false. Returns the explanation.",
        example: r#"{"driver_handle": "…", "statement": "page title is Login", "vision": false}"#,
        args: &[DRIVER_HANDLE, STATEMENT, VISION],
    },
    ToolDefinition {
        name: "get",
        category: ToolCategory::Automation,
        description: "Extract data from the current screen (e.g. 'user name', \
                      'product prices', 'item count'). Returns the extracted data.",
        example: r#"{"driver_handle": "…", "data": "item count"}"#,
        args: &[DRIVER_HANDLE, DATA, VISION],
    },
    ToolDefinition {
        name: "area",
        category: ToolCategory::Areas,
        description: "Create a scoped area for focused operations (e.g. 'navigation sidebar', \
                      'product grid'). Returns an area_handle for use with area_* tools.",
        example: r#"{"driver_handle": "…", "description": "navigation sidebar"}"#,
        args: &[
            DRIVER_HANDLE,
            required(
                "description",
                ArgKind::String,
                "Region of the screen to scope to",
            ),
        ],
    },
    ToolDefinition {
        name: "area_do",
        category: ToolCategory::Areas,
        description: "Execute a goal within a scoped area. Same as do but limited to the area.",
        example: r#"{"area_handle": "…", "goal": "open the first item"}"#,
        args: &[AREA_HANDLE, GOAL],
    },
    ToolDefinition {
        name: "area_check",
        category: ToolCategory::Areas,
        description: "Verify a statement within a scoped area.",
        example: r#"{"area_handle": "…", "statement": "three items are listed"}"#,
        args: &[AREA_HANDLE, STATEMENT, VISION],
    },
    ToolDefinition {
        name: "area_get",
        category: ToolCategory::Areas,
        description: "Extract data from a scoped area.",
        example: r#"{"area_handle": "…", "data": "item titles"}"#,
        args: &[AREA_HANDLE, DATA, VISION],
    },
    ToolDefinition {
        name: "get_debug_tree",
        category: ToolCategory::Debug,
        description: "Get a structured representation of the current screen. \
                      Useful for understanding page structure.",
        example: r#"{"driver_handle": "…"}"#,
        args: &[DRIVER_HANDLE],
    },
    ToolDefinition {
        name: "quit_driver",
        category: ToolCategory::Lifecycle,
        description: "Close the browser or app and release the driver and all of its areas.",
        example: r#"{"driver_handle": "…"}"#,
        args: &[DRIVER_HANDLE],
    },
    ToolDefinition {
        name: "save_cache",
        category: ToolCategory::Lifecycle,
        description: "Save the learned interaction cache for a driver session \
                      so future runs can reuse it.",
        example: r#"{"driver_handle": "…"}"#,
        args: &[DRIVER_HANDLE],
    },
];

/// Get all tools
pub fn all_tools() -> impl Iterator<Item = &'static ToolDefinition> {
    TOOL_REGISTRY.iter()
}

/// Get tool by name
pub fn get_tool(name: &str) -> Option<&'static ToolDefinition> {
    TOOL_REGISTRY.iter().find(|t| t.name == name)
}

/// Get tools by category
pub fn tools_by_category(category: ToolCategory) -> impl Iterator<Item = &'static ToolDefinition> {
    TOOL_REGISTRY.iter().filter(move |t| t.category == category)
}

/// JSON Schema for a tool's arguments.
pub fn input_schema(def: &ToolDefinition) -> JsonObject {
    let mut properties = Map::new();
    for arg in def.args {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(arg.kind.json_type()));
        if let ArgKind::Enum(choices) = arg.kind {
            prop.insert("enum".into(), json!(choices));
        }
        prop.insert("description".into(), json!(arg.description));
        if let Some(default) = arg.default {
            prop.insert("default".into(), default.to_value());
        }
        properties.insert(arg.name.into(), Value::Object(prop));
    }
    let required: Vec<&str> = def.required_args().map(|a| a.name).collect();

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("required".into(), json!(required));
    schema
}

pub fn to_mcp_tool(def: &'static ToolDefinition) -> Tool {
    Tool {
        name: Cow::Borrowed(def.name),
        description: Some(Cow::Borrowed(def.description)),
        input_schema: Arc::new(input_schema(def)),
        annotations: None,
        execution: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }
}
