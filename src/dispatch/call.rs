//! Argument validation and typed tool calls.

use crate::driver::Platform;
use crate::error::{ResourceKind, ToolError};
use crate::registry::Handle;
use crate::tool_registry::{get_tool, ArgKind, ToolDefinition};
use rmcp::model::JsonObject;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct StartDriverArgs {
    pub platform: Platform,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalArgs {
    pub handle: Handle,
    pub goal: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckArgs {
    pub handle: Handle,
    pub statement: String,
    pub vision: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetArgs {
    pub handle: Handle,
    pub data: String,
    pub vision: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaArgs {
    pub driver: Handle,
    pub description: String,
}

/// One validated invocation. Handles in `Area*` variants are area handles;
/// every other handle is a driver handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    StartDriver(StartDriverArgs),
    Do(GoalArgs),
    Check(CheckArgs),
    Get(GetArgs),
    Area(AreaArgs),
    AreaDo(GoalArgs),
    AreaCheck(CheckArgs),
    AreaGet(GetArgs),
    GetDebugTree(Handle),
    QuitDriver(Handle),
    SaveCache(Handle),
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartDriver(_) => "start_driver",
            Self::Do(_) => "do",
            Self::Check(_) => "check",
            Self::Get(_) => "get",
            Self::Area(_) => "area",
            Self::AreaDo(_) => "area_do",
            Self::AreaCheck(_) => "area_check",
            Self::AreaGet(_) => "area_get",
            Self::GetDebugTree(_) => "get_debug_tree",
            Self::QuitDriver(_) => "quit_driver",
            Self::SaveCache(_) => "save_cache",
        }
    }

    /// Validate `arguments` against the catalogue and build the call.
    pub fn parse(name: &str, arguments: Option<JsonObject>) -> Result<Self, ToolError> {
        let def = get_tool(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let args = Args::validate(def, arguments.unwrap_or_default())?;

        let call = match def.name {
            "start_driver" => {
                let raw = args.string("platform")?;
                let platform = raw.parse::<Platform>().map_err(|_| {
                    ToolError::invalid_argument("platform", format!("unknown platform '{raw}'"))
                })?;
                Self::StartDriver(StartDriverArgs {
                    platform,
                    target: args.optional_string("target")?,
                })
            }
            "do" => Self::Do(args.goal(ResourceKind::Driver)?),
            "check" => Self::Check(args.check(ResourceKind::Driver)?),
            "get" => Self::Get(args.get(ResourceKind::Driver)?),
            "area" => Self::Area(AreaArgs {
                driver: args.handle(ResourceKind::Driver)?,
                description: args.string("description")?,
            }),
            "area_do" => Self::AreaDo(args.goal(ResourceKind::Area)?),
            "area_check" => Self::AreaCheck(args.check(ResourceKind::Area)?),
            "area_get" => Self::AreaGet(args.get(ResourceKind::Area)?),
            "get_debug_tree" => Self::GetDebugTree(args.handle(ResourceKind::Driver)?),
            "quit_driver" => Self::QuitDriver(args.handle(ResourceKind::Driver)?),
            "save_cache" => Self::SaveCache(args.handle(ResourceKind::Driver)?),
            other => return Err(ToolError::Internal(format!("no handler for tool {other}"))),
        };
        Ok(call)
    }
}

/// Arguments that passed presence and type checks, with defaults filled in.
struct Args {
    values: JsonObject,
}

impl Args {
    fn validate(def: &ToolDefinition, mut values: JsonObject) -> Result<Self, ToolError> {
        // Absent and null are the same thing.
        values.retain(|_, v| !v.is_null());

        if let Some(missing) = def.required_args().find(|a| !values.contains_key(a.name)) {
            return Err(ToolError::MissingArgument(missing.name.to_string()));
        }

        for arg in def.args {
            if let (Some(default), false) = (arg.default, values.contains_key(arg.name)) {
                values.insert(arg.name.to_string(), default.to_value());
            }
        }

        for arg in def.args {
            let Some(value) = values.get(arg.name) else {
                continue;
            };
            match (arg.kind, value) {
                (ArgKind::String, Value::String(_)) | (ArgKind::Boolean, Value::Bool(_)) => {}
                (ArgKind::Enum(choices), Value::String(s)) => {
                    if !choices.contains(&s.as_str()) {
                        return Err(ToolError::invalid_argument(
                            arg.name,
                            format!("must be one of {}", choices.join(", ")),
                        ));
                    }
                }
                (ArgKind::Boolean, other) => {
                    return Err(ToolError::invalid_argument(
                        arg.name,
                        format!("expected a boolean, got {}", type_name(other)),
                    ))
                }
                (_, other) => {
                    return Err(ToolError::invalid_argument(
                        arg.name,
                        format!("expected a string, got {}", type_name(other)),
                    ))
                }
            }
        }

        Ok(Self { values })
    }

    fn string(&self, name: &str) -> Result<String, ToolError> {
        self.optional_string(name)?
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    fn optional_string(&self, name: &str) -> Result<Option<String>, ToolError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ToolError::invalid_argument(
                name,
                format!("expected a string, got {}", type_name(other)),
            )),
        }
    }

    fn flag(&self, name: &str) -> bool {
        self.values.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    fn handle(&self, kind: ResourceKind) -> Result<Handle, ToolError> {
        let name = match kind {
            ResourceKind::Driver => "driver_handle",
            ResourceKind::Area => "area_handle",
        };
        Handle::parse(kind, &self.string(name)?)
    }

    fn goal(&self, kind: ResourceKind) -> Result<GoalArgs, ToolError> {
        Ok(GoalArgs {
            handle: self.handle(kind)?,
            goal: self.string("goal")?,
        })
    }

    fn check(&self, kind: ResourceKind) -> Result<CheckArgs, ToolError> {
        Ok(CheckArgs {
            handle: self.handle(kind)?,
            statement: self.string("statement")?,
            vision: self.flag("vision"),
        })
    }

    fn get(&self, kind: ResourceKind) -> Result<GetArgs, ToolError> {
        Ok(GetArgs {
            handle: self.handle(kind)?,
            data: self.string("data")?,
            vision: self.flag("vision"),
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn args(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    const HANDLE: &str = "6f1c2a3e-0b7d-4e39-9a51-2d8c4f6e7a90";

    #[test]
    fn unknown_tool_is_rejected_first() {
        let err = ToolCall::parse("alumnium_do", args(json!({ "goal": 1 }))).unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("alumnium_do".into()));
    }

    #[test]
    fn missing_argument_wins_over_type_errors() {
        let err = ToolCall::parse("do", args(json!({ "goal": 42 }))).unwrap_err();
        assert_eq!(err, ToolError::MissingArgument("driver_handle".into()));
    }

    #[test]
    fn first_missing_in_declaration_order() {
        let err = ToolCall::parse("check", None).unwrap_err();
        assert_eq!(err, ToolError::MissingArgument("driver_handle".into()));
        let err = ToolCall::parse("check", args(json!({ "driver_handle": HANDLE }))).unwrap_err();
        assert_eq!(err, ToolError::MissingArgument("statement".into()));
    }

    /// A value of the right shape for every argument of `def`.
    fn complete(def: &ToolDefinition) -> JsonObject {
        def.args
            .iter()
            .map(|arg| {
                let value = match arg.kind {
                    ArgKind::String if arg.name.ends_with("_handle") => json!(HANDLE),
                    ArgKind::String => json!("x"),
                    ArgKind::Boolean => json!(true),
                    ArgKind::Enum(choices) => json!(choices[0]),
                };
                (arg.name.to_string(), value)
            })
            .collect()
    }

    #[test]
    fn every_required_argument_is_enforced() {
        for def in crate::tool_registry::TOOL_REGISTRY {
            assert!(ToolCall::parse(def.name, Some(complete(def))).is_ok(), "{}", def.name);
            for arg in def.args.iter().filter(|a| a.required) {
                let mut values = complete(def);
                values.remove(arg.name);
                let err = ToolCall::parse(def.name, Some(values)).unwrap_err();
                assert_eq!(err, ToolError::MissingArgument(arg.name.into()), "{}", def.name);
            }
        }
    }

    #[test]
    fn null_counts_as_absent() {
        let err = ToolCall::parse(
            "area",
            args(json!({ "driver_handle": HANDLE, "description": null })),
        )
        .unwrap_err();
        assert_eq!(err, ToolError::MissingArgument("description".into()));
    }

    #[test]
    fn vision_defaults_to_false() {
        let call = ToolCall::parse(
            "get",
            args(json!({ "driver_handle": HANDLE, "data": "title", "vision": null })),
        )
        .unwrap();
        match call {
            ToolCall::Get(get) => {
                assert!(!get.vision);
                assert_eq!(get.data, "title");
                assert_eq!(get.handle.to_string(), HANDLE);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn wrong_types_are_invalid() {
        let err = ToolCall::parse(
            "check",
            args(json!({ "driver_handle": HANDLE, "statement": "ok", "vision": "yes" })),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("vision"));

        let err = ToolCall::parse("do", args(json!({ "driver_handle": 7, "goal": "x" }))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn platform_must_be_a_known_choice() {
        let err = ToolCall::parse("start_driver", args(json!({ "platform": "windows" }))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let call = ToolCall::parse("start_driver", args(json!({ "platform": "chromium" }))).unwrap();
        assert_eq!(
            call,
            ToolCall::StartDriver(StartDriverArgs {
                platform: Platform::Browser,
                target: None,
            })
        );
    }

    #[test]
    fn malformed_handle_is_not_found() {
        let err = ToolCall::parse("area_do", args(json!({ "area_handle": "area-1", "goal": "x" })))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandleNotFound);
        assert!(err.to_string().starts_with("area area-1 not found"));
    }

    #[test]
    fn extra_arguments_are_ignored() {
        let call = ToolCall::parse(
            "quit_driver",
            args(json!({ "driver_handle": HANDLE, "force": true })),
        )
        .unwrap();
        assert_eq!(call.name(), "quit_driver");
    }
}
