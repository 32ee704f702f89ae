use alumnium_mcp::tool_registry::{ArgKind, ArgSpec};
use alumnium_mcp::{ToolCategory, ToolDefinition, TOOL_REGISTRY};
use std::collections::HashMap;
use std::fmt::Write as _;

fn category_title(cat: ToolCategory) -> &'static str {
    match cat {
        ToolCategory::Lifecycle => "Lifecycle",
        ToolCategory::Automation => "Automation",
        ToolCategory::Areas => "Areas",
        ToolCategory::Debug => "Debug",
    }
}

fn arg_type(arg: &ArgSpec) -> String {
    match arg.kind {
        ArgKind::String => "string".to_string(),
        ArgKind::Boolean => "boolean".to_string(),
        ArgKind::Enum(choices) => choices
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(" \\| "),
    }
}

fn write_tool(out: &mut String, tool: &ToolDefinition) {
    let _ = writeln!(out, "### `{}`\n", tool.name);
    let _ = writeln!(out, "{}\n", tool.description);
    let _ = writeln!(out, "| Argument | Type | Required | Default | Description |");
    let _ = writeln!(out, "|----------|------|----------|---------|-------------|");
    for arg in tool.args {
        let default = arg
            .default
            .map(|d| format!("`{}`", d.to_value()))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {} | {} |",
            arg.name,
            arg_type(arg),
            if arg.required { "yes" } else { "no" },
            default,
            arg.description
        );
    }
    let _ = writeln!(out, "\nExample: `{}`\n", tool.example);
}

fn main() {
    let mut groups: HashMap<ToolCategory, Vec<&ToolDefinition>> = HashMap::new();
    for tool in TOOL_REGISTRY {
        groups.entry(tool.category).or_default().push(tool);
    }

    let tool_count = TOOL_REGISTRY.len();

    let mut out = String::new();
    let _ = writeln!(out, "# Tools\n");
    let _ = writeln!(
        out,
        "> Auto-generated from `src/tool_registry.rs`. Do not edit by hand."
    );
    let _ = writeln!(
        out,
        "> Regenerate with: `cargo run --bin gen_tools_doc -- docs/TOOLS.md`.\n"
    );

    let _ = writeln!(out, "## Workflow\n");
    let _ = writeln!(
        out,
        "- `tools/list` returns the full tool set (currently {tool_count} tools)"
    );
    let _ = writeln!(
        out,
        "- `start_driver` returns a `driver_handle`; `area` returns an `area_handle`"
    );
    let _ = writeln!(
        out,
        "- `quit_driver` closes the driver and invalidates every area derived from it"
    );
    let _ = writeln!(
        out,
        "- Failures come back as text starting with `Error: ` and `isError: true`"
    );
    let _ = writeln!(out);

    for &cat in ToolCategory::all() {
        let Some(tools) = groups.get(&cat) else {
            continue;
        };
        let _ = writeln!(out, "## {} (`{}`)\n", category_title(cat), cat.as_str());
        let _ = writeln!(out, "{}\n", cat.description());
        for tool in tools {
            write_tool(&mut out, tool);
        }
    }

    let _ = writeln!(out, "## Configuration\n");
    for (var, meaning) in [
        ("ALUMNIUM_MODEL", "Model as `provider/name`"),
        ("ALUMNIUM_SERVER_URL", "Automation engine server"),
        ("ALUMNIUM_CHROMEDRIVER_URL", "chromedriver endpoint for `browser`"),
        ("ALUMNIUM_CHROME_ARGS", "Comma-separated Chrome arguments"),
        ("ALUMNIUM_APPIUM_SERVER", "Appium endpoint for `ios`"),
        ("ALUMNIUM_IOS_DEVICE_NAME", "Simulator or device name"),
        ("ALUMNIUM_IOS_PLATFORM_VERSION", "iOS version"),
        ("ALUMNIUM_MCP_CALL_TIMEOUT_SECS", "Upper bound for one call"),
    ] {
        let _ = writeln!(out, "- `{var}`: {meaning}");
    }

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        if let Err(err) = std::fs::write(&args[1], out) {
            eprintln!("failed to write {}: {}", args[1], err);
            std::process::exit(1);
        }
    } else {
        print!("{out}");
    }
}
