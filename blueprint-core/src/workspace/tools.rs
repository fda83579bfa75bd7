//! JSON tool protocol over a [`Workspace`].
//!
//! One request per line, one response per line:
//!
//! ```text
//! > {"name":"read","arguments":{"target":"index"}}
//! < {"content":[{"type":"text","text":"..."}],"isError":false}
//! ```

use std::io::{BufRead, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{SearchOptions, Workspace, WorkspaceError};
use crate::browser_log::ErrorFilter;

#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResponse {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResponse {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error<S: Into<String>>(text: S) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Concatenated text of every content block.
    pub fn body(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct ReadArgs {
    target: String,
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    filename: Option<String>,
    query: Option<String>,
    #[serde(flatten)]
    options: SearchOptions,
    component: Option<String>,
    parameter: Option<String>,
    #[serde(default)]
    universal: bool,
    examples: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    mode: String,
    filename: Option<String>,
    content: Option<String>,
    old_str: Option<String>,
    new_str: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecuteArgs {
    command: String,
    directory: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadErrorsArgs {
    #[serde(flatten)]
    filter: ErrorFilter,
    #[serde(default = "clear_old_default")]
    clear_old: bool,
}

fn clear_old_default() -> bool {
    true
}

/// Names of the tools [`dispatch`] understands.
pub const TOOL_NAMES: [&str; 5] = ["read", "search", "write", "execute", "read_errors"];

fn arguments<T: DeserializeOwned>(value: &Value) -> Result<T, WorkspaceError> {
    let value = if value.is_null() {
        Value::Object(Default::default())
    } else {
        value.clone()
    };
    Ok(serde_json::from_value(value)?)
}

fn required(value: Option<String>, name: &'static str) -> Result<String, WorkspaceError> {
    value.ok_or(WorkspaceError::MissingArgument(name))
}

pub fn dispatch(workspace: &Workspace, request: &ToolRequest) -> ToolResponse {
    debug!(tool = %request.name, "Tool call");
    match call(workspace, request) {
        Ok(text) => ToolResponse::text(text),
        Err(e) => {
            warn!(tool = %request.name, "Tool call failed: {e}");
            ToolResponse::error(format!("Error in {}: {e}", request.name))
        }
    }
}

fn call(workspace: &Workspace, request: &ToolRequest) -> Result<String, WorkspaceError> {
    match request.name.as_str() {
        "read" => read(workspace, arguments(&request.arguments)?),
        "search" => search(workspace, arguments(&request.arguments)?),
        "write" => write(workspace, arguments(&request.arguments)?),
        "execute" => execute(workspace, arguments(&request.arguments)?),
        "read_errors" => {
            let args: ReadErrorsArgs = arguments(&request.arguments)?;
            workspace.read_errors(&args.filter, args.clear_old)
        }
        other => Err(WorkspaceError::Unknown {
            kind: "tool",
            value: other.to_string(),
        }),
    }
}

fn read(workspace: &Workspace, args: ReadArgs) -> Result<String, WorkspaceError> {
    match args.target.as_str() {
        "file" => workspace.read_file(&required(args.filename, "filename")?),
        "index" => Ok(workspace.read_index()),
        "generated" => workspace.read_generated(),
        other => Err(WorkspaceError::Unknown {
            kind: "read target",
            value: other.to_string(),
        }),
    }
}

fn search(workspace: &Workspace, args: SearchArgs) -> Result<String, WorkspaceError> {
    if let Some(component) = args.component {
        return Ok(workspace.describe_component(&component));
    }
    if let Some(parameter) = args.parameter {
        return Ok(workspace.find_parameter(&parameter));
    }
    if args.universal {
        return Ok(workspace.universal_parameters());
    }
    if let Some(component) = args.examples {
        return Ok(workspace.component_example(&component));
    }

    let filename = required(args.filename, "filename")?;
    let query = required(args.query, "query")?;
    workspace.search_file(&filename, &query, &args.options)
}

fn write(workspace: &Workspace, args: WriteArgs) -> Result<String, WorkspaceError> {
    match args.mode.as_str() {
        "overwrite" => workspace.write_overwrite(
            &required(args.filename, "filename")?,
            &required(args.content, "content")?,
        ),
        "segment" => workspace.write_segment(
            &required(args.filename, "filename")?,
            &required(args.old_str, "old_str")?,
            &required(args.new_str, "new_str")?,
        ),
        "blueprint" => workspace.write_blueprint(&required(args.content, "content")?),
        other => Err(WorkspaceError::Unknown {
            kind: "write mode",
            value: other.to_string(),
        }),
    }
}

fn execute(workspace: &Workspace, args: ExecuteArgs) -> Result<String, WorkspaceError> {
    match args.command.as_str() {
        "generate" => workspace.generate(),
        "list" => workspace.list(args.directory.as_deref().unwrap_or(".")),
        other => Err(WorkspaceError::Unknown {
            kind: "command",
            value: other.to_string(),
        }),
    }
}

/// Serve requests line by line until `input` is exhausted. A line that is
/// not a valid request gets an error response; the loop keeps going.
pub fn serve<R: BufRead, W: Write>(
    workspace: &Workspace,
    input: R,
    mut output: W,
) -> std::io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(&line) {
            Ok(request) => dispatch(workspace, &request),
            Err(e) => ToolResponse::error(format!("Invalid request: {e}")),
        };

        serde_json::to_writer(&mut output, &response)?;
        writeln!(output)?;
        output.flush()?;
    }
    Ok(())
}
