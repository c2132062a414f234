use serde_json::{Value, json};
use std::path::{Component, Path, PathBuf};

pub mod json_valid;
pub mod list_directory;
pub mod pytest;
pub mod read_file;
pub mod write_file;

pub use json_valid::JsonValidTool;
pub use list_directory::ListDirectoryTool;
pub use pytest::{RunPythonFileTool, RunPytestTool};
pub use read_file::ReadFileTool;
pub use write_file::WriteFileTool;

pub fn extract_string_arg(args: &Value, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
        .map(|s| s.to_string())
}

pub fn extract_string_arg_opt(args: &Value, key: &str, default: &str) -> String {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

pub fn extract_usize_arg_opt(args: &Value, key: &str, default: usize) -> usize {
    args.get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// `{"success": true, "result": ...}` tool output.
pub fn tool_ok(result: impl Into<Value>) -> Value {
    json!({"success": true, "result": result.into()})
}

/// `{"success": false, "error": ...}` tool output.
pub fn tool_failure(error: impl Into<String>) -> Value {
    json!({"success": false, "error": error.into()})
}

/// Joins a model-supplied relative path onto the workspace, refusing absolute
/// paths and `..` components.
pub fn resolve_in_workspace(workspace: &Path, path: &str) -> anyhow::Result<PathBuf> {
    let relative = Path::new(path);
    let escapes = relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        anyhow::bail!("Path '{}' is outside the workspace", path);
    }
    Ok(workspace.join(relative))
}
