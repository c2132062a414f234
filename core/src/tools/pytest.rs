use crate::tools::{
    extract_string_arg, extract_string_arg_opt, resolve_in_workspace, tool_failure,
};
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

const DEFAULT_PYTHON: &str = "python3";

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (false, false) => format!("{}\n{}", stdout.trim(), stderr.trim()),
        (false, true) => stdout.trim().to_string(),
        _ => stderr.trim().to_string(),
    }
}

/// Runs pytest on a directory. The run succeeds whenever pytest could be
/// launched; whether the tests passed is left to the caller to read from the
/// output.
pub struct RunPytestTool {
    workspace: PathBuf,
    python: String,
}

impl RunPytestTool {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            python: DEFAULT_PYTHON.to_string(),
        }
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }
}

#[async_trait]
impl Tool for RunPytestTool {
    fn name(&self) -> &str {
        "run_pytest_tests"
    }

    fn description(&self) -> &str {
        "Run pytest in the given directory and return its output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Directory containing the tests, relative to the workspace (default \".\")"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let directory = extract_string_arg_opt(&args, "directory", ".");
        let target = resolve_in_workspace(&self.workspace, &directory)?;

        if !target.exists() {
            return Ok(tool_failure(format!("Directory not found: {}", directory)));
        }

        let output = Command::new(&self.python)
            .args(["-m", "pytest", "--color=no"])
            .arg(&directory)
            .current_dir(&self.workspace)
            .output()
            .await;

        match output {
            Ok(output) => Ok(json!({
                "success": true,
                "result": combined_output(&output),
                "exit_code": output.status.code(),
            })),
            Err(e) => Ok(tool_failure(format!("Failed to run pytest: {}", e))),
        }
    }
}

pub struct RunPythonFileTool {
    workspace: PathBuf,
    python: String,
}

impl RunPythonFileTool {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            python: DEFAULT_PYTHON.to_string(),
        }
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }
}

#[async_trait]
impl Tool for RunPythonFileTool {
    fn name(&self) -> &str {
        "run_python_file"
    }

    fn description(&self) -> &str {
        "Run a Python file and return its stdout and stderr."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Python file to run, relative to the workspace"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let file_path = extract_string_arg(&args, "file_path")?;
        let target = resolve_in_workspace(&self.workspace, &file_path)?;

        if !target.is_file() {
            return Ok(tool_failure(format!("File not found: {}", file_path)));
        }

        let output = Command::new(&self.python)
            .arg(&file_path)
            .current_dir(&self.workspace)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => Ok(json!({
                "success": true,
                "result": combined_output(&output),
            })),
            Ok(output) => {
                let detail = combined_output(&output);
                let error = if detail.is_empty() {
                    format!("Command failed with status: {}", output.status)
                } else {
                    detail
                };
                Ok(tool_failure(error))
            }
            Err(e) => Ok(tool_failure(format!("Failed to run {}: {}", file_path, e))),
        }
    }
}
