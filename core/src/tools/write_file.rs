use crate::tools::{extract_string_arg, resolve_in_workspace, tool_failure, tool_ok};
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::json;

pub struct WriteFileTool {
    workspace: std::path::PathBuf,
}

impl WriteFileTool {
    pub fn new(workspace: impl AsRef<std::path::Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories as needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to write, relative to the workspace"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let path = extract_string_arg(&args, "file_path")?;
        let content = extract_string_arg(&args, "content")?;
        let full_path = resolve_in_workspace(&self.workspace, &path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match tokio::fs::write(&full_path, content).await {
            Ok(_) => Ok(tool_ok(true)),
            Err(e) => Ok(tool_failure(format!("Failed to write {}: {}", path, e))),
        }
    }
}
