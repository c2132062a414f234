use crate::tools::{extract_string_arg, resolve_in_workspace, tool_failure, tool_ok};
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::json;

pub struct ReadFileTool {
    workspace: std::path::PathBuf,
}

impl ReadFileTool {
    pub fn new(workspace: impl AsRef<std::path::Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the content of a file. Returns a dictionary with success/error status and result/message."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to read, relative to the workspace"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let path = extract_string_arg(&args, "file_path")?;
        let full_path = resolve_in_workspace(&self.workspace, &path)?;

        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => Ok(tool_ok(content)),
            Err(e) => Ok(tool_failure(format!("Failed to read {}: {}", path, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_relative_to_workspace() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("mod.py"), "def f():\n    return 1\n").unwrap();
        let tool = ReadFileTool::new(tmp.path());

        let out = tool.execute(json!({"file_path": "mod.py"})).await.unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(out["result"], "def f():\n    return 1\n");

        let out = tool.execute(json!({"file_path": "nope.py"})).await.unwrap();
        assert_eq!(out["success"], false);
        assert!(out["error"].as_str().unwrap().starts_with("Failed to read nope.py"));

        assert!(tool.execute(json!({})).await.is_err());
    }
}
