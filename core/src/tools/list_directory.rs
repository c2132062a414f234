use crate::tools::{
    extract_string_arg_opt, extract_usize_arg_opt, resolve_in_workspace, tool_failure, tool_ok,
};
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

const MAX_DEPTH: usize = 5;

pub struct ListDirectoryTool {
    workspace: std::path::PathBuf,
}

impl ListDirectoryTool {
    pub fn new(workspace: impl AsRef<std::path::Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory_files"
    }

    fn description(&self) -> &str {
        "List files and directories in the given path up to a certain depth. Returns a mapping of directory -> entries."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list, relative to the workspace (default \".\")"
                },
                "depth": {
                    "type": "integer",
                    "description": "How many levels to descend (default 1)"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let path = extract_string_arg_opt(&args, "path", ".");
        let depth = extract_usize_arg_opt(&args, "depth", 1).clamp(1, MAX_DEPTH);
        let base = resolve_in_workspace(&self.workspace, &path)?;

        if !base.is_dir() {
            return Ok(tool_failure(format!("Not a directory: {}", path)));
        }

        let mut listing: BTreeMap<String, Vec<String>> = BTreeMap::new();
        listing.insert(path.clone(), Vec::new());

        for entry in WalkDir::new(&base)
            .min_depth(1)
            .max_depth(depth)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry under {}: {}", path, e);
                    continue;
                }
            };

            let parent = entry.path().parent().unwrap_or(&base);
            let key = listing_key(&path, &base, parent);
            let mut name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().is_dir() {
                name.push('/');
            }
            listing.entry(key).or_default().push(name);
        }

        Ok(tool_ok(json!(listing)))
    }
}

fn listing_key(requested: &str, base: &Path, dir: &Path) -> String {
    match dir.strip_prefix(base) {
        Ok(rel) if rel.as_os_str().is_empty() => requested.to_string(),
        Ok(rel) => Path::new(requested).join(rel).display().to_string(),
        Err(_) => dir.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("tools/toolkit")).unwrap();
        std::fs::write(tmp.path().join("README.md"), "").unwrap();
        std::fs::write(tmp.path().join("tools/toolkit/web.py"), "").unwrap();
        tmp
    }

    #[tokio::test]
    async fn lists_one_level_by_default() {
        let tmp = fixture();
        let tool = ListDirectoryTool::new(tmp.path());

        let out = tool.execute(json!({})).await.unwrap();
        assert_eq!(
            out,
            json!({"success": true, "result": {".": ["README.md", "tools/"]}})
        );
    }

    #[tokio::test]
    async fn deeper_listing_groups_by_directory() {
        let tmp = fixture();
        let tool = ListDirectoryTool::new(tmp.path());

        let out = tool.execute(json!({"path": "tools", "depth": 2})).await.unwrap();
        assert_eq!(
            out["result"],
            json!({"tools": ["toolkit/"], "tools/toolkit": ["web.py"]})
        );
    }

    #[tokio::test]
    async fn missing_directory_is_a_failure() {
        let tmp = fixture();
        let tool = ListDirectoryTool::new(tmp.path());

        let out = tool.execute(json!({"path": "nope"})).await.unwrap();
        assert_eq!(out["success"], false);
    }
}
