use crate::agent::ToolRegistry;
use crate::traits::ChatMessage;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const TEMPLATE_MAX_CHARS: usize = 20_000;
const TOOLS_PLACEHOLDER: &str = "{tools}";

/// Renders the system prompt an agent's initial state starts with.
pub struct ContextBuilder {
    pub workspace: PathBuf,
    pub template: String,
}

impl ContextBuilder {
    pub fn new(workspace: impl AsRef<Path>, template: impl Into<String>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            template: template.into(),
        }
    }

    pub fn from_template_file(workspace: impl AsRef<Path>, path: &Path) -> Result<Self> {
        let template = load_template(path)?;
        Ok(Self::new(workspace, template))
    }

    /// Template with `{tools}` replaced by the registry listing, followed by
    /// the runtime context.
    pub fn build_system_prompt(&self, registry: &ToolRegistry) -> String {
        let body = self
            .template
            .replace(TOOLS_PLACEHOLDER, registry.to_prompt_string().trim_end());
        [body, self.get_runtime_context()].join("\n\n---\n\n")
    }

    pub fn build_messages(&self, registry: &ToolRegistry) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.build_system_prompt(registry))]
    }

    fn get_runtime_context(&self) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M (%A)");

        format!(
            "## Runtime Context

### Current Time
{}

### Workspace
{}",
            timestamp,
            self.workspace.display()
        )
    }
}

pub fn load_template(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt template {}", path.display()))?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Prompt template {} is empty", path.display());
    }

    if trimmed.chars().count() > TEMPLATE_MAX_CHARS {
        let truncated: String = trimmed.chars().take(TEMPLATE_MAX_CHARS).collect();
        tracing::warn!(
            "Prompt template {} truncated at {} chars",
            path.display(),
            TEMPLATE_MAX_CHARS
        );
        return Ok(truncated);
    }

    Ok(trimmed.to_string())
}
