use crate::traits::{ProviderKind, Tool, ToolSpec};
use serde_json::{Value, json};
use std::fmt::Write;
use std::sync::Arc;

/// Name → tool table. Tools are registered explicitly; registering a second
/// tool under an existing name replaces the first.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Tool descriptors in the shape the given provider expects.
    pub fn export_schema(&self, provider: ProviderKind) -> Vec<Value> {
        match provider {
            ProviderKind::OpenAi | ProviderKind::Groq => self
                .get_specs()
                .into_iter()
                .map(|spec| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": spec.name,
                            "description": spec.description,
                            "parameters": spec.parameters_schema,
                        }
                    })
                })
                .collect(),
        }
    }

    /// Human-readable tool listing substituted into system prompts.
    pub fn to_prompt_string(&self) -> String {
        let mut out = String::new();
        for spec in self.get_specs() {
            let _ = writeln!(
                out,
                "- {}: {}\n  Parameters: {}",
                spec.name, spec.description, spec.parameters_schema
            );
        }
        out
    }
}
