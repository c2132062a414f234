use crate::agent::{AgentCore, ToolRegistry};
use crate::traits::{
    ChatRequest, ChatResponse, Provider, ProviderKind, Tool, ToolArguments, ToolCall,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_DIR: &str = "tools/llm_tests";
pub const TARGET: &str = "tools/toolkit/web.py";
pub const PASSING_RUN: &str = "collected 2 items\n\ntest_web.py ..  [100%]\n\n2 passed in 0.01s";
pub const EMPTY_RUN: &str = "collected 0 items\n\nno tests ran in 0.01s";

/// Replays queued responses; once the script runs out it answers with plain
/// text and no tool calls.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ChatResponse>>,
    pub calls: AtomicUsize,
    pub seen_history: Mutex<Vec<usize>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ChatResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<Vec<ChatResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_history.lock().unwrap().push(request.messages.len());
        let next = self.script.lock().unwrap().pop_front();
        Ok(vec![next.unwrap_or_else(|| ChatResponse {
            role: Some("assistant".into()),
            content: Some("thinking".into()),
            tool_calls: vec![],
        })])
    }
}

/// Tool double that counts invocations and answers with fixed output.
pub struct StubTool {
    name: &'static str,
    output: Value,
    pub calls: Arc<AtomicUsize>,
}

impl StubTool {
    pub fn new(name: &'static str, output: Value) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                output,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Tool for StubTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "stub"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

pub struct Counters {
    pub list: Arc<AtomicUsize>,
    pub read: Arc<AtomicUsize>,
    pub write: Arc<AtomicUsize>,
    pub pytest: Arc<AtomicUsize>,
}

pub fn count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Registry with the four unit-test tools; pytest answers with `pytest_output`.
pub fn registry(pytest_output: &str) -> (Arc<ToolRegistry>, Counters) {
    let (list, list_calls) = StubTool::new(
        "list_directory_files",
        json!({"success": true, "result": {".": ["tools/", "README.md"]}}),
    );
    let (read, read_calls) = StubTool::new(
        "read_file",
        json!({"success": true, "result": "def goto_url(url): ..."}),
    );
    let (write, write_calls) =
        StubTool::new("write_file", json!({"success": true, "result": true}));
    let (pytest, pytest_calls) = StubTool::new(
        "run_pytest_tests",
        json!({"success": true, "result": pytest_output}),
    );

    let registry = ToolRegistry::new()
        .with_tool(list)
        .with_tool(read)
        .with_tool(write)
        .with_tool(pytest);

    (
        Arc::new(registry),
        Counters {
            list: list_calls,
            read: read_calls,
            write: write_calls,
            pytest: pytest_calls,
        },
    )
}

pub fn core(provider: Arc<ScriptedProvider>, registry: Arc<ToolRegistry>, max: usize) -> AgentCore {
    AgentCore::new(provider, registry).with_max_iterations(max)
}

pub fn call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall::function(id, name, ToolArguments::Map(args))
}

pub fn respond(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        role: None,
        content: None,
        tool_calls: calls,
    }
}

pub fn write_test_file(id: &str) -> ToolCall {
    call(
        id,
        "write_file",
        json!({"file_path": "tools/llm_tests/test_web.py", "content": "def test_a(): assert True"}),
    )
}
