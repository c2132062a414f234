use crate::traits::{ChatResponse, ToolResult};
use serde_json::Value;

/// Hooks around the two blocking operations of an iteration: the model call
/// and the tool dispatch. Every method defaults to a no-op.
pub trait Observer: Send + Sync {
    fn on_model_call(&self, _iteration: usize, _history_len: usize) {}

    fn on_model_response(&self, _iteration: usize, _response: &ChatResponse) {}

    fn on_tool_call(&self, _name: &str, _args: &Value) {}

    fn on_tool_result(&self, _name: &str, _result: &ToolResult) {}
}

pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Emits model and tool events on the `proctor::trace` target.
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_model_call(&self, iteration: usize, history_len: usize) {
        tracing::info!(
            target: "proctor::trace",
            iteration,
            history_len,
            "llm-call"
        );
    }

    fn on_model_response(&self, iteration: usize, response: &ChatResponse) {
        tracing::info!(
            target: "proctor::trace",
            iteration,
            tool_calls = response.tool_calls.len(),
            content_len = response.text_or_empty().len(),
            "llm-response"
        );
    }

    fn on_tool_call(&self, name: &str, args: &Value) {
        tracing::info!(target: "proctor::trace", tool = name, %args, "tool-call");
    }

    fn on_tool_result(&self, name: &str, result: &ToolResult) {
        tracing::info!(
            target: "proctor::trace",
            tool = name,
            success = result.success,
            "tool-result"
        );
    }
}
