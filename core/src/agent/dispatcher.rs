use crate::agent::ToolRegistry;
use crate::traits::{NoopObserver, Observer, ToolCall, ToolResult};
use futures_util::FutureExt;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Executes tool calls against a registry. Every path ends in a
/// [`ToolResult`]; nothing here returns an error to the caller.
#[derive(Clone)]
pub struct ToolCallDispatcher {
    registry: Arc<ToolRegistry>,
    observer: Arc<dyn Observer>,
}

impl ToolCallDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub async fn dispatch(&self, name: &str, args: Map<String, Value>) -> ToolResult {
        let args = Value::Object(args);
        self.observer.on_tool_call(name, &args);

        let result = match self.registry.get(name) {
            Some(tool) => {
                debug!("Calling tool {} with {}", name, args);
                match AssertUnwindSafe(tool.execute(args)).catch_unwind().await {
                    Ok(Ok(value)) => ToolResult::success(value),
                    Ok(Err(e)) => {
                        warn!("Tool {} failed: {:#}", name, e);
                        ToolResult::error(format!("{:#}", e))
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        warn!("Tool {} panicked: {}", name, message);
                        ToolResult::error(message)
                    }
                }
            }
            None => {
                warn!("Tool {} not found", name);
                ToolResult::error(format!("Tool '{}' not found", name))
            }
        };

        info!(tool = name, success = result.success, "tool dispatched");
        self.observer.on_tool_result(name, &result);
        result
    }

    /// Dispatches a raw model tool call, decoding its arguments first.
    pub async fn dispatch_call(&self, call: &ToolCall) -> ToolResult {
        if !call.is_function() {
            warn!("Unsupported tool_call type {}", call.call_type);
            return ToolResult::error(format!("Unsupported tool_call type {}", call.call_type));
        }

        self.dispatch(call.name(), decode_arguments(call)).await
    }
}

/// Keyword arguments for a call. Undecodable arguments degrade to an empty
/// map so the call still goes through.
pub fn decode_arguments(call: &ToolCall) -> Map<String, Value> {
    match call.function.arguments.decode() {
        Ok(args) => args,
        Err(e) => {
            warn!(
                "Invalid JSON arguments for {} ({}): {}; using empty arguments",
                call.name(),
                call.id,
                e
            );
            Map::new()
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
