pub mod observer;
pub mod provider;
pub mod tool;

pub use observer::{NoopObserver, Observer, TracingObserver};
pub use provider::{
    ChatMessage, ChatRequest, ChatResponse, FUNCTION_CALL_TYPE, FunctionCall, Provider,
    ProviderKind, ToolArguments, ToolCall,
};
pub use tool::{Tool, ToolResult, ToolSpec};
