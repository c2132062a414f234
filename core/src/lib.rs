pub mod agent;
pub mod config;
pub mod providers;
pub mod tools;
pub mod traits;

pub use agent::{
    Agent, AgentCore, AgentOutcome, AgentState, ContextBuilder, ScratchpadState,
    ScratchpadUnitTester, SimpleUnitTester, ToolCallDispatcher, ToolRegistry,
};
pub use config::*;
pub use providers::*;
pub use tools::*;
pub use traits::*;
