pub mod context;
pub mod dispatcher;
pub mod loop_;
pub mod pruner;
pub mod registry;
pub mod scratchpad;
pub mod simple;
pub mod state;
pub mod termination;
pub mod throttle;

pub use context::ContextBuilder;
pub use dispatcher::ToolCallDispatcher;
pub use loop_::{Agent, AgentCore, AgentOutcome};
pub use pruner::{PruneOptions, prune_messages};
pub use registry::ToolRegistry;
pub use scratchpad::ScratchpadUnitTester;
pub use simple::SimpleUnitTester;
pub use state::{AgentState, HasAgentState, ScratchpadState};
pub use termination::{PytestHeuristic, TaskOutcome, TerminationDetector};
pub use throttle::{ThrottleConfig, ThrottleDecision, ThrottleGuard};

#[cfg(test)]
pub(crate) mod test_support;
