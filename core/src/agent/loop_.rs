use crate::agent::throttle::RUN_TESTS_TOOL;
use crate::agent::{
    AgentState, HasAgentState, PytestHeuristic, TaskOutcome, TerminationDetector,
    ToolCallDispatcher, ToolRegistry,
};
use crate::traits::{
    ChatMessage, ChatRequest, ChatResponse, NoopObserver, Observer, Provider, ToolCall, ToolResult,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const FORCED_CALL_ID: &str = "forced-pytest";
pub const FORCED_RUN_STEER: &str =
    "Pytest failed or found no tests; fix imports (tools path) or failing tests, then rerun.";
const FINISHED_MESSAGE: &str = "Pytest run completed successfully.";

/// How an `iterate` run ended. Both are normal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOutcome {
    Finished,
    BudgetExhausted,
}

impl AgentOutcome {
    pub fn of(state: &impl HasAgentState) -> Self {
        if state.agent_state().is_finished {
            Self::Finished
        } else {
            Self::BudgetExhausted
        }
    }
}

impl std::fmt::Display for AgentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::BudgetExhausted => write!(f, "budget exhausted"),
        }
    }
}

/// An agent variant: how a run starts and what one iteration does. The loop
/// itself lives in [`Agent::iterate`].
#[async_trait]
pub trait Agent: Send + Sync {
    type State: HasAgentState + Send + 'static;

    fn max_iterations(&self) -> usize;

    /// Fresh state for one run, carrying `task` as the user message.
    fn start_point(&self, task: &str) -> Self::State;

    /// One iteration. Errors only when the model call itself fails.
    async fn run(&self, state: Self::State) -> Result<Self::State>;

    async fn iterate(&self, task: &str) -> Result<Self::State> {
        let mut state = self.start_point(task);
        let max_iterations = self.max_iterations();

        while !state.agent_state().is_finished && state.agent_state().iteration < max_iterations
        {
            state.agent_state_mut().iteration += 1;
            info!(
                "Iteration {}/{}",
                state.agent_state().iteration,
                max_iterations
            );
            state = self.run(state).await?;
        }

        info!(
            outcome = %AgentOutcome::of(&state),
            iterations = state.agent_state().iteration,
            "Agent run ended"
        );
        Ok(state)
    }
}

/// Collaborators shared by every agent variant.
pub struct AgentCore {
    provider: Arc<dyn Provider>,
    dispatcher: ToolCallDispatcher,
    detector: Arc<dyn TerminationDetector>,
    observer: Arc<dyn Observer>,
    max_iterations: usize,
}

impl AgentCore {
    pub fn new(provider: Arc<dyn Provider>, tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            dispatcher: ToolCallDispatcher::new(tool_registry),
            detector: Arc::new(PytestHeuristic),
            observer: Arc::new(NoopObserver),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.dispatcher = self.dispatcher.with_observer(observer.clone());
        self.observer = observer;
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn TerminationDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &ToolCallDispatcher {
        &self.dispatcher
    }

    /// Queries the model with the current history and the registry's schema.
    pub async fn generate(&self, state: &AgentState) -> Result<ChatResponse> {
        let tools = self.registry().export_schema(self.provider.kind());
        let request = ChatRequest {
            messages: &state.messages,
            tools: if tools.is_empty() { None } else { Some(&tools) },
        };

        self.observer
            .on_model_call(state.iteration, state.messages.len());
        let responses = self
            .provider
            .chat(request)
            .await
            .with_context(|| format!("Model call failed in iteration {}", state.iteration))?;
        let response = responses
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No response from provider"))?;
        self.observer.on_model_response(state.iteration, &response);

        Ok(response)
    }

    /// Dispatches a call and appends its tool-result message.
    pub async fn dispatch_and_record(
        &self,
        state: &mut AgentState,
        call_id: &str,
        name: &str,
        args: Map<String, Value>,
    ) -> ToolResult {
        let result = self.dispatcher.dispatch(name, args).await;
        record_tool_result(state, call_id, name, &result);
        result
    }

    pub fn is_task_success(&self, result: &ToolResult) -> bool {
        self.detector.evaluate(&TaskOutcome::from_tool_result(result))
    }

    /// Runs the test tool outside the model's turn. Returns the result and
    /// whether it counts as a pass; a miss appends a corrective message.
    pub async fn force_test_run(
        &self,
        state: &mut AgentState,
        test_dir: &str,
    ) -> (ToolResult, bool) {
        let mut args = Map::new();
        args.insert("directory".into(), json!(test_dir));
        let call = ToolCall::function(FORCED_CALL_ID, RUN_TESTS_TOOL, args);

        debug!("Forcing {} in {}", RUN_TESTS_TOOL, test_dir);
        let result = self.dispatcher.dispatch_call(&call).await;
        record_tool_result(state, FORCED_CALL_ID, RUN_TESTS_TOOL, &result);

        let passed = self.is_task_success(&result);
        if !passed {
            state.add_message(ChatMessage::assistant(FORCED_RUN_STEER));
        }
        (result, passed)
    }
}

pub fn record_tool_result(state: &mut AgentState, call_id: &str, name: &str, result: &ToolResult) {
    let message = ChatMessage::tool_result(call_id, name, result.to_json());
    debug!(
        "{}",
        serde_json::to_string_pretty(&message).unwrap_or_default()
    );
    state.add_message(message);
}

/// Appends the final `{"finished": true, ...}` message and marks the state
/// finished. `extra` fields are merged into the payload.
pub fn finish_run(state: &mut AgentState, extra: Map<String, Value>) {
    let mut payload = Map::new();
    payload.insert("finished".into(), json!(true));
    payload.insert("message".into(), json!(FINISHED_MESSAGE));
    payload.extend(extra);

    state.add_message(ChatMessage::assistant(Value::Object(payload).to_string()));
    state.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::SimpleUnitTester;
    use crate::agent::test_support::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn budget_exhaustion_is_a_normal_return() {
        let provider = ScriptedProvider::new(vec![]);
        let (registry, _) = registry(PASSING_RUN);
        let agent = SimpleUnitTester::new(core(provider.clone(), registry, 3), "sys", TEST_DIR);

        let state = agent.iterate("write tests").await.unwrap();

        assert!(!state.is_finished);
        assert_eq!(state.iteration, 3);
        assert_eq!(provider.calls(), 3);
        assert_eq!(AgentOutcome::of(&state), AgentOutcome::BudgetExhausted);
    }

    #[tokio::test]
    async fn start_point_never_aliases_the_template() {
        let provider = ScriptedProvider::new(vec![]);
        let (registry, _) = registry(PASSING_RUN);
        let agent = SimpleUnitTester::new(core(provider, registry, 1), "sys", TEST_DIR);

        let first = agent.iterate("task one").await.unwrap();
        let second = agent.start_point("task two");

        assert_eq!(first.messages[1].content, "task one");
        assert_eq!(second.messages.len(), 2);
        assert_eq!(second.messages[1].content, "task two");
        assert_eq!(second.iteration, 0);
    }

    #[tokio::test]
    async fn finishes_once_tests_pass() {
        let provider = ScriptedProvider::new(vec![respond(vec![
            write_test_file("c1"),
            call("c2", "run_pytest_tests", json!({"directory": TEST_DIR})),
        ])]);
        let (registry, counters) = registry(PASSING_RUN);
        let agent = SimpleUnitTester::new(core(provider.clone(), registry, 10), "sys", TEST_DIR);

        let state = agent.iterate("write tests").await.unwrap();

        assert!(state.is_finished);
        assert_eq!(state.iteration, 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(count(&counters.pytest), 1);

        let last: Value = serde_json::from_str(&state.last_message().unwrap().content).unwrap();
        assert_eq!(last["finished"], true);
        assert_eq!(last["message"], "Pytest run completed successfully.");
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        struct Down;

        #[async_trait]
        impl Provider for Down {
            fn kind(&self) -> crate::traits::ProviderKind {
                crate::traits::ProviderKind::OpenAi
            }

            async fn chat(&self, _request: ChatRequest<'_>) -> Result<Vec<ChatResponse>> {
                anyhow::bail!("connection refused")
            }
        }

        let (registry, _) = registry(PASSING_RUN);
        let core = AgentCore::new(Arc::new(Down), registry);
        let agent = SimpleUnitTester::new(core, "sys", TEST_DIR);

        let err = agent.iterate("write tests").await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
    }

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl Observer for Recording {
        fn on_model_call(&self, iteration: usize, _history_len: usize) {
            self.events.lock().unwrap().push(format!("model:{iteration}"));
        }

        fn on_tool_result(&self, name: &str, result: &ToolResult) {
            self.events
                .lock()
                .unwrap()
                .push(format!("tool:{name}:{}", result.success));
        }
    }

    #[tokio::test]
    async fn observer_wraps_model_and_tool_calls() {
        let provider = ScriptedProvider::new(vec![respond(vec![call(
            "c1",
            "read_file",
            json!({"file_path": TARGET}),
        )])]);
        let (registry, _) = registry(PASSING_RUN);
        let observer = Arc::new(Recording::default());
        let core = core(provider, registry, 2).with_observer(observer.clone());
        let agent = SimpleUnitTester::new(core, "sys", TEST_DIR);

        agent.iterate("write tests").await.unwrap();

        assert_eq!(
            *observer.events.lock().unwrap(),
            vec!["model:1", "tool:read_file:true", "model:2"]
        );
    }
}
