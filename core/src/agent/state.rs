use crate::traits::ChatMessage;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

/// Evolving execution state of one `iterate` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentState {
    pub messages: Vec<ChatMessage>,
    pub iteration: usize,
    pub is_finished: bool,
}

impl AgentState {
    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn finish(&mut self) {
        self.is_finished = true;
    }
}

/// Access to the base state embedded in every agent state type.
pub trait HasAgentState {
    fn agent_state(&self) -> &AgentState;

    fn agent_state_mut(&mut self) -> &mut AgentState;
}

impl HasAgentState for AgentState {
    fn agent_state(&self) -> &AgentState {
        self
    }

    fn agent_state_mut(&mut self) -> &mut AgentState {
        self
    }
}

/// State of the scratchpad agent: the base state plus the bookkeeping the
/// throttle guard and forced test runs rely on. Every collection here only
/// grows, except the signature history which keeps its newest entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScratchpadState {
    #[serde(flatten)]
    pub base: AgentState,
    pub scratchpad: Vec<String>,
    pub test_files_written: BTreeSet<String>,
    pub pytest_passed: bool,
    pub recent_dir_signatures: VecDeque<String>,
    pub dir_listings_executed: usize,
    pub target_module_read: bool,
    pub read_files_seen: BTreeSet<String>,
}

impl ScratchpadState {
    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            base: AgentState::with_messages(messages),
            ..Self::default()
        }
    }

    /// Whether `signature` is among the newest `window` recorded signatures.
    pub fn has_recent_signature(&self, signature: &str, window: usize) -> bool {
        self.recent_dir_signatures
            .iter()
            .rev()
            .take(window)
            .any(|s| s == signature)
    }

    pub fn record_dir_listing(&mut self, signature: String, history: usize) {
        self.dir_listings_executed += 1;
        self.recent_dir_signatures.push_back(signature);
        while self.recent_dir_signatures.len() > history {
            self.recent_dir_signatures.pop_front();
        }
    }

    pub fn mark_pytest_passed(&mut self) {
        self.pytest_passed = true;
    }
}

impl HasAgentState for ScratchpadState {
    fn agent_state(&self) -> &AgentState {
        &self.base
    }

    fn agent_state_mut(&mut self) -> &mut AgentState {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_history_keeps_newest_five() {
        let mut state = ScratchpadState::default();
        for i in 0..7 {
            state.record_dir_listing(format!("sig{i}"), 5);
        }

        assert_eq!(state.dir_listings_executed, 7);
        assert_eq!(
            state.recent_dir_signatures,
            ["sig2", "sig3", "sig4", "sig5", "sig6"]
        );
    }

    #[test]
    fn recent_signature_window() {
        let mut state = ScratchpadState::default();
        for sig in ["a", "b", "c", "d"] {
            state.record_dir_listing(sig.to_string(), 5);
        }

        assert!(state.has_recent_signature("b", 3));
        assert!(!state.has_recent_signature("a", 3));
        assert!(state.has_recent_signature("a", 4));
    }

    #[test]
    fn clones_do_not_alias() {
        let template = ScratchpadState::with_messages(vec![ChatMessage::system("sys")]);
        let mut run = template.clone();
        run.base.add_message(ChatMessage::user("task"));
        run.read_files_seen.insert("a.py".into());

        assert_eq!(template.base.messages.len(), 1);
        assert!(template.read_files_seen.is_empty());
    }
}
