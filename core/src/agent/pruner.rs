use crate::traits::ChatMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneOptions {
    pub keep_system: bool,
    pub keep_user: bool,
    pub last_n: usize,
    pub drop_tools: bool,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            keep_system: true,
            keep_user: true,
            last_n: 4,
            drop_tools: true,
        }
    }
}

/// Bounds history to: system messages, the most recent user message, and the
/// last `last_n` of everything else, in that order. Relative order inside each
/// group is preserved.
pub fn prune_messages(messages: Vec<ChatMessage>, options: &PruneOptions) -> Vec<ChatMessage> {
    let mut system = Vec::new();
    let mut last_user = None;
    let mut other = Vec::new();

    for message in messages {
        match message.role.as_str() {
            "tool" if options.drop_tools => {}
            "system" => {
                if options.keep_system {
                    system.push(message);
                }
            }
            "user" => last_user = Some(message),
            _ => other.push(message),
        }
    }

    let skip = other.len().saturating_sub(options.last_n);

    let mut pruned = system;
    if options.keep_user {
        pruned.extend(last_user);
    }
    pruned.extend(other.into_iter().skip(skip));
    pruned
}
