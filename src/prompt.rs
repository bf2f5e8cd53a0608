//! Prompt construction from stored history

use std::str::FromStr;

use crate::history::ChatTurn;
use crate::llm::PromptMessage;

/// How past turns are presented to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryReplay {
    /// Only the user side of each past turn, as user-role messages
    #[default]
    UserOnly,
    /// Each past turn as a user message followed by the assistant reply
    Full,
}

impl FromStr for HistoryReplay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user-only" | "user_only" | "user" => Ok(HistoryReplay::UserOnly),
            "full" => Ok(HistoryReplay::Full),
            other => Err(format!(
                "unknown history replay mode '{}' (expected 'user-only' or 'full')",
                other
            )),
        }
    }
}

/// Build the prompt for a new message
///
/// Emits the system prompt, then one user message per past turn (oldest
/// first), then `new_message`. Past replies are not replayed.
pub fn build(system_prompt: &str, history: &[ChatTurn], new_message: &str) -> Vec<PromptMessage> {
    build_with_replay(system_prompt, history, new_message, HistoryReplay::UserOnly)
}

/// Build the prompt with an explicit replay mode
pub fn build_with_replay(
    system_prompt: &str,
    history: &[ChatTurn],
    new_message: &str,
    replay: HistoryReplay,
) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(PromptMessage::system(system_prompt));

    for turn in history {
        messages.push(PromptMessage::user(turn.message.as_str()));
        if replay == HistoryReplay::Full && !turn.response.is_empty() {
            messages.push(PromptMessage::assistant(turn.response.as_str()));
        }
    }

    messages.push(PromptMessage::user(new_message));

    tracing::debug!(
        history_length = history.len(),
        prompt_length = messages.len(),
        ?replay,
        "Built prompt"
    );
    messages
}
