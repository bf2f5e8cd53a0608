//! Request orchestration shared by the chat and stream handlers

use std::sync::Arc;

use uuid::Uuid;

use crate::config::{Config, DEFAULT_HISTORY_LIMIT, DEFAULT_SYSTEM_PROMPT};
use crate::error::ApiError;
use crate::history::{ChatTurn, HistoryStore};
use crate::llm::{ClientError, CompletionProvider, PromptMessage, ResponseHandle};
use crate::models::{ChatRequest, ChatResponse};
use crate::prompt::{self, HistoryReplay};
use crate::relay::{RelayHandle, RelayOptions, StreamRelay, TurnSink};

/// Per-deployment knobs for building prompts and relaying streams
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub system_prompt: String,
    pub history_limit: usize,
    pub replay: HistoryReplay,
    pub relay: RelayOptions,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            replay: HistoryReplay::default(),
            relay: RelayOptions::default(),
        }
    }
}

impl From<&Config> for ChatSettings {
    fn from(config: &Config) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            history_limit: config.history_limit,
            replay: config.history_replay,
            relay: config.relay,
        }
    }
}

/// History lookup, prompt assembly, completion and persistence
pub struct ChatService {
    store: Arc<dyn HistoryStore>,
    provider: Arc<dyn CompletionProvider>,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        provider: Arc<dyn CompletionProvider>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    /// Answer a message in one piece and record the turn
    ///
    /// A failure to record the turn fails the request.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        let user_id = resolve_user_id(&request);
        let messages = self.prompt_for(&user_id, &request.message).await?;

        let response = match self.provider.complete(messages, false).await? {
            ResponseHandle::Complete(text) => text,
            ResponseHandle::Stream(_) => {
                return Err(ClientError::Decode(
                    "provider streamed a single-shot completion".to_string(),
                )
                .into())
            }
        };

        self.store
            .append(ChatTurn::new(
                user_id.as_str(),
                request.message,
                response.as_str(),
            ))
            .await?;

        tracing::info!(user_id = %user_id, response_len = response.len(), "Chat completed");
        Ok(ChatResponse { response })
    }

    /// Open a provider stream and start relaying it
    ///
    /// Errors before the first byte (history, provider status) are returned
    /// here. Once a handle is returned the relay owns persistence.
    pub async fn stream(&self, request: ChatRequest) -> Result<RelayHandle, ApiError> {
        let user_id = resolve_user_id(&request);
        let messages = self.prompt_for(&user_id, &request.message).await?;

        let body = match self.provider.complete(messages, true).await? {
            ResponseHandle::Stream(body) => body,
            ResponseHandle::Complete(_) => {
                return Err(ClientError::Decode(
                    "provider returned a single-shot completion for a stream".to_string(),
                )
                .into())
            }
        };

        tracing::info!(user_id = %user_id, "Streaming completion opened");
        let sink = TurnSink::new(self.store.clone(), user_id, request.message);
        Ok(StreamRelay::spawn(body, sink, self.settings.relay))
    }

    async fn prompt_for(
        &self,
        user_id: &str,
        message: &str,
    ) -> Result<Vec<PromptMessage>, ApiError> {
        let history = self
            .store
            .recent(user_id, self.settings.history_limit)
            .await?;

        Ok(prompt::build_with_replay(
            &self.settings.system_prompt,
            &history,
            message,
            self.settings.replay,
        ))
    }
}

fn resolve_user_id(request: &ChatRequest) -> String {
    match request.user_id() {
        Some(id) => id.to_string(),
        None => {
            let id = Uuid::new_v4().to_string();
            tracing::debug!(user_id = %id, "No user id supplied, generated one");
            id
        }
    }
}
