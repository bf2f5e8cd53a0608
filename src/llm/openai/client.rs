//! OpenAI client implementation

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};

use crate::llm::core::{
    config::ClientConfig,
    error::ClientError,
    provider::CompletionProvider,
    types::{PromptMessage, ResponseHandle},
};

use super::types::{ChatCompletionRequest, ChatCompletionResponse};

/// Client for an OpenAI-compatible chat completions endpoint
///
/// Cheap to share: it only owns the pooled HTTP client and its settings.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Endpoint, model, key and timeouts
    config: ClientConfig,
}

impl OpenAiClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns `RequestBuildFailed` if the HTTP client cannot be constructed
    /// (for example when the TLS backend fails to initialize).
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                ClientError::RequestBuildFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// The model sent with every request
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_request(&self, messages: &[PromptMessage], streaming: bool) -> RequestBuilder {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            stream: streaming,
        };

        self.http_client
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
    }

    /// Single-shot completion with a bounded request timeout
    async fn complete_once(&self, messages: &[PromptMessage]) -> Result<String, ClientError> {
        let response = self
            .build_request(messages, false)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let response = check_status(response).await?;
        tracing::debug!(status = %response.status(), "Received completion response");

        let bytes = response.bytes().await?;
        let envelope: ChatCompletionResponse = serde_json::from_slice(&bytes)?;

        envelope.first_content().ok_or(ClientError::NoContent)
    }

    /// Streaming completion; the body is left open for the caller to drain
    async fn open_stream(&self, messages: &[PromptMessage]) -> Result<ResponseHandle, ClientError> {
        let response = self
            .build_request(messages, true)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let response = check_status(response).await?;
        tracing::debug!(status = %response.status(), "Completion stream opened");

        let byte_stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ClientError::Network(e.to_string())));

        Ok(ResponseHandle::Stream(Box::pin(byte_stream)))
    }
}

/// Turn a non-2xx response into `UpstreamStatus`, keeping the body for logs
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| String::new());
    tracing::warn!(status = status.as_u16(), "Provider returned an error status");
    Err(ClientError::UpstreamStatus {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(
        &self,
        messages: Vec<PromptMessage>,
        streaming: bool,
    ) -> Result<ResponseHandle, ClientError> {
        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            streaming,
            "Sending completion request"
        );

        if streaming {
            self.open_stream(&messages).await
        } else {
            self.complete_once(&messages)
                .await
                .map(ResponseHandle::Complete)
        }
    }
}
