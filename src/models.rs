// Request and response bodies for the HTTP surface

use serde::{Deserialize, Serialize};

/// Body of `POST /chat` and `POST /stream`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// Conversation owner; a fresh id is generated when absent or blank
    #[serde(default)]
    pub user_id: Option<String>,
    pub message: String,
}

impl ChatRequest {
    pub fn new(user_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.map(str::to_string),
            message: message.into(),
        }
    }

    /// Reject a message that is empty after trimming
    pub fn validate(&self) -> Result<(), String> {
        if self.message.trim().is_empty() {
            return Err("message must not be empty".to_string());
        }
        Ok(())
    }

    /// The supplied user id, if it has any content
    pub fn user_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Body of a successful `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub response: String,
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body of `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    pub status_code: u16,
}

impl Default for StatusResponse {
    fn default() -> Self {
        Self {
            status: "service is running".to_string(),
            status_code: 200,
        }
    }
}

// SSE Event Types
#[derive(Debug, Clone, Serialize)]
pub struct DeltaPayload<'a> {
    pub delta: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DonePayload {
    pub status: &'static str,
}

impl Default for DonePayload {
    fn default() -> Self {
        Self {
            status: "Stream completed",
        }
    }
}
