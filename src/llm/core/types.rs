//! Core types for the completion layer

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

use super::error::ClientError;

/// Raw response body of a streaming completion, chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Role of a prompt message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model
    System,
    /// Human input
    User,
    /// Model output
    Assistant,
}

/// A single role-tagged message submitted to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What a completion call hands back
pub enum ResponseHandle {
    /// Single-shot mode: the first choice's full text
    Complete(String),
    /// Streaming mode: the still-open response body
    Stream(ByteStream),
}

impl std::fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseHandle::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            ResponseHandle::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
