//! Completion provider layer
//!
//! This module provides a provider-neutral interface for chat completions
//! and an implementation for OpenAI-compatible `chat/completions` endpoints.

pub mod core;
pub mod openai;

// Re-export commonly used types
pub use core::{
    config::ClientConfig,
    error::ClientError,
    provider::CompletionProvider,
    types::{ByteStream, PromptMessage, ResponseHandle, Role},
};

pub use openai::OpenAiClient;
