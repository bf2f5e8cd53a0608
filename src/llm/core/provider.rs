//! Provider trait for completion implementations

use async_trait::async_trait;

use super::{
    error::ClientError,
    types::{PromptMessage, ResponseHandle},
};

/// Interface every completion provider implementation satisfies
///
/// Implementations hold only transport-level state and are shared across
/// requests behind an `Arc`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Submit `messages` to the provider
    ///
    /// # Arguments
    /// * `messages` - Ordered prompt, system message first
    /// * `streaming` - Whether to request an incrementally framed response
    ///
    /// # Returns
    /// `ResponseHandle::Complete` with the reply text when `streaming` is
    /// false, `ResponseHandle::Stream` with the open body otherwise
    async fn complete(
        &self,
        messages: Vec<PromptMessage>,
        streaming: bool,
    ) -> Result<ResponseHandle, ClientError>;
}
