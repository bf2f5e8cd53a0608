//! Error types for the completion layer

use thiserror::Error;

/// Errors that can occur when calling a completion provider
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP request could not be constructed
    #[error("Failed to build request: {0}")]
    RequestBuildFailed(String),

    /// Connection refused, DNS, TLS or mid-body transport failures
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-2xx status
    #[error("Upstream error (status {status}): {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The provider's body was not the JSON we expected
    #[error("Decode error: {0}")]
    Decode(String),

    /// The provider returned no choices
    #[error("No response content from provider")]
    NoContent,
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ClientError::RequestBuildFailed(err.to_string())
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::UpstreamStatus {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
