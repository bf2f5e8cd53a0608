//! OpenAI-compatible chat completions provider

pub mod client;
pub mod types;

// Re-export commonly used types
pub use client::OpenAiClient;
