// HTTP Server modules
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod service;
pub mod sse;
pub mod state;

// Conversation history storage
pub mod history;

// Completion provider layer
pub mod llm;

// Prompt assembly and stream relaying
pub mod prompt;
pub mod relay;

// Process setup
pub mod config;
pub mod telemetry;
