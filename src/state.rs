use std::sync::Arc;

use crate::service::ChatService;

/// Shared application state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
    api_key: Arc<str>,
}

impl AppState {
    pub fn new(service: ChatService, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            service: Arc::new(service),
            api_key: api_key.into(),
        }
    }

    /// Whether the supplied `X-API-KEY` value matches the configured secret
    pub fn authorize(&self, provided: Option<&str>) -> bool {
        match provided {
            Some(key) => constant_time_eq(key.as_bytes(), self.api_key.as_bytes()),
            None => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
