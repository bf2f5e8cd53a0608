//! Environment configuration
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::llm::core::config::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::prompt::HistoryReplay;
use crate::relay::RelayOptions;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RELAY_BUFFER: usize = 64;
pub const DEFAULT_RELAY_SEND_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Which history store to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryBackend {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for HistoryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(HistoryBackend::Postgres),
            "memory" => Ok(HistoryBackend::Memory),
            other => Err(format!(
                "unknown history backend '{}' (expected 'postgres' or 'memory')",
                other
            )),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_api_url: String,
    pub openai_model: String,
    /// Shared secret expected in `X-API-KEY`
    pub api_key: String,
    pub database_url: Option<String>,
    pub history_backend: HistoryBackend,
    pub bind_addr: IpAddr,
    pub port: u16,
    pub system_prompt: String,
    pub history_limit: usize,
    pub history_replay: HistoryReplay,
    pub request_timeout: Duration,
    pub relay: RelayOptions,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &"<redacted>")
            .field("openai_api_url", &self.openai_api_url)
            .field("openai_model", &self.openai_model)
            .field("api_key", &"<redacted>")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<redacted>"),
            )
            .field("history_backend", &self.history_backend)
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("system_prompt", &self.system_prompt)
            .field("history_limit", &self.history_limit)
            .field("history_replay", &self.history_replay)
            .field("request_timeout", &self.request_timeout)
            .field("relay", &self.relay)
            .finish()
    }
}

impl Config {
    /// Load `.env` (if present) and read configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => tracing::debug!("No .env file found"),
            Err(e) => tracing::warn!(error = %e, "Failed to read .env file"),
        }

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let history_backend: HistoryBackend =
            parse_or(&get, "HISTORY_BACKEND", HistoryBackend::default())?;
        let database_url = match history_backend {
            HistoryBackend::Postgres => Some(required("DATABASE_URL")?),
            HistoryBackend::Memory => get("DATABASE_URL"),
        };

        let relay_buffer: usize = parse_or(&get, "RELAY_BUFFER", DEFAULT_RELAY_BUFFER)?;
        if relay_buffer == 0 {
            return Err(ConfigError::Invalid {
                name: "RELAY_BUFFER",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_api_url: get("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: required("API_KEY")?,
            database_url,
            history_backend,
            bind_addr: parse_or(&get, "BIND_ADDR", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            system_prompt: get("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            history_limit: parse_or(&get, "HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            history_replay: parse_or(&get, "HISTORY_REPLAY", HistoryReplay::default())?,
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            relay: RelayOptions {
                buffer: relay_buffer,
                send_timeout: Duration::from_secs(parse_or(
                    &get,
                    "RELAY_SEND_TIMEOUT_SECS",
                    DEFAULT_RELAY_SEND_TIMEOUT_SECS,
                )?),
            },
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
