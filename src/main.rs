use std::process::ExitCode;
use std::sync::Arc;

use chat_relay::config::{Config, ConfigError, HistoryBackend};
use chat_relay::history::{
    HistoryStore, MemoryHistoryStore, PostgresHistoryStore, StoreConfig, StoreError,
};
use chat_relay::llm::{ClientConfig, ClientError, OpenAiClient};
use chat_relay::routes::configure_routes;
use chat_relay::service::{ChatService, ChatSettings};
use chat_relay::state::AppState;
use chat_relay::telemetry;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("History store error: {0}")]
    Store(#[from] StoreError),

    #[error("Completion client error: {0}")]
    Client(#[from] ClientError),
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let (store, postgres): (Arc<dyn HistoryStore>, Option<Arc<PostgresHistoryStore>>) =
        match config.history_backend {
            HistoryBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let store_config = StoreConfig::from_connection_string(url)?;
                let store = Arc::new(PostgresHistoryStore::connect_with(store_config).await?);
                (store.clone(), Some(store))
            }
            HistoryBackend::Memory => {
                tracing::warn!("Using in-memory history, turns are lost on restart");
                (Arc::new(MemoryHistoryStore::new()), None)
            }
        };

    let client = OpenAiClient::new(
        ClientConfig::new(config.openai_api_key.clone())
            .with_endpoint(config.openai_api_url.clone())
            .with_model(config.openai_model.clone())
            .with_request_timeout(config.request_timeout),
    )?;
    tracing::info!(model = client.model(), "Completion client ready");

    let service = ChatService::new(store, Arc::new(client), ChatSettings::from(&config));
    let state = AppState::new(service, config.api_key.as_str());
    let routes = configure_routes(state);

    let addr = config.socket_addr();
    tracing::info!(%addr, "Starting server");

    tokio::select! {
        _ = warp::serve(routes).run(addr) => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
        }
    }

    if let Some(store) = postgres {
        store.disconnect().await;
    }

    Ok(())
}
