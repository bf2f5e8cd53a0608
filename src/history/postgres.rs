use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio::sync::RwLock;
use tokio_postgres::Row;

use crate::history::{
    connection::StoreConfig,
    error::{Result, StoreError},
    types::ChatTurn,
    HistoryStore,
};

/// PostgreSQL-backed history store
///
/// The pool handle lives behind a read-write lock: `connect` and
/// `disconnect` take it exclusively, `append` and `recent` share it.
pub struct PostgresHistoryStore {
    config: StoreConfig,
    pool: RwLock<Option<Pool>>,
}

impl PostgresHistoryStore {
    /// Create a store that is not yet connected
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    /// Create a store and connect it
    pub async fn connect_with(config: StoreConfig) -> Result<Self> {
        let store = Self::new(config);
        store.connect().await?;
        Ok(store)
    }

    /// Establish (or re-establish) the connection pool
    ///
    /// A pool that still answers a ping is kept. Otherwise a fresh pool is
    /// built and checked up to `connect_attempts` times, after which the
    /// schema is created if missing.
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.pool.write().await;

        if let Some(pool) = guard.take() {
            if ping(&pool, self.config.connect_timeout).await.is_ok() {
                *guard = Some(pool);
                return Ok(());
            }
            tracing::warn!("Existing history store connection is dead, reconnecting");
            pool.close();
        }

        let attempts = self.config.connect_attempts.max(1);
        let mut last_error = StoreError::Unavailable("no connection attempt made".to_string());

        for attempt in 1..=attempts {
            tracing::debug!(attempt, attempts, host = %self.config.host, "Connecting to history store");

            match self.try_connect().await {
                Ok(pool) => {
                    tracing::info!(
                        host = %self.config.host,
                        database = %self.config.database,
                        "History store connection established"
                    );
                    *guard = Some(pool);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "History store connection attempt failed");
                    last_error = e;
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        tracing::error!(error = %last_error, "All history store connection attempts failed");
        Err(last_error)
    }

    async fn try_connect(&self) -> Result<Pool> {
        let pool = self.config.build_pool()?;
        ping(&pool, self.config.connect_timeout).await?;
        self.ensure_schema(&pool).await?;
        Ok(pool)
    }

    async fn ensure_schema(&self, pool: &Pool) -> Result<()> {
        let table = &self.config.table_name;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                user_id TEXT NOT NULL,
                message TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS {table}_user_recent_idx
                ON {table} (user_id, created_at DESC);"
        );

        with_timeout(self.config.command_timeout, async {
            let conn = pool.get().await?;
            conn.batch_execute(&sql).await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    /// Close the pool; later operations fail with `Unavailable` until `connect`
    pub async fn disconnect(&self) {
        let mut guard = self.pool.write().await;
        if let Some(pool) = guard.take() {
            pool.close();
            tracing::info!("History store disconnected");
        }
    }

    /// Whether the store currently answers a ping
    pub async fn is_connected(&self) -> bool {
        let guard = self.pool.read().await;
        match guard.as_ref() {
            Some(pool) => ping(pool, self.config.connect_timeout).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn append(&self, turn: ChatTurn) -> Result<()> {
        let guard = self.pool.read().await;
        let pool = guard.as_ref().ok_or_else(not_connected)?;

        tracing::debug!(user_id = %turn.user_id, "Saving chat turn");

        let sql = format!(
            "INSERT INTO {} (user_id, message, response, created_at) VALUES ($1, $2, $3, $4)",
            self.config.table_name
        );

        with_timeout(self.config.command_timeout, async {
            let conn = pool.get().await?;
            conn.execute(
                &sql,
                &[&turn.user_id, &turn.message, &turn.response, &turn.timestamp],
            )
            .await?;
            Ok::<_, StoreError>(())
        })
        .await
        .inspect_err(|e| tracing::error!(user_id = %turn.user_id, error = %e, "Failed to save chat turn"))
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let guard = self.pool.read().await;
        let pool = guard.as_ref().ok_or_else(not_connected)?;

        tracing::debug!(user_id, limit, "Retrieving chat history");

        let sql = format!(
            "SELECT id, user_id, message, response, created_at FROM {}
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
            self.config.table_name
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = with_timeout(self.config.command_timeout, async {
            let conn = pool.get().await?;
            Ok::<_, StoreError>(conn.query(&sql, &[&user_id, &limit]).await?)
        })
        .await?;

        // Newest first from the database, oldest first to callers
        let mut turns = rows.iter().map(parse_turn_row).collect::<Vec<_>>();
        turns.reverse();

        tracing::debug!(user_id, count = turns.len(), "Retrieved chat history");
        Ok(turns)
    }
}

fn parse_turn_row(row: &Row) -> ChatTurn {
    let timestamp: DateTime<Utc> = row.get("created_at");
    ChatTurn {
        id: Some(row.get("id")),
        user_id: row.get("user_id"),
        message: row.get("message"),
        response: row.get("response"),
        timestamp,
    }
}

fn not_connected() -> StoreError {
    StoreError::Unavailable("history store is not connected".to_string())
}

async fn ping(pool: &Pool, timeout: Duration) -> Result<()> {
    with_timeout(timeout, async {
        let conn = pool.get().await?;
        conn.simple_query("SELECT 1").await?;
        Ok::<_, StoreError>(())
    })
    .await
}

async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| StoreError::Timeout(timeout))?
}
