use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::history::{
    error::{Result, StoreError},
    types::ChatTurn,
    HistoryStore,
};

/// In-process history store
///
/// Keeps every turn in memory, so history is lost on restart. Useful for
/// local development and tests. It can be switched offline to exercise the
/// `Unavailable` paths of callers.
#[derive(Default)]
pub struct MemoryHistoryStore {
    turns: RwLock<HashMap<String, Vec<ChatTurn>>>,
    next_id: AtomicI64,
    offline: AtomicBool,
}

impl MemoryHistoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the connection
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of turns stored for a user
    pub async fn len_for(&self, user_id: &str) -> usize {
        self.turns
            .read()
            .await
            .get(user_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(
                "in-memory store is offline".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, turn: ChatTurn) -> Result<()> {
        self.check_online()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        // Same resolution the SQL store keeps
        let timestamp = turn.timestamp;
        let turn = turn.with_timestamp(timestamp);

        let mut turns = self.turns.write().await;
        turns
            .entry(turn.user_id.clone())
            .or_default()
            .push(turn.with_id(id));
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        self.check_online()?;

        if limit == 0 {
            return Ok(Vec::new());
        }

        let turns = self.turns.read().await;
        let Some(user_turns) = turns.get(user_id) else {
            return Ok(Vec::new());
        };

        // Insertion order is not trusted; sort like the SQL store does
        let mut sorted: Vec<ChatTurn> = user_turns.clone();
        sorted.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        sorted.truncate(limit);
        sorted.reverse();
        Ok(sorted)
    }
}
