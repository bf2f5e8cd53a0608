mod common;

use std::time::Duration;

use chat_relay::history::{
    ChatTurn, HistoryStore, MemoryHistoryStore, PostgresHistoryStore, StoreConfig, StoreError,
};
use bytes::BytesMut;
use chrono::{DateTime, TimeZone, Utc};
use tokio_postgres::types::{FromSql, ToSql, Type};
use testcontainers::clients::Cli;
use tokio_test::{assert_err, assert_ok};

fn turn_at(user_id: &str, n: i64) -> ChatTurn {
    ChatTurn::new(user_id, format!("message {n}"), format!("response {n}"))
        .with_timestamp(Utc.timestamp_opt(1_700_000_000 + n, 0).unwrap())
}

/// Checks shared by every backend
async fn exercise_store(store: &dyn HistoryStore) {
    // Appended out of order on purpose
    for n in [3, 1, 5, 2, 4] {
        store.append(turn_at("alice", n)).await.unwrap();
    }
    store.append(turn_at("bob", 1)).await.unwrap();

    let recent = store.recent("alice", 3).await.unwrap();
    let messages: Vec<&str> = recent.iter().map(|t| t.message.as_str()).collect();
    assert_eq!(messages, vec!["message 3", "message 4", "message 5"]);

    let all = store.recent("alice", 100).await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0], turn_at("alice", 1));

    assert!(store.recent("alice", 0).await.unwrap().is_empty());
    assert_eq!(store.recent("bob", 10).await.unwrap().len(), 1);
    assert!(store.recent("carol", 10).await.unwrap().is_empty());
}

/// A turn stamped now, with sub-second precision, reads back unchanged
async fn exercise_round_trip(store: &dyn HistoryStore) {
    let turn = ChatTurn::new("dana", "What time is it?", "Half past.");
    store.append(turn.clone()).await.unwrap();

    let read = store.recent("dana", 1).await.unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0], turn);
}

#[test]
fn test_timestamp_survives_timestamptz_encoding() {
    let precise = Utc.timestamp_opt(1_700_000_002, 474_530_043).unwrap();
    let turn = ChatTurn::new("dana", "Hi", "Hello").with_timestamp(precise);

    let mut buf = BytesMut::new();
    turn.timestamp.to_sql(&Type::TIMESTAMPTZ, &mut buf).unwrap();
    let read = DateTime::<Utc>::from_sql(&Type::TIMESTAMPTZ, &buf).unwrap();

    assert_eq!(read, turn.timestamp);
    assert_eq!(turn.clone().with_timestamp(read), turn);
}

#[tokio::test]
async fn test_memory_store_round_trip() {
    let store = MemoryHistoryStore::new();
    exercise_round_trip(&store).await;
}

#[tokio::test]
async fn test_memory_store_contract() {
    let store = MemoryHistoryStore::new();
    exercise_store(&store).await;
}

#[tokio::test]
async fn test_memory_store_offline() {
    let store = MemoryHistoryStore::new();
    store.set_offline(true);

    let err = store.append(turn_at("alice", 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert_err!(store.recent("alice", 5).await);

    store.set_offline(false);
    assert_ok!(store.append(turn_at("alice", 1)).await);
}

#[tokio::test]
async fn test_postgres_store_unreachable() {
    let config = StoreConfig::from_connection_string("postgresql://postgres:pw@127.0.0.1:1/chat")
        .unwrap()
        .with_connect_attempts(2, Duration::from_millis(10));

    let store = PostgresHistoryStore::new(config);
    assert_err!(store.connect().await);
    assert!(!store.is_connected().await);

    let err = store.append(turn_at("alice", 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_store_contract() {
    let docker = Cli::default();
    let container = docker.run(common::create_postgres_container());
    let port = container.get_host_port_ipv4(common::POSTGRES_PORT);

    let config =
        StoreConfig::from_connection_string(&common::build_connection_string("127.0.0.1", port))
            .unwrap();
    let store = PostgresHistoryStore::connect_with(config).await.unwrap();
    assert!(store.is_connected().await);

    exercise_store(&store).await;
    exercise_round_trip(&store).await;

    // Store-assigned ids come back on read
    let turns = store.recent("dana", 1).await.unwrap();
    assert!(turns[0].id.is_some());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_store_reconnect_lifecycle() {
    let docker = Cli::default();
    let container = docker.run(common::create_postgres_container());
    let port = container.get_host_port_ipv4(common::POSTGRES_PORT);

    let config =
        StoreConfig::from_connection_string(&common::build_connection_string("127.0.0.1", port))
            .unwrap()
            .with_table_name("lifecycle_turns");
    let store = PostgresHistoryStore::connect_with(config).await.unwrap();
    store.append(turn_at("alice", 1)).await.unwrap();

    // A second connect keeps the live pool
    store.connect().await.unwrap();
    assert_eq!(store.recent("alice", 10).await.unwrap().len(), 1);

    store.disconnect().await;
    assert!(!store.is_connected().await);
    let err = store.recent("alice", 10).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));

    // Data survives a reconnect
    store.connect().await.unwrap();
    assert_eq!(store.recent("alice", 10).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_store_concurrent_appends() {
    let docker = Cli::default();
    let container = docker.run(common::create_postgres_container());
    let port = container.get_host_port_ipv4(common::POSTGRES_PORT);

    let config =
        StoreConfig::from_connection_string(&common::build_connection_string("127.0.0.1", port))
            .unwrap()
            .with_max_pool_size(2);
    let store = std::sync::Arc::new(PostgresHistoryStore::connect_with(config).await.unwrap());

    let mut tasks = Vec::new();
    for n in 0..20 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store.append(turn_at("alice", n)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.recent("alice", 100).await.unwrap().len(), 20);
}
