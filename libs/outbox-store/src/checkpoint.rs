//! Checkpoint Store (spec §3, §4.5): per-client record of the last `seq`
//! confirmed written to that client's byte stream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

use crate::error::OutboxResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub client_id: String,
    pub last_seq: i64,
    pub last_event_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// The persisted checkpoint for this client id, if any.
    async fn get(&self, client_id: &str) -> OutboxResult<Option<Checkpoint>>;

    /// Upsert the checkpoint. Callers are responsible for only calling this with
    /// a non-decreasing `seq` for a given client id (invariant I4).
    async fn upsert(&self, client_id: &str, seq: i64, last_event_id: Option<&str>) -> OutboxResult<()>;
}

pub struct PostgresCheckpointStore {
    pool: PgPool,
}

impl PostgresCheckpointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for PostgresCheckpointStore {
    async fn get(&self, client_id: &str) -> OutboxResult<Option<Checkpoint>> {
        let row = sqlx::query(
            r#"
            SELECT client_id, last_sequence_number, last_event_id, updated_at
            FROM client_checkpoints
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => Some(Checkpoint {
                client_id: row.try_get("client_id")?,
                last_seq: row.try_get("last_sequence_number")?,
                last_event_id: row.try_get("last_event_id")?,
                updated_at: row.try_get("updated_at")?,
            }),
            None => None,
        })
    }

    async fn upsert(&self, client_id: &str, seq: i64, last_event_id: Option<&str>) -> OutboxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO client_checkpoints (client_id, last_sequence_number, last_event_id, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (client_id) DO UPDATE
                SET last_sequence_number = EXCLUDED.last_sequence_number,
                    last_event_id = EXCLUDED.last_event_id,
                    updated_at = NOW()
            "#,
        )
        .bind(client_id)
        .bind(seq)
        .bind(last_event_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryCheckpointStore;

    #[tokio::test]
    async fn test_get_missing_client_returns_none() {
        let store = InMemoryCheckpointStore::new();
        assert!(store.get("no-such-client").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_then_get_roundtrips() {
        let store = InMemoryCheckpointStore::new();
        store.upsert("client-1", 42, Some("evt-42")).await.unwrap();

        let checkpoint = store.get("client-1").await.unwrap().unwrap();
        assert_eq!(checkpoint.last_seq, 42);
        assert_eq!(checkpoint.last_event_id.as_deref(), Some("evt-42"));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_previous_value() {
        let store = InMemoryCheckpointStore::new();
        store.upsert("client-1", 1, None).await.unwrap();
        store.upsert("client-1", 2, Some("evt-2")).await.unwrap();

        let checkpoint = store.get("client-1").await.unwrap().unwrap();
        assert_eq!(checkpoint.last_seq, 2);
    }
}
