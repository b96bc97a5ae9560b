//! Outbox Store (spec §4.2): durable, append-only, `seq`-ordered event log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

use crate::error::{OutboxError, OutboxResult};

/// A single immutable entry in the outbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboxEntry {
    /// Dedup key surfaced to clients as the SSE `id:` line. Opaque to the store.
    pub event_id: String,
    /// Monotonic, globally unique sequence number assigned at publish time.
    pub seq: i64,
    pub event_type: String,
    pub data: serde_json::Value,
    /// If set, this event is point-to-point and only deliverable to this client id.
    pub target_client_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ttl: DateTime<Utc>,
}

/// Durable log contract the Poller and Replay Coordinator read from, and the
/// Publisher writes to. No updates, no locks, no delete beyond TTL reaping.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Persist an immutable entry. Fails with `Duplicate` if `entry.seq` already exists.
    async fn insert(&self, entry: &OutboxEntry) -> OutboxResult<()>;

    /// Entries with `seq > from_seq`, ascending, capped at `limit`.
    async fn read_after(&self, from_seq: i64, limit: i64) -> OutboxResult<Vec<OutboxEntry>>;

    /// The entry with the highest `seq`, or `None` if the outbox is empty.
    async fn latest(&self) -> OutboxResult<Option<OutboxEntry>>;

    /// Delete entries whose `ttl` has passed. Returns the number of rows reaped.
    async fn reap_expired(&self) -> OutboxResult<u64>;
}

pub struct PostgresOutboxRepository {
    pool: PgPool,
}

impl PostgresOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<OutboxEntry, sqlx::Error> {
    Ok(OutboxEntry {
        event_id: row.try_get("event_id")?,
        seq: row.try_get("sequence_number")?,
        event_type: row.try_get("event_type")?,
        data: row.try_get("event_data")?,
        target_client_id: row.try_get("target_client_id")?,
        created_at: row.try_get("created_at")?,
        ttl: row.try_get("ttl")?,
    })
}

#[async_trait]
impl OutboxRepository for PostgresOutboxRepository {
    async fn insert(&self, entry: &OutboxEntry) -> OutboxResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO outbox_events (
                event_id, sequence_number, event_type, event_data,
                target_client_id, created_at, ttl
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (sequence_number) DO NOTHING
            "#,
        )
        .bind(&entry.event_id)
        .bind(entry.seq)
        .bind(&entry.event_type)
        .bind(&entry.data)
        .bind(&entry.target_client_id)
        .bind(entry.created_at)
        .bind(entry.ttl)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OutboxError::Duplicate(entry.seq));
        }

        Ok(())
    }

    async fn read_after(&self, from_seq: i64, limit: i64) -> OutboxResult<Vec<OutboxEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, sequence_number, event_type, event_data,
                   target_client_id, created_at, ttl
            FROM outbox_events
            WHERE sequence_number > $1
            ORDER BY sequence_number ASC
            LIMIT $2
            "#,
        )
        .bind(from_seq)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row_to_entry(row).map_err(OutboxError::from))
            .collect()
    }

    async fn latest(&self) -> OutboxResult<Option<OutboxEntry>> {
        let row = sqlx::query(
            r#"
            SELECT event_id, sequence_number, event_type, event_data,
                   target_client_id, created_at, ttl
            FROM outbox_events
            ORDER BY sequence_number DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_entry).transpose().map_err(OutboxError::from)
    }

    async fn reap_expired(&self) -> OutboxResult<u64> {
        let result = sqlx::query("DELETE FROM outbox_events WHERE ttl < NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
