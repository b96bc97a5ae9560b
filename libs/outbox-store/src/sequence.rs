//! Sequence Allocator (spec §4.1): issues the next global, strictly increasing `seq`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::OutboxResult;

const SEQUENCE_ROW_ID: &str = "event_sequence";

/// Atomically issues the next global sequence number.
///
/// Implementations must guarantee strictly increasing values across all callers
/// in all processes, with the first call ever returning 1.
#[async_trait]
pub trait SequenceAllocator: Send + Sync {
    async fn next(&self) -> OutboxResult<i64>;
}

/// PostgreSQL-backed allocator using an upserted singleton row.
///
/// The `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement is a single
/// atomic round trip: PostgreSQL takes the row lock for the conflicting key before
/// evaluating the `SET` clause, so concurrent callers serialize on it instead of
/// racing a read-modify-write.
pub struct PostgresSequenceAllocator {
    pool: PgPool,
}

impl PostgresSequenceAllocator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceAllocator for PostgresSequenceAllocator {
    async fn next(&self) -> OutboxResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO event_sequence (id, current_value, updated_at)
            VALUES ($1, 1, NOW())
            ON CONFLICT (id) DO UPDATE
                SET current_value = event_sequence.current_value + 1,
                    updated_at = NOW()
            RETURNING current_value
            "#,
        )
        .bind(SEQUENCE_ROW_ID)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("current_value")?)
    }
}
