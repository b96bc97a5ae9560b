//! Publisher (spec §4.3): allocates a `seq` and writes an entry to the outbox,
//! retrying transient store failures with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

use crate::error::{OutboxError, OutboxResult};
use crate::outbox::{OutboxEntry, OutboxRepository};
use crate::sequence::SequenceAllocator;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 100;
const EVENT_TTL_HOURS: i64 = 1;

/// Publishes events onto the outbox on behalf of producers.
///
/// Generic over the allocator and repository so callers can run this against
/// Postgres-backed stores in production and in-memory fakes in tests.
pub struct Publisher<A, R>
where
    A: SequenceAllocator,
    R: OutboxRepository,
{
    allocator: Arc<A>,
    repository: Arc<R>,
}

impl<A, R> Publisher<A, R>
where
    A: SequenceAllocator,
    R: OutboxRepository,
{
    pub fn new(allocator: Arc<A>, repository: Arc<R>) -> Self {
        Self { allocator, repository }
    }

    fn calculate_backoff(attempt: u32) -> Duration {
        Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt))
    }

    /// Allocates a sequence number and durably writes the event, retrying
    /// transient failures up to `MAX_RETRIES` times with exponential backoff.
    ///
    /// A partially-completed publish (seq allocated, insert never lands) is an
    /// accepted gap in the sequence space per spec §9 S6 — callers must not
    /// treat publish failure as reason to retry with the same seq.
    pub async fn publish(
        &self,
        event_type: &str,
        data: serde_json::Value,
        target_client_id: Option<String>,
    ) -> OutboxResult<OutboxEntry> {
        let seq = self.allocator.next().await?;

        let entry = OutboxEntry {
            event_id: Uuid::new_v4().to_string(),
            seq,
            event_type: event_type.to_string(),
            data,
            target_client_id,
            created_at: Utc::now(),
            ttl: Utc::now() + ChronoDuration::hours(EVENT_TTL_HOURS),
        };

        let mut last_err = None;
        for attempt in 0..=MAX_RETRIES {
            match self.repository.insert(&entry).await {
                Ok(()) => return Ok(entry),
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                    tracing::warn!(seq, attempt, error = %err, "outbox insert failed, retrying");
                    tokio::time::sleep(Self::calculate_backoff(attempt)).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(OutboxError::PublishFailed(
            last_err.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }
}
