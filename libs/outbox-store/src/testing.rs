//! In-memory fakes for the store traits, shared by this crate's own unit tests
//! and by consumers (sse-gateway) that want to exercise Publisher/Poller/replay
//! logic without a live Postgres instance.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{OutboxError, OutboxResult};
use crate::outbox::{OutboxEntry, OutboxRepository};
use crate::sequence::SequenceAllocator;

/// In-memory sequence allocator. First call returns 1.
#[derive(Default)]
pub struct InMemorySequenceAllocator {
    current: Mutex<i64>,
}

impl InMemorySequenceAllocator {
    pub fn new() -> Self {
        Self { current: Mutex::new(0) }
    }
}

#[async_trait]
impl SequenceAllocator for InMemorySequenceAllocator {
    async fn next(&self) -> OutboxResult<i64> {
        let mut current = self.current.lock().unwrap();
        *current += 1;
        Ok(*current)
    }
}

/// In-memory outbox. Entries are kept sorted by `seq` on insert.
#[derive(Default)]
pub struct InMemoryOutboxRepository {
    entries: Mutex<Vec<OutboxEntry>>,
}

impl InMemoryOutboxRepository {
    pub fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl OutboxRepository for InMemoryOutboxRepository {
    async fn insert(&self, entry: &OutboxEntry) -> OutboxResult<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.seq == entry.seq) {
            return Err(OutboxError::Duplicate(entry.seq));
        }
        entries.push(entry.clone());
        entries.sort_by_key(|e| e.seq);
        Ok(())
    }

    async fn read_after(&self, from_seq: i64, limit: i64) -> OutboxResult<Vec<OutboxEntry>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.seq > from_seq)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn latest(&self) -> OutboxResult<Option<OutboxEntry>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.last().cloned())
    }

    async fn reap_expired(&self) -> OutboxResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|e| e.ttl >= now);
        Ok((before - entries.len()) as u64)
    }
}

/// In-memory checkpoint store, keyed by client id.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: Mutex<std::collections::HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self { checkpoints: Mutex::new(std::collections::HashMap::new()) }
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, client_id: &str) -> OutboxResult<Option<Checkpoint>> {
        let checkpoints = self.checkpoints.lock().unwrap();
        Ok(checkpoints.get(client_id).cloned())
    }

    async fn upsert(&self, client_id: &str, seq: i64, last_event_id: Option<&str>) -> OutboxResult<()> {
        let mut checkpoints = self.checkpoints.lock().unwrap();
        checkpoints.insert(
            client_id.to_string(),
            Checkpoint {
                client_id: client_id.to_string(),
                last_seq: seq,
                last_event_id: last_event_id.map(String::from),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

/// An `OutboxRepository` whose `insert` fails a fixed number of times before
/// succeeding, for exercising the Publisher's retry/backoff path.
pub struct FlakyOutboxRepository {
    inner: InMemoryOutboxRepository,
    failures_remaining: Mutex<u32>,
}

impl FlakyOutboxRepository {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: InMemoryOutboxRepository::new(),
            failures_remaining: Mutex::new(failures),
        }
    }
}

#[async_trait]
impl OutboxRepository for FlakyOutboxRepository {
    async fn insert(&self, entry: &OutboxEntry) -> OutboxResult<()> {
        let mut remaining = self.failures_remaining.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(OutboxError::StoreUnavailable(sqlx::Error::PoolClosed));
        }
        drop(remaining);
        self.inner.insert(entry).await
    }

    async fn read_after(&self, from_seq: i64, limit: i64) -> OutboxResult<Vec<OutboxEntry>> {
        self.inner.read_after(from_seq, limit).await
    }

    async fn latest(&self) -> OutboxResult<Option<OutboxEntry>> {
        self.inner.latest().await
    }

    async fn reap_expired(&self) -> OutboxResult<u64> {
        self.inner.reap_expired().await
    }
}
