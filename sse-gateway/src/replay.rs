//! Replay Coordinator (spec §4.6): on connect, drains the outbox slice
//! after a client's checkpoint into its channel before the stream engine
//! starts yielding, so replayed history precedes live delivery.

use std::sync::Arc;
use std::time::Duration;

use outbox_store::{OutboxEntry, OutboxRepository};

use crate::registry::ClientHandle;

pub struct ReplayConfig {
    pub batch_size: i64,
    pub pace: Duration,
}

/// Replays entries with `seq > effective_checkpoint`, pacing enqueues by
/// `config.pace` (spec: 10ms) so a reconnecting client's decoder isn't
/// flooded. Capped at `config.batch_size` entries per spec §4.6's documented
/// single-batch liberty (no catch-up looping).
///
/// Must be called on a handle that has not yet been inserted into the
/// `Dispatcher` — this is what guarantees replayed entries are enqueued
/// before any live entry with a higher `seq` can reach the same channel.
pub async fn replay<R: OutboxRepository>(
    outbox: &R,
    effective_checkpoint: Option<i64>,
    handle: &ClientHandle,
    config: &ReplayConfig,
) -> usize {
    let Some(checkpoint) = effective_checkpoint else {
        return 0;
    };

    let entries = match outbox.read_after(checkpoint, config.batch_size).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(client_id = %handle.client_id, error = %err, "replay read failed, proceeding to live feed");
            return 0;
        }
    };

    let mut replayed = 0;
    for entry in entries {
        let addressed_to_other_client = entry
            .target_client_id
            .as_deref()
            .is_some_and(|target| target != handle.client_id);
        if addressed_to_other_client || !handle.accepts(&entry.event_type) {
            continue;
        }
        if handle.enqueue(Arc::new(entry)).await {
            replayed += 1;
        }
        tokio::time::sleep(config.pace).await;
    }

    tracing::debug!(client_id = %handle.client_id, replayed, "replay complete");
    replayed
}

/// Resolves the effective checkpoint per spec §4.6 step 1: an explicit
/// checkpoint takes priority over the persisted one.
pub fn effective_checkpoint(explicit: Option<i64>, persisted: Option<i64>) -> Option<i64> {
    explicit.or(persisted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_store::testing::InMemoryOutboxRepository;

    fn entry(seq: i64) -> OutboxEntry {
        OutboxEntry {
            event_id: format!("evt-{seq}"),
            seq,
            event_type: "message".to_string(),
            data: serde_json::json!({}),
            target_client_id: None,
            created_at: chrono::Utc::now(),
            ttl: chrono::Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_replay_enqueues_entries_after_checkpoint_in_order() {
        let outbox = InMemoryOutboxRepository::new();
        for seq in 1..=5 {
            outbox.insert(&entry(seq)).await.unwrap();
        }

        let (handle, mut rx) = ClientHandle::new(
            "c1".to_string(),
            None,
            16,
            1_000,
            std::time::Duration::from_secs(5),
        );

        let replayed = replay(
            &outbox,
            Some(2),
            &handle,
            &ReplayConfig { batch_size: 100, pace: Duration::from_millis(0) },
        )
        .await;

        assert_eq!(replayed, 3);
        assert_eq!(rx.recv().await.unwrap().seq, 3);
        assert_eq!(rx.recv().await.unwrap().seq, 4);
        assert_eq!(rx.recv().await.unwrap().seq, 5);
    }

    #[tokio::test]
    async fn test_replay_with_no_checkpoint_is_a_no_op() {
        let outbox = InMemoryOutboxRepository::new();
        outbox.insert(&entry(1)).await.unwrap();

        let (handle, _rx) = ClientHandle::new(
            "c1".to_string(),
            None,
            16,
            1_000,
            std::time::Duration::from_secs(5),
        );

        let replayed = replay(
            &outbox,
            None,
            &handle,
            &ReplayConfig { batch_size: 100, pace: Duration::from_millis(0) },
        )
        .await;

        assert_eq!(replayed, 0);
    }

    #[test]
    fn test_effective_checkpoint_prefers_explicit() {
        assert_eq!(effective_checkpoint(Some(5), Some(10)), Some(5));
        assert_eq!(effective_checkpoint(None, Some(10)), Some(10));
        assert_eq!(effective_checkpoint(None, None), None);
    }

    #[tokio::test]
    async fn test_replay_skips_entries_the_filter_rejects() {
        let outbox = InMemoryOutboxRepository::new();
        outbox.insert(&entry(1)).await.unwrap();
        let mut alert = entry(2);
        alert.event_type = "alert".to_string();
        outbox.insert(&alert).await.unwrap();

        let (handle, mut rx) = ClientHandle::new(
            "c1".to_string(),
            Some("alert".to_string()),
            16,
            1_000,
            std::time::Duration::from_secs(5),
        );

        let replayed = replay(
            &outbox,
            Some(0),
            &handle,
            &ReplayConfig { batch_size: 100, pace: Duration::from_millis(0) },
        )
        .await;

        assert_eq!(replayed, 1);
        assert_eq!(rx.recv().await.unwrap().seq, 2);
    }

    #[tokio::test]
    async fn test_replay_skips_entries_targeted_at_another_client() {
        let outbox = InMemoryOutboxRepository::new();
        let mut targeted = entry(1);
        targeted.target_client_id = Some("other-client".to_string());
        outbox.insert(&targeted).await.unwrap();
        outbox.insert(&entry(2)).await.unwrap();

        let (handle, mut rx) = ClientHandle::new(
            "c1".to_string(),
            None,
            16,
            1_000,
            std::time::Duration::from_secs(5),
        );

        let replayed = replay(
            &outbox,
            Some(0),
            &handle,
            &ReplayConfig { batch_size: 100, pace: Duration::from_millis(0) },
        )
        .await;

        assert_eq!(replayed, 1);
        assert_eq!(rx.recv().await.unwrap().seq, 2);
    }
}
