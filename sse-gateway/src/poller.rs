//! Outbox Poller (spec §4.3): one per process, continuously reads new
//! outbox entries in `seq` order and hands them to the Dispatcher.

use std::sync::Arc;
use std::time::Duration;

use outbox_store::OutboxRepository;
use tokio_util::sync::CancellationToken;

use crate::registry::Dispatcher;

pub struct PollerConfig {
    pub batch_size: i64,
    pub idle_interval: Duration,
    pub error_backoff: Duration,
}

/// Runs the poll loop until `shutdown` fires. On start, `last_delivered` is
/// initialized to `max(0, latest.seq - 100)` so a restarting pod re-drives
/// roughly the last 100 events to its now-empty client set (spec §9: the
/// redelivery window is accepted, dedup at the stream engine absorbs it).
pub async fn run<R: OutboxRepository>(
    outbox: Arc<R>,
    dispatcher: Arc<Dispatcher>,
    config: PollerConfig,
    shutdown: CancellationToken,
) {
    let mut last_delivered = match outbox.latest().await {
        Ok(Some(entry)) => (entry.seq - 100).max(0),
        Ok(None) => 0,
        Err(err) => {
            tracing::warn!(error = %err, "poller failed to read initial high-water mark, starting from 0");
            0
        }
    };

    tracing::info!(last_delivered, "poller starting");

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match outbox.read_after(last_delivered, config.batch_size).await {
            Ok(entries) if entries.is_empty() => {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(config.idle_interval) => {}
                }
            }
            Ok(entries) => {
                for entry in entries {
                    last_delivered = entry.seq;
                    dispatcher.deliver(entry);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "poller read failed, backing off");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(config.error_backoff) => {}
                }
            }
        }
    }

    tracing::info!(last_delivered, "poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_store::testing::InMemoryOutboxRepository;
    use outbox_store::OutboxEntry;

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
    async fn test_poller_delivers_new_entries_then_stops_on_shutdown() {
        let outbox = Arc::new(InMemoryOutboxRepository::new());
        outbox.insert(&entry(1)).await.unwrap();
        outbox.insert(&entry(2)).await.unwrap();

        let dispatcher = Arc::new(Dispatcher::new());
        let (handle, mut rx) = crate::registry::ClientHandle::new(
            "c1".to_string(),
            None,
            16,
            1_000,
            Duration::from_secs(5),
        );
        dispatcher.insert(handle);

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();
        let dispatcher_clone = dispatcher.clone();
        let outbox_clone = outbox.clone();

        let handle_task = tokio::spawn(async move {
            run(
                outbox_clone,
                dispatcher_clone,
                PollerConfig {
                    batch_size: 100,
                    idle_interval: Duration::from_millis(10),
                    error_backoff: Duration::from_millis(10),
                },
                shutdown_clone,
            )
            .await;
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.seq, 1);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.seq, 2);

        shutdown.cancel();
        handle_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_poller_with_no_clients_still_advances_and_stops_cleanly() {
        let outbox = Arc::new(InMemoryOutboxRepository::new());
        outbox.insert(&entry(1)).await.unwrap();

        let dispatcher = Arc::new(Dispatcher::new());
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        let handle_task = tokio::spawn(async move {
            run(
                outbox,
                dispatcher,
                PollerConfig {
                    batch_size: 100,
                    idle_interval: Duration::from_millis(5),
                    error_backoff: Duration::from_millis(5),
                },
                shutdown_clone,
            )
            .await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        handle_task.await.unwrap();
    }
}
