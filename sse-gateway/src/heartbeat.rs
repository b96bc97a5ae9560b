//! Heartbeat Ticker (spec §4.7): periodically submits a heartbeat event
//! through the Publisher so it shares the ordering/observability guarantees
//! of every other event.

use std::sync::Arc;
use std::time::Duration;

use outbox_store::{OutboxRepository, Publisher, SequenceAllocator};
use tokio_util::sync::CancellationToken;

use crate::models::event_type;
use crate::registry::Dispatcher;

pub async fn run<A: SequenceAllocator, R: OutboxRepository>(
    publisher: Arc<Publisher<A, R>>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        if dispatcher.connected_count() == 0 {
            continue;
        }

        let payload = serde_json::json!({ "timestamp": chrono::Utc::now().to_rfc3339() });
        if let Err(err) = publisher.publish(event_type::HEARTBEAT, payload, None).await {
            tracing::warn!(error = %err, "heartbeat publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_store::testing::{InMemoryOutboxRepository, InMemorySequenceAllocator};

    #[tokio::test]
    async fn test_heartbeat_skips_publish_with_no_connected_clients() {
        let publisher = Arc::new(Publisher::new(
            Arc::new(InMemorySequenceAllocator::new()),
            Arc::new(InMemoryOutboxRepository::new()),
        ));
        let dispatcher = Arc::new(Dispatcher::new());
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        let task = tokio::spawn(run(publisher.clone(), dispatcher, Duration::from_millis(5), shutdown_clone));

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_heartbeat_publishes_when_clients_connected() {
        let repo = Arc::new(InMemoryOutboxRepository::new());
        let publisher = Arc::new(Publisher::new(Arc::new(InMemorySequenceAllocator::new()), repo.clone()));
        let dispatcher = Arc::new(Dispatcher::new());
        let (handle, _rx) = crate::registry::ClientHandle::new(
            "c1".to_string(),
            None,
            16,
            1_000,
            Duration::from_secs(5),
        );
        dispatcher.insert(handle);

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();
        let task = tokio::spawn(run(publisher, dispatcher, Duration::from_millis(5), shutdown_clone));

        tokio::time::sleep(Duration::from_millis(40)).await;
        shutdown.cancel();
        task.await.unwrap();

        let latest = repo.latest().await.unwrap();
        assert!(latest.is_some());
        assert_eq!(latest.unwrap().event_type, "heartbeat");
    }
}
