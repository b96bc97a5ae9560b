//! TTL Reaper (spec §10.6): periodically deletes outbox entries past their
//! TTL so the log doesn't grow unbounded. Mirrors the Poller/Heartbeat's
//! select!-on-shutdown loop shape.

use std::sync::Arc;
use std::time::Duration;

use outbox_store::OutboxRepository;
use tokio_util::sync::CancellationToken;

pub async fn run<R: OutboxRepository>(outbox: Arc<R>, interval: Duration, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        match outbox.reap_expired().await {
            Ok(0) => {}
            Ok(n) => tracing::info!(reaped = n, "TTL reaper removed expired outbox entries"),
            Err(err) => tracing::warn!(error = %err, "TTL reaper sweep failed"),
        }
    }
}
