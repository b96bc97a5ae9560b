//! Per-Client Stream Engine (spec §4.5): drives the yield path for one
//! connection — await the channel, write the transport, checkpoint on
//! confirmed write, loop until cancelled.

use std::sync::Arc;

use actix_web::web::Bytes;
use outbox_store::{CheckpointStore, OutboxEntry};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::transport::render_frame;

/// Runs the yield loop for one client until the channel closes or
/// cancellation fires, whichever comes first. Checkpoint write failures are
/// logged and do not close the stream (spec §4.8: "Checkpoint write error —
/// non-fatal").
pub async fn run<C: CheckpointStore>(
    client_id: String,
    mut events: mpsc::Receiver<Arc<OutboxEntry>>,
    bytes_tx: mpsc::Sender<Bytes>,
    checkpoint_store: Arc<C>,
    cancel: CancellationToken,
) {
    loop {
        let entry = tokio::select! {
            _ = cancel.cancelled() => break,
            maybe_entry = events.recv() => match maybe_entry {
                Some(entry) => entry,
                None => break,
            },
        };

        let frame = render_frame(&entry);
        if bytes_tx.send(Bytes::from(frame)).await.is_err() {
            tracing::debug!(client_id = %client_id, "transport closed, ending stream");
            break;
        }

        if let Err(err) = checkpoint_store
            .upsert(&client_id, entry.seq, Some(&entry.event_id))
            .await
        {
            tracing::warn!(client_id = %client_id, seq = entry.seq, error = %err, "checkpoint write failed, continuing");
        }
    }
}
