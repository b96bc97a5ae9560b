//! SSE wire framing (spec §6) and the byte stream actix streams to the client.
//!
//! The frame layout follows the `SseEvent::to_string` shape used elsewhere in
//! this corpus, with the `_sequence` field injected into the JSON payload so
//! clients can recover `seq` without parsing the `id:` line.

use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::web::Bytes;
use futures::Stream;
use outbox_store::OutboxEntry;
use tokio::sync::mpsc;

/// Renders one outbox entry as a complete SSE frame, terminated by a blank line.
pub fn render_frame(entry: &OutboxEntry) -> String {
    let mut data = entry.data.clone();
    if let Some(obj) = data.as_object_mut() {
        obj.insert("_sequence".to_string(), serde_json::json!(entry.seq));
    }

    let mut frame = String::new();
    frame.push_str(&format!("id: {}\n", entry.event_id));
    frame.push_str(&format!("event: {}\n", entry.event_type));
    for line in data.to_string().lines() {
        frame.push_str(&format!("data: {line}\n"));
    }
    frame.push('\n');
    frame
}

/// A server comment line, not an SSE event (spec §9: connect-time "connected"
/// signal that must not consume a sequence number).
pub fn comment_frame(text: &str) -> String {
    format!(": {text}\n\n")
}

/// Adapts a `tokio::sync::mpsc::Receiver<Bytes>` into the `Stream` actix-web's
/// `HttpResponseBuilder::streaming` expects.
pub struct ByteStream {
    receiver: mpsc::Receiver<Bytes>,
}

impl ByteStream {
    pub fn new(receiver: mpsc::Receiver<Bytes>) -> Self {
        Self { receiver }
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes, actix_web::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(bytes)) => Poll::Ready(Some(Ok(bytes))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(seq: i64) -> OutboxEntry {
        OutboxEntry {
            event_id: "evt-1".to_string(),
            seq,
            event_type: "notification".to_string(),
            data: serde_json::json!({"message": "hi"}),
            target_client_id: None,
            created_at: Utc::now(),
            ttl: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn test_render_frame_injects_sequence_and_terminates_with_blank_line() {
        let frame = render_frame(&entry(42));
        assert!(frame.starts_with("id: evt-1\n"));
        assert!(frame.contains("event: notification\n"));
        assert!(frame.contains("\"_sequence\":42"));
        assert!(frame.ends_with("\n\n"));
    }

    #[test]
    fn test_comment_frame_is_not_an_event() {
        let frame = comment_frame("connected");
        assert!(frame.starts_with(": "));
        assert!(!frame.contains("event:"));
    }
}
