//! Dispatcher / Client Registry (spec §4.4): process-local routing of
//! outbox entries to locally-connected streams.
//!
//! Generalizes `notification-service`'s `ConnectionManager` (one sender per
//! user, unbounded channel, fire-and-forget broadcast) to this service's
//! contract: one bounded channel per client, filter matching, per-client
//! duplicate suppression, and a cancellation handle torn down together with
//! the channel on unregister.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use outbox_store::OutboxEntry;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Bounded set of recently-seen event ids, capacity-limited per spec §4.5:
/// "halve-and-drop on overflow" rather than a plain LRU eviction of one.
struct RecentIds {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl RecentIds {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Returns `true` if `id` was already seen (caller should drop the event).
    fn check_and_insert(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        if self.seen.contains(id) {
            return true;
        }
        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());
        if self.order.len() > self.capacity {
            let drop_count = self.order.len() / 2;
            for _ in 0..drop_count {
                if let Some(oldest) = self.order.pop_front() {
                    self.seen.remove(&oldest);
                }
            }
        }
        false
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.order.len()
    }
}

/// One connected client's process-local state: the channel the stream
/// engine reads from, the filter it was registered with, and its dedup set.
pub struct ClientHandle {
    pub client_id: String,
    filter: Option<String>,
    sender: mpsc::Sender<Arc<OutboxEntry>>,
    recent_ids: Mutex<RecentIds>,
    pub cancel: CancellationToken,
    enqueue_timeout: Duration,
}

impl ClientHandle {
    pub fn new(
        client_id: String,
        filter: Option<String>,
        channel_capacity: usize,
        recent_ids_capacity: usize,
        enqueue_timeout: Duration,
    ) -> (Arc<Self>, mpsc::Receiver<Arc<OutboxEntry>>) {
        let (sender, receiver) = mpsc::channel(channel_capacity);
        let handle = Arc::new(Self {
            client_id,
            filter,
            sender,
            recent_ids: Mutex::new(RecentIds::new(recent_ids_capacity)),
            cancel: CancellationToken::new(),
            enqueue_timeout,
        });
        (handle, receiver)
    }

    /// Enqueue path (spec §4.5): dedup, then bounded wait with a 30s timeout.
    /// Returns `true` if the event was accepted onto the channel.
    pub async fn enqueue(&self, entry: Arc<OutboxEntry>) -> bool {
        let already_seen = {
            let mut recent = self.recent_ids.lock().unwrap();
            recent.check_and_insert(&entry.event_id)
        };
        if already_seen {
            return false;
        }

        match tokio::time::timeout(self.enqueue_timeout, self.sender.send(entry)).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                tracing::warn!(client_id = %self.client_id, "enqueue timed out, dropping event for slow client");
                false
            }
        }
    }

    pub fn accepts(&self, event_type: &str) -> bool {
        accepts(self.filter.as_deref(), event_type)
    }
}

/// Applies the historical `"update" -> "dataUpdate"` alias when a client
/// registers a filter (spec §4.4).
pub fn parse_filter(raw: Option<String>) -> Option<String> {
    raw.map(|f| if f.eq_ignore_ascii_case("update") { "dataUpdate".to_string() } else { f })
}

/// A client with no filter accepts every type; otherwise it accepts
/// `"connected"` unconditionally and anything matching its filter
/// case-insensitively.
pub fn accepts(filter: Option<&str>, event_type: &str) -> bool {
    match filter {
        None => true,
        Some(f) => event_type.eq_ignore_ascii_case("connected") || f.eq_ignore_ascii_case(event_type),
    }
}

/// Process-local registry of live streams, keyed by client id.
#[derive(Default)]
pub struct Dispatcher {
    clients: DashMap<String, Arc<ClientHandle>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { clients: DashMap::new() }
    }

    pub fn insert(&self, handle: Arc<ClientHandle>) {
        self.clients.insert(handle.client_id.clone(), handle);
    }

    pub fn unregister(&self, client_id: &str) {
        if let Some((_, handle)) = self.clients.remove(client_id) {
            handle.cancel.cancel();
        }
    }

    pub fn get(&self, client_id: &str) -> Option<Arc<ClientHandle>> {
        self.clients.get(client_id).map(|h| h.clone())
    }

    pub fn connected_count(&self) -> usize {
        self.clients.len()
    }

    /// Routes one polled entry to matching local clients without blocking on
    /// any of them (spec §4.3: "the Poller never blocks on slow clients").
    pub fn deliver(&self, entry: OutboxEntry) {
        let entry = Arc::new(entry);

        if let Some(target) = entry.target_client_id.clone() {
            if let Some(handle) = self.clients.get(&target).map(|h| h.clone()) {
                let entry = entry.clone();
                tokio::spawn(async move {
                    handle.enqueue(entry).await;
                });
            }
            return;
        }

        for item in self.clients.iter() {
            let handle = item.value().clone();
            if !handle.accepts(&entry.event_type) {
                continue;
            }
            let entry = entry.clone();
            tokio::spawn(async move {
                handle.enqueue(entry).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(seq: i64, event_type: &str, id: &str, target: Option<&str>) -> OutboxEntry {
        OutboxEntry {
            event_id: id.to_string(),
            seq,
            event_type: event_type.to_string(),
            data: serde_json::json!({}),
            target_client_id: target.map(String::from),
            created_at: Utc::now(),
            ttl: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn test_filter_alias_update_to_data_update() {
        assert_eq!(parse_filter(Some("update".to_string())), Some("dataUpdate".to_string()));
        assert_eq!(parse_filter(Some("UPDATE".to_string())), Some("dataUpdate".to_string()));
        assert_eq!(parse_filter(None), None);
    }

    #[test]
    fn test_accepts_no_filter_accepts_everything() {
        assert!(accepts(None, "alert"));
        assert!(accepts(None, "message"));
    }

    #[test]
    fn test_accepts_filter_always_admits_connected() {
        assert!(accepts(Some("alert"), "connected"));
    }

    #[test]
    fn test_accepts_filter_rejects_non_matching_type() {
        assert!(!accepts(Some("alert"), "notification"));
        assert!(accepts(Some("alert"), "ALERT"));
    }

    #[test]
    fn test_recent_ids_halves_on_overflow() {
        let mut recent = RecentIds::new(4);
        for i in 0..4 {
            assert!(!recent.check_and_insert(&format!("id-{i}")));
        }
        assert_eq!(recent.len(), 4);
        assert!(!recent.check_and_insert("id-overflow"));
        assert!(recent.len() <= 4);
    }

    #[test]
    fn test_recent_ids_detects_duplicate() {
        let mut recent = RecentIds::new(10);
        assert!(!recent.check_and_insert("a"));
        assert!(recent.check_and_insert("a"));
    }

    #[tokio::test]
    async fn test_deliver_routes_to_matching_clients_only() {
        let dispatcher = Dispatcher::new();

        let (alert_handle, mut alert_rx) = ClientHandle::new(
            "alert-client".to_string(),
            Some("alert".to_string()),
            16,
            1_000,
            Duration::from_secs(5),
        );
        dispatcher.insert(alert_handle);

        let (all_handle, mut all_rx) =
            ClientHandle::new("all-client".to_string(), None, 16, 1_000, Duration::from_secs(5));
        dispatcher.insert(all_handle);

        dispatcher.deliver(entry(1, "notification", "evt-1", None));

        let received_all = all_rx.recv().await.unwrap();
        assert_eq!(received_all.seq, 1);

        // The alert-only client shouldn't receive a notification event.
        let result = tokio::time::timeout(Duration::from_millis(100), alert_rx.recv()).await;
        assert!(result.is_err(), "alert-only client should not receive a notification event");
    }

    #[tokio::test]
    async fn test_deliver_targeted_event_reaches_only_target() {
        let dispatcher = Dispatcher::new();

        let (c1_handle, mut c1_rx) =
            ClientHandle::new("c1".to_string(), None, 16, 1_000, Duration::from_secs(5));
        dispatcher.insert(c1_handle);
        let (c2_handle, mut c2_rx) =
            ClientHandle::new("c2".to_string(), None, 16, 1_000, Duration::from_secs(5));
        dispatcher.insert(c2_handle);

        dispatcher.deliver(entry(1, "message", "evt-1", Some("c1")));

        let received = c1_rx.recv().await.unwrap();
        assert_eq!(received.seq, 1);

        let result = tokio::time::timeout(Duration::from_millis(100), c2_rx.recv()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unregister_cancels_and_removes() {
        let dispatcher = Dispatcher::new();
        let (handle, _rx) = ClientHandle::new("c1".to_string(), None, 16, 1_000, Duration::from_secs(5));
        let cancel = handle.cancel.clone();
        dispatcher.insert(handle);

        assert_eq!(dispatcher.connected_count(), 1);
        dispatcher.unregister("c1");
        assert_eq!(dispatcher.connected_count(), 0);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_duplicate_event_id_delivered_once() {
        let (handle, mut rx) = ClientHandle::new("c1".to_string(), None, 16, 1_000, Duration::from_secs(5));

        assert!(handle.enqueue(Arc::new(entry(1, "message", "a", None))).await);
        assert!(!handle.enqueue(Arc::new(entry(2, "message", "a", None))).await);
        assert!(handle.enqueue(Arc::new(entry(3, "message", "b", None))).await);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.seq, 1);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.seq, 3);
    }
}
