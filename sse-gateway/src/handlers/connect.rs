//! GET /api/sse/connect (spec §6): opens an SSE stream for one client.

use std::time::Duration;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::registry::{parse_filter, ClientHandle};
use crate::replay::{self, ReplayConfig};
use crate::transport::ByteStream;
use crate::{error::AppResult, stream_engine, AppState};

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    #[serde(rename = "clientId")]
    pub client_id: Option<String>,
    pub filter: Option<String>,
    pub checkpoint: Option<i64>,
    #[serde(rename = "lastEventId")]
    pub last_event_id: Option<String>,
}

pub async fn connect(
    req: HttpRequest,
    query: web::Query<ConnectQuery>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let client_id = query.client_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    let filter = parse_filter(query.filter.clone());

    let cfg = &state.config;
    let (handle, receiver) = ClientHandle::new(
        client_id.clone(),
        filter,
        cfg.client_channel_capacity,
        cfg.client_recent_ids_capacity,
        Duration::from_secs(cfg.client_enqueue_timeout_secs),
    );

    let explicit_checkpoint = query.checkpoint.or_else(|| {
        req.headers()
            .get("Last-Event-ID")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .or_else(|| query.last_event_id.as_ref().and_then(|v| v.parse().ok()))
    });

    let persisted_checkpoint = match state.checkpoints.get(&client_id).await {
        Ok(checkpoint) => checkpoint.map(|c| c.last_seq),
        Err(err) => {
            tracing::warn!(client_id = %client_id, error = %err, "checkpoint lookup failed, treating as unset");
            None
        }
    };

    let effective = replay::effective_checkpoint(explicit_checkpoint, persisted_checkpoint);

    replay::replay(
        state.outbox.as_ref(),
        effective,
        &handle,
        &ReplayConfig {
            batch_size: cfg.replay_batch_size,
            pace: Duration::from_millis(cfg.replay_pace_ms),
        },
    )
    .await;

    // Only now does this client become reachable by the Poller, so every
    // replayed entry is guaranteed to have enqueued before any live one.
    state.dispatcher.insert(handle.clone());

    let (bytes_tx, bytes_rx) = tokio::sync::mpsc::channel(cfg.client_channel_capacity);
    let cancel = handle.cancel.clone();
    let checkpoints = state.checkpoints.clone();
    let dispatcher = state.dispatcher.clone();
    let client_id_for_task = client_id.clone();

    tokio::spawn(async move {
        stream_engine::run(client_id_for_task.clone(), receiver, bytes_tx, checkpoints, cancel).await;
        dispatcher.unregister(&client_id_for_task);
    });

    tracing::info!(client_id = %client_id, "client connected");

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .streaming(ByteStream::new(bytes_rx)))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/sse").route("/connect", web::get().to(connect)));
}
